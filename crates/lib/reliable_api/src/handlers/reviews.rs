//! Review handlers.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use reliable_core::models::document::{Document, Fields};
use reliable_core::store::InsertAck;

use crate::AppState;
use crate::error::AppResult;

/// `POST /review`: record a review.
pub async fn create_review_handler(
    State(state): State<AppState>,
    body: Result<Json<Fields>, JsonRejection>,
) -> AppResult<Json<InsertAck>> {
    let Json(fields) = body?;
    Ok(Json(state.store.reviews().insert_one(fields).await?))
}

/// `GET /review`: all reviews.
pub async fn list_reviews_handler(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.store.reviews().find_all().await?))
}
