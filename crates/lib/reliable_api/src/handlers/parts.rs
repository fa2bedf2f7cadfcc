//! Parts catalog handlers. Unrestricted CRUD.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use reliable_core::models::document::{Document, Fields};
use reliable_core::store::{DeleteAck, InsertAck};

use crate::AppState;
use crate::error::AppResult;

/// `GET /part`: all parts.
pub async fn list_parts_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.store.parts().find_all().await?))
}

/// `GET /part/{id}`: one part; 404 if absent, 400 if `id` is malformed.
pub async fn get_part_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<Document>> {
    let Path(id) = path?;
    Ok(Json(state.store.parts().get(&id).await?))
}

/// `POST /part`: insert a part.
pub async fn create_part_handler(
    State(state): State<AppState>,
    body: Result<Json<Fields>, JsonRejection>,
) -> AppResult<Json<InsertAck>> {
    let Json(fields) = body?;
    Ok(Json(state.store.parts().insert_one(fields).await?))
}

/// `DELETE /part/{id}`: delete a part; an unknown id deletes nothing.
pub async fn delete_part_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<DeleteAck>> {
    let Path(id) = path?;
    Ok(Json(state.store.parts().delete(&id).await?))
}
