//! Order handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use reliable_core::models::auth::CUSTOMER_FIELD;
use reliable_core::models::document::{Document, Fields};
use reliable_core::store::{Filter, InsertAck};

use crate::AppState;
use crate::error::AppResult;
use crate::models::OrderQuery;

/// `POST /order`: place an order. The `customer` field names its owner.
pub async fn create_order_handler(
    State(state): State<AppState>,
    body: Result<Json<Fields>, JsonRejection>,
) -> AppResult<Json<InsertAck>> {
    let Json(fields) = body?;
    Ok(Json(state.store.orders().insert_one(fields).await?))
}

/// `GET /order?customer=<email>`: orders owned by `customer`.
///
/// Only reachable once the owner check has matched `customer` against the
/// verified token email.
pub async fn list_orders_handler(
    State(state): State<AppState>,
    query: Result<Query<OrderQuery>, QueryRejection>,
) -> AppResult<Json<Vec<Document>>> {
    let Query(query) = query?;
    let orders = state
        .store
        .orders()
        .find(&Filter::eq(CUSTOMER_FIELD, query.customer))
        .await?;
    Ok(Json(orders))
}
