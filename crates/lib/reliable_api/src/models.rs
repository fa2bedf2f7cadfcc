//! Request and response bodies that are not plain documents or store acks.

use reliable_core::store::UpdateAck;
use serde::{Deserialize, Serialize};

/// Error body for every non-2xx response produced by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `PUT /user/{email}` response.
#[derive(Debug, Clone, Serialize)]
pub struct UpsertUserResponse {
    pub result: UpdateAck,
    pub token: String,
}

/// `GET /admin/{email}` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStatusResponse {
    pub admin: bool,
}

/// `GET /health` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
}

/// Query string of `GET /order`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderQuery {
    pub customer: String,
}
