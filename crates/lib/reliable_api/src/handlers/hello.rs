//! Liveness and readiness endpoints.

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::AppState;
use crate::models::HealthResponse;

/// Plain-text liveness banner.
pub const LIVENESS_BANNER: &str = "Running reliable parts server";

/// `GET /`: liveness string.
pub async fn root_handler() -> &'static str {
    LIVENESS_BANNER
}

/// `GET /health`: reports whether the document store answers a ping.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_connected = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("store ping failed: {e}");
            false
        }
    };
    Json(HealthResponse {
        status: "ok".to_string(),
        store_connected,
    })
}
