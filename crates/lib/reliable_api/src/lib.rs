//! # reliable_api
//!
//! HTTP API library for Reliable Parts.
//!
//! Every route is listed in [`policy::ROUTE_POLICIES`]; the
//! [`middleware::auth::enforce_access`] route layer applies the listed check
//! before any handler runs.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod policy;
pub mod routes;

use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, put};
use reliable_core::store::StoreGateway;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{hello, orders, parts, reviews, users};

/// Shared application state passed to all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Document store gateway.
    pub store: StoreGateway,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    Router::new()
        .route(routes::ROOT, get(hello::root_handler))
        .route(routes::HEALTH, get(hello::health_handler))
        .route(
            routes::PARTS,
            get(parts::list_parts_handler).post(parts::create_part_handler),
        )
        .route(
            routes::PART_ID,
            get(parts::get_part_handler).delete(parts::delete_part_handler),
        )
        .route(
            routes::ORDERS,
            get(orders::list_orders_handler).post(orders::create_order_handler),
        )
        .route(routes::USERS, get(users::list_users_handler))
        .route(routes::USER_EMAIL, put(users::upsert_user_handler))
        .route(routes::USER_ADMIN_EMAIL, put(users::grant_admin_handler))
        .route(routes::ADMIN_EMAIL, get(users::check_admin_handler))
        .route(
            routes::REVIEWS,
            get(reviews::list_reviews_handler).post(reviews::create_review_handler),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::enforce_access,
        ))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
