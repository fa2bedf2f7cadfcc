//! User profile, token and admin-role handlers.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::{Extension, Json};
use chrono::Duration;
use reliable_core::auth::jwt::issue_token;
use reliable_core::models::auth::{ADMIN_ROLE, EMAIL_FIELD, ROLE_FIELD, is_admin};
use reliable_core::models::document::{Document, Fields, sanitize};
use reliable_core::store::{Filter, UpdateAck};
use serde_json::Value;
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{AdminStatusResponse, UpsertUserResponse};

/// Profile fields a user may set on themselves.
///
/// The path email always wins over a body `email`, and `role` is dropped:
/// role changes only go through the admin grant.
fn profile_update(email: &str, body: Fields) -> Fields {
    let mut fields = sanitize(body);
    fields.remove(ROLE_FIELD);
    fields.insert(EMAIL_FIELD.to_string(), Value::String(email.to_string()));
    fields
}

/// `PUT /user/{email}`: insert or update the profile for `email` and issue
/// a fresh identity token for it.
pub async fn upsert_user_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<Fields>, JsonRejection>,
) -> AppResult<Json<UpsertUserResponse>> {
    let Path(email) = path?;
    let Json(body) = body?;
    let ttl = Duration::try_seconds(state.config.token_ttl_secs).ok_or_else(|| {
        AppError::Internal(format!(
            "token lifetime out of range: {}s",
            state.config.token_ttl_secs
        ))
    })?;

    let result = state
        .store
        .users()
        .upsert_one(&Filter::eq(EMAIL_FIELD, email.as_str()), profile_update(&email, body))
        .await?;

    let token = issue_token(&email, state.config.token_secret.as_bytes(), ttl)?;

    Ok(Json(UpsertUserResponse { result, token }))
}

/// `GET /user`: all users.
pub async fn list_users_handler(State(state): State<AppState>) -> AppResult<Json<Vec<Document>>> {
    Ok(Json(state.store.users().find_all().await?))
}

/// `PUT /user/admin/{email}`: grant the admin role to `email`.
///
/// Reachable only once the requester's own record was checked for `admin`.
pub async fn grant_admin_handler(
    State(state): State<AppState>,
    Extension(requester): Extension<AuthenticatedUser>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<UpdateAck>> {
    let Path(email) = path?;
    let mut set = Fields::new();
    set.insert(ROLE_FIELD.to_string(), Value::String(ADMIN_ROLE.to_string()));

    let result = state
        .store
        .users()
        .update_one(&Filter::eq(EMAIL_FIELD, email.as_str()), set)
        .await?;

    info!(
        requester = requester.email(),
        target = %email,
        matched = result.matched_count,
        "admin role granted"
    );
    Ok(Json(result))
}

/// `GET /admin/{email}`: whether `email` holds the admin role. Unknown
/// users are reported as not admin.
pub async fn check_admin_handler(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<AdminStatusResponse>> {
    let Path(email) = path?;
    let user = state
        .store
        .users()
        .find_one(&Filter::eq(EMAIL_FIELD, email.as_str()))
        .await?;
    let admin = user.is_some_and(|u| is_admin(&u.fields));
    Ok(Json(AdminStatusResponse { admin }))
}
