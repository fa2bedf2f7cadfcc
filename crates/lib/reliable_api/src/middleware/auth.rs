//! Authorization middleware: bearer token verification and the policy gate.

use std::collections::HashMap;

use axum::extract::{MatchedPath, Query, Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::http::Uri;
use axum::middleware::Next;
use axum::response::Response;
use reliable_core::auth::jwt::verify_token;
use reliable_core::models::auth::{EMAIL_FIELD, TokenClaims, is_admin};
use reliable_core::store::{Filter, StoreGateway};
use tracing::{debug, error};

use crate::AppState;
use crate::error::AppError;
use crate::policy::{self, Access, Lookup};

/// Verified identity, stored in request extensions for protected routes.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub TokenClaims);

impl AuthenticatedUser {
    pub fn email(&self) -> &str {
        &self.0.email
    }
}

/// Verify the `Authorization` header.
///
/// A missing header is `Unauthenticated`. Anything else that fails to yield
/// a valid token (no second whitespace-delimited part, bad signature,
/// expiry) is `Forbidden`.
pub fn authenticate(headers: &HeaderMap, secret: &[u8]) -> Result<AuthenticatedUser, AppError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthenticated("Invalid authorization".into()))?;

    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.split_whitespace().nth(1))
        .ok_or_else(|| {
            debug!("authorization header has no bearer token");
            AppError::forbidden()
        })?;

    let claims = verify_token(token, secret).map_err(|e| {
        debug!(error = %e, "token rejected");
        AppError::from(e)
    })?;

    Ok(AuthenticatedUser(claims))
}

/// The verified email must equal the `param` query value.
fn check_owner(user: &AuthenticatedUser, uri: &Uri, param: &str) -> Result<(), AppError> {
    let Query(query) = Query::<HashMap<String, String>>::try_from_uri(uri)?;
    match query.get(param) {
        Some(owner) if owner == user.email() => Ok(()),
        other => {
            debug!(requester = user.email(), owner = ?other, "ownership check failed");
            Err(AppError::forbidden())
        }
    }
}

/// The requester's own stored user record must have role `admin`.
async fn check_admin(store: &StoreGateway, user: &AuthenticatedUser) -> Result<(), AppError> {
    let account = store
        .users()
        .find_one(&Filter::eq(EMAIL_FIELD, user.email()))
        .await?
        .ok_or_else(|| AppError::NotFound("Requester account not found".into()))?;

    if is_admin(&account.fields) {
        Ok(())
    } else {
        debug!(requester = user.email(), "admin check failed");
        Err(AppError::forbidden())
    }
}

/// Route-layer middleware applying the [`policy::ROUTE_POLICIES`] rule for
/// the matched route. On success for a protected route, the verified
/// identity is inserted as an [`AuthenticatedUser`] extension.
pub async fn enforce_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_default();

    let access = match policy::lookup(request.method(), &path) {
        Lookup::Listed(access) => access,
        Lookup::MethodNotListed => return Err(AppError::MethodNotAllowed),
        Lookup::Unlisted => {
            error!(method = %request.method(), path = %path, "route has no access policy");
            return Err(AppError::forbidden());
        }
    };

    if !access.requires_token() {
        return Ok(next.run(request).await);
    }

    let user = authenticate(request.headers(), state.config.token_secret.as_bytes())?;
    match access {
        Access::Owner { query_param } => check_owner(&user, request.uri(), query_param)?,
        Access::Admin => check_admin(&state.store, &user).await?,
        Access::Authenticated | Access::Public => {}
    }

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
