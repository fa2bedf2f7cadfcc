//! JWT token generation and verification.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use tracing::warn;

use super::AuthError;
use crate::models::auth::TokenClaims;

/// Default identity token lifetime: 1 hour.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 60 * 60;

/// Longest configurable token lifetime: 30 days.
pub const MAX_TOKEN_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Generate a signed identity token (HS256) carrying `email`, valid for `ttl`.
///
/// A `ttl` whose expiry falls outside the representable date range is an
/// `Encode` error.
pub fn issue_token(email: &str, secret: &[u8], ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let exp = now
        .checked_add_signed(ttl)
        .ok_or_else(|| AuthError::Encode(format!("token lifetime out of range: {ttl}")))?;
    let claims = TokenClaims {
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|e| AuthError::Encode(format!("jwt encode: {e}")))
}

/// Verify an identity token, returning the claims on success.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<TokenClaims, AuthError> {
    let key = DecodingKey::from_secret(secret);
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.leeway = 0;
    decode::<TokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::Expired,
            _ => AuthError::InvalidSignature,
        })
}

/// Resolve the signing secret: env var `ACCESS_TOKEN_SECRET` → `JWT_SECRET` → random.
///
/// A generated secret lives only as long as the process, so every token
/// issued before a restart stops verifying.
pub fn resolve_token_secret() -> String {
    for var in ["ACCESS_TOKEN_SECRET", "JWT_SECRET"] {
        if let Ok(secret) = std::env::var(var)
            && !secret.is_empty()
        {
            return secret;
        }
    }
    warn!("ACCESS_TOKEN_SECRET not set, generating an ephemeral token secret");
    generate_secret()
}

fn generate_secret() -> String {
    rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
