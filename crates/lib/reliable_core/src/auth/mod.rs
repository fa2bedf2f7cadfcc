//! Identity token issuance and verification.
//!
//! Shared by `reliable_api` for the upsert-user flow (issue) and the
//! authorization middleware (verify).

pub mod jwt;

use thiserror::Error;

/// Token service errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed token, or not signed with the expected secret.
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token expired")]
    Expired,

    #[error("Token encode error: {0}")]
    Encode(String),
}
