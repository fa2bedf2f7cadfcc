//! # reliable_core
//!
//! Core domain logic for Reliable Parts: identity tokens, document models
//! and the resource store gateway.

pub mod auth;
pub mod models;
pub mod store;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
