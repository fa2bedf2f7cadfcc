//! Request handlers.
//!
//! Handlers assume the access check for their route already passed; see
//! [`crate::policy`].

pub mod hello;
pub mod orders;
pub mod parts;
pub mod reviews;
pub mod users;
