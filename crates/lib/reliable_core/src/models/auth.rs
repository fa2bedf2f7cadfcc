//! Identity domain models.

use serde::{Deserialize, Serialize};

use super::document::Fields;

/// Role value that grants admin privileges.
pub const ADMIN_ROLE: &str = "admin";

/// Field holding a user's natural key.
pub const EMAIL_FIELD: &str = "email";

/// Field holding a user's role.
pub const ROLE_FIELD: &str = "role";

/// Field holding an order's owner email.
pub const CUSTOMER_FIELD: &str = "customer";

/// JWT claims embedded in identity tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Verified identity.
    pub email: String,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Issued at (unix timestamp).
    pub iat: i64,
}

/// Whether a stored user document carries exactly `role == "admin"`.
pub fn is_admin(user: &Fields) -> bool {
    user.get(ROLE_FIELD).and_then(|v| v.as_str()) == Some(ADMIN_ROLE)
}
