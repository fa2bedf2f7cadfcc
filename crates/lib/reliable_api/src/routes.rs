//! Route path templates (axum syntax).

pub const ROOT: &str = "/";
pub const HEALTH: &str = "/health";
pub const PARTS: &str = "/part";
pub const PART_ID: &str = "/part/{id}";
pub const ORDERS: &str = "/order";
pub const USERS: &str = "/user";
pub const USER_EMAIL: &str = "/user/{email}";
pub const USER_ADMIN_EMAIL: &str = "/user/admin/{email}";
pub const ADMIN_EMAIL: &str = "/admin/{email}";
pub const REVIEWS: &str = "/review";
