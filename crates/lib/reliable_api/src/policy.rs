//! Route access policy.
//!
//! The single source of truth for which check guards which route. The
//! `enforce_access` middleware consults this table for every matched route;
//! handlers never perform authorization themselves.

use axum::http::Method;

use crate::routes;

/// Check applied before a route's handler runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No credential required.
    Public,
    /// A valid bearer token is required.
    Authenticated,
    /// A valid bearer token whose email equals the named query parameter.
    Owner { query_param: &'static str },
    /// A valid bearer token whose owner's stored user record has role `admin`.
    Admin,
}

impl Access {
    pub fn requires_token(self) -> bool {
        !matches!(self, Access::Public)
    }
}

/// One row of the policy table.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub method: Method,
    pub path: &'static str,
    pub access: Access,
}

const fn rule(method: Method, path: &'static str, access: Access) -> RoutePolicy {
    RoutePolicy {
        method,
        path,
        access,
    }
}

/// Every route the API serves.
pub static ROUTE_POLICIES: [RoutePolicy; 14] = [
    rule(Method::GET, routes::ROOT, Access::Public),
    rule(Method::GET, routes::HEALTH, Access::Public),
    rule(Method::GET, routes::PARTS, Access::Public),
    rule(Method::POST, routes::PARTS, Access::Public),
    rule(Method::GET, routes::PART_ID, Access::Public),
    rule(Method::DELETE, routes::PART_ID, Access::Public),
    rule(Method::POST, routes::ORDERS, Access::Public),
    rule(
        Method::GET,
        routes::ORDERS,
        Access::Owner {
            query_param: "customer",
        },
    ),
    rule(Method::PUT, routes::USER_EMAIL, Access::Public),
    rule(Method::GET, routes::USERS, Access::Authenticated),
    rule(Method::PUT, routes::USER_ADMIN_EMAIL, Access::Admin),
    rule(Method::GET, routes::ADMIN_EMAIL, Access::Public),
    rule(Method::POST, routes::REVIEWS, Access::Public),
    rule(Method::GET, routes::REVIEWS, Access::Public),
];

/// Result of looking up a request in the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Listed(Access),
    /// The path is listed, but not for this method.
    MethodNotListed,
    /// The path template is not in the table at all.
    Unlisted,
}

/// Find the access rule for a matched route template.
///
/// `HEAD` is looked up as `GET`, matching how axum routes it.
pub fn lookup(method: &Method, path: &str) -> Lookup {
    let method = if *method == Method::HEAD {
        &Method::GET
    } else {
        method
    };
    let mut path_listed = false;
    for policy in &ROUTE_POLICIES {
        if policy.path != path {
            continue;
        }
        if policy.method == *method {
            return Lookup::Listed(policy.access);
        }
        path_listed = true;
    }
    if path_listed {
        Lookup::MethodNotListed
    } else {
        Lookup::Unlisted
    }
}
