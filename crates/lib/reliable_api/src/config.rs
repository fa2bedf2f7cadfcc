//! API server configuration.

use reliable_core::auth::jwt::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, resolve_token_secret};

/// Default listen interface.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "0.0.0.0:5000").
    pub bind_addr: String,
    /// Identity token signing secret.
    pub token_secret: String,
    /// Lifetime of tokens issued by the upsert-user route.
    pub token_ttl_secs: i64,
    /// Requests running longer than this are answered with 408.
    pub request_timeout_secs: u64,
}

impl ApiConfig {
    /// Reads configuration from environment variables with sensible defaults.
    ///
    /// | Variable               | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `5000`                     |
    /// | `ACCESS_TOKEN_SECRET`  | `JWT_SECRET`, else random  |
    /// | `TOKEN_TTL_SECS`       | `3600`, at most 30 days    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    ///
    /// Values that fail to parse or fall outside their range use the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok(), resolve_token_secret())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>, token_secret: String) -> Self {
        let parse = |name: &str| var(name).and_then(|v| v.trim().parse::<i64>().ok());

        let host = var("HOST")
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = var("PORT")
            .and_then(|v| v.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        let token_ttl_secs = parse("TOKEN_TTL_SECS")
            .filter(|ttl| (1..=MAX_TOKEN_TTL_SECS).contains(ttl))
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        let request_timeout_secs = parse("REQUEST_TIMEOUT_SECS")
            .and_then(|secs| u64::try_from(secs).ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);

        Self {
            bind_addr: format!("{host}:{port}"),
            token_secret,
            token_ttl_secs,
            request_timeout_secs,
        }
    }

    /// Configuration for tests and embedding: fixed secret, default timings.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            bind_addr: format!("127.0.0.1:{DEFAULT_PORT}"),
            token_secret: secret.into(),
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}
