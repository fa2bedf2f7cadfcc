//! Reliable Parts API server binary.
//!
//! Connects the PostgreSQL document store (or an in-memory one), runs
//! migrations and serves the REST API until Ctrl-C / SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use reliable_api::config::{ApiConfig, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_REQUEST_TIMEOUT_SECS};
use reliable_core::auth::jwt::{DEFAULT_TOKEN_TTL_SECS, MAX_TOKEN_TTL_SECS, resolve_token_secret};
use reliable_core::store::postgres::connection_url;
use reliable_core::store::{PgDocumentStore, StoreGateway};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "reliable_api_server", about = "Reliable Parts API server")]
struct Args {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Full PostgreSQL connection URL. Takes precedence over the `--db-*` parts.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Database user.
    #[arg(long, env = "DB_USER")]
    db_user: Option<String>,

    /// Database password.
    #[arg(long, env = "DB_PASS", hide_env_values = true)]
    db_pass: Option<String>,

    /// Database host (with optional port).
    #[arg(long, env = "DB_HOST", default_value = "localhost:5432")]
    db_host: String,

    /// Database name.
    #[arg(long, env = "DB_NAME", default_value = "reliable_parts")]
    db_name: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 5)]
    max_connections: u32,

    /// Seconds to wait for a pooled connection before failing the request.
    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    acquire_timeout_secs: u64,

    /// Per-request timeout in seconds.
    #[arg(
        long,
        env = "REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    request_timeout_secs: u64,

    /// Lifetime of issued identity tokens in seconds (at most 30 days).
    #[arg(
        long,
        env = "TOKEN_TTL_SECS",
        default_value_t = DEFAULT_TOKEN_TTL_SECS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECS)
    )]
    token_ttl_secs: i64,

    /// Serve from an in-memory store instead of PostgreSQL. Data is lost on exit.
    #[arg(long, env = "IN_MEMORY_STORE", default_value_t = false)]
    in_memory: bool,
}

impl Args {
    fn database_url(&self) -> Result<String, Box<dyn std::error::Error>> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }
        let user = self
            .db_user
            .as_deref()
            .ok_or("DATABASE_URL or DB_USER must be set")?;
        Ok(connection_url(
            user,
            self.db_pass.as_deref(),
            &self.db_host,
            &self.db_name,
        )?)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new("info,reliable_api=debug,reliable_core=debug")
                }),
        )
        .init();

    let args = Args::parse();

    let store = if args.in_memory {
        warn!("using in-memory store; data will not survive restarts");
        StoreGateway::in_memory()
    } else {
        info!(
            max_connections = args.max_connections,
            db_host = %args.db_host,
            db_name = %args.db_name,
            "configuring connection pool"
        );
        let pool = PgPoolOptions::new()
            .max_connections(args.max_connections)
            .acquire_timeout(Duration::from_secs(args.acquire_timeout_secs))
            .connect(&args.database_url()?)
            .await?;

        let backend = PgDocumentStore::new(pool);
        info!("running database migrations");
        backend.migrate().await?;

        StoreGateway::new(Arc::new(backend))
    };

    let config = ApiConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        token_secret: resolve_token_secret(),
        token_ttl_secs: args.token_ttl_secs,
        request_timeout_secs: args.request_timeout_secs,
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let app = reliable_api::router(reliable_api::AppState { store, config });

    info!(addr = %local_addr, "Reliable parts server is running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
