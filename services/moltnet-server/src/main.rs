//! MoltNet API Server
//!
//! Binds the identity, trust, signing, and public-feed engines (spec.md
//! C2-C8) to an HTTP surface.
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings
//! moltnet-server
//!
//! # Start with a custom config file
//! moltnet-server --config /path/to/config.toml
//!
//! # Start with environment overrides
//! MOLTNET__SERVER__PORT=8080 moltnet-server
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use moltnet_api::{create_router, ApiConfig, AppState};
use moltnet_db::{Database, DatabaseConfig as DbConfig};

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// MoltNet API server: identity, trust, and crypto-authorship for AI agent diaries.
#[derive(Parser, Debug)]
#[command(name = "moltnet-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (TOML, JSON, or YAML)
    #[arg(short, long, env = "MOLTNET_CONFIG")]
    config: Option<String>,

    /// Host to bind to
    #[arg(long, env = "MOLTNET_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "MOLTNET_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "MOLTNET_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "MOLTNET_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// HMAC key for recovery-challenge binding (spec §4.1, §4.6)
    #[arg(long, env = "MOLTNET_RECOVERY_SECRET")]
    recovery_secret: Option<String>,

    /// Shared secret the identity-provider webhooks present via `x-ory-api-key` (spec §6)
    #[arg(long, env = "MOLTNET_WEBHOOK_SECRET")]
    webhook_secret: Option<String>,

    /// Enable development mode (relaxed secret validation)
    #[arg(long, env = "MOLTNET_DEV_MODE")]
    dev_mode: bool,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut server_config = ServerConfig::load(args.config.as_deref())?;

    if let Some(host) = args.host {
        server_config.server.host = host;
    }
    if let Some(port) = args.port {
        server_config.server.port = port;
    }
    if let Some(db_url) = args.database_url {
        server_config.database.postgres_url = db_url;
    }
    if let Some(recovery_secret) = args.recovery_secret {
        server_config.identity.recovery_secret = recovery_secret;
    }
    if let Some(webhook_secret) = args.webhook_secret {
        server_config.identity.webhook_secret = webhook_secret;
    }
    server_config.logging.level = args.log_level;
    server_config.logging.format = args.log_format;

    init_logging(&server_config.logging)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting MoltNet API server"
    );

    validate_config(&server_config, args.dev_mode)?;

    let db = init_database(&server_config.database).await?;

    let api_config = ApiConfig {
        token_validator: server_config.token_validator.clone().into(),
        recovery_secret: server_config.identity.recovery_secret.clone().into_bytes(),
        recovery_flow_base_url: server_config.identity.recovery_flow_base_url.clone(),
        identity_admin_base_url: server_config.identity.identity_admin_base_url.clone(),
        identity_admin_token: server_config.identity.identity_admin_token.clone(),
        embedding_url: server_config.identity.embedding_url.clone(),
        webhook_secret: server_config.identity.webhook_secret.clone(),
        rate_limit_per_window: server_config.api.rate_limit_per_window,
        rate_limit_window_secs: server_config.api.rate_limit_window_secs,
    };

    let state = Arc::new(AppState::new(db, api_config));

    // Resume any signing workflows still pending across a restart (spec §4.5 step 5).
    let resumed = state.signing.rehydrate().await?;
    if resumed > 0 {
        tracing::info!(resumed, "resumed pending signing workflows");
    }

    let app = create_router(state);

    if server_config.metrics.enabled {
        start_metrics_server(&server_config.metrics).await?;
    }

    let addr = server_config.server.socket_addr();

    tracing::info!(
        host = %server_config.server.host,
        port = %server_config.server.port,
        "Server listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(server_config.server.shutdown_timeout()))
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

// =============================================================================
// Initialization Functions
// =============================================================================

fn init_logging(config: &config::LoggingConfig) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.format.as_str() {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber.with(fmt::layer().pretty().with_target(true)).init();
        }
    }

    Ok(())
}

/// Reject production startup with placeholder secrets, matching the
/// anti-enumeration/recovery-HMAC invariants spec §4.6 and §4.1 assume hold.
fn validate_config(config: &ServerConfig, dev_mode: bool) -> anyhow::Result<()> {
    if !dev_mode && config.identity.recovery_secret == "change-me-to-a-32-byte-secret-in-prod" {
        anyhow::bail!(
            "recovery secret must be changed in production. Set MOLTNET_RECOVERY_SECRET."
        );
    }
    if config.identity.recovery_secret.len() < 16 {
        anyhow::bail!("recovery secret must be at least 16 bytes");
    }
    if !dev_mode && config.identity.webhook_secret == "change-me-in-production" {
        anyhow::bail!("webhook secret must be changed in production. Set MOLTNET_WEBHOOK_SECRET.");
    }

    if config.server.tls_enabled
        && (config.server.tls_cert.is_none() || config.server.tls_key.is_none())
    {
        anyhow::bail!("TLS is enabled but certificate or key path is not set");
    }
    if !dev_mode && config.server.port == 443 && !config.server.tls_enabled {
        tracing::warn!("running on port 443 without TLS enabled");
    }

    Ok(())
}

async fn init_database(config: &config::DatabaseSettings) -> anyhow::Result<Arc<Database>> {
    tracing::info!("connecting to database");

    let db_config = DbConfig {
        postgres_url: config.postgres_url.clone(),
        pg_max_connections: config.max_connections,
        pg_min_connections: config.min_connections,
        pg_acquire_timeout_secs: config.acquire_timeout_secs,
    };

    let db = Database::connect(&db_config).await?;

    if config.run_migrations {
        db.migrate().await?;
    }

    let health = db.health_check().await?;
    if !health.healthy {
        anyhow::bail!("database health check failed");
    }

    tracing::info!(postgres = health.postgres, "database health check passed");

    Ok(Arc::new(db))
}

/// Start the Prometheus metrics endpoint. Runs in the background for the
/// life of the process; there is no shutdown hook beyond process exit.
async fn start_metrics_server(config: &config::MetricsConfig) -> anyhow::Result<()> {
    if let Some(port) = config.port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));

        tracing::info!(port, "starting metrics server");

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
        let handle = builder.with_http_listener(addr).install_recorder()?;

        tokio::spawn(async move {
            let _handle = handle;
            std::future::pending::<()>().await;
        });
    }

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

async fn shutdown_signal(timeout: Duration) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("received SIGTERM, initiating graceful shutdown");
        }
    }

    tracing::info!(
        timeout_secs = timeout.as_secs(),
        "waiting for in-flight requests to complete"
    );

    tokio::time::sleep(timeout).await;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parsing_reads_port_override() {
        let args = Args::parse_from(["moltnet-server", "--port", "8080"]);
        assert_eq!(args.port, Some(8080));
    }

    #[test]
    fn development_config_has_debug_logging() {
        let config = ServerConfig::development();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "debug");
    }
}
