//! controller-relay server entry point.
//!
//! Loads configuration, initialises logging, and serves HTTP and
//! WebSocket traffic until shutdown.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use controller_relay::config::{LogFormat, RelayConfig};
use controller_relay::server::{self, WS_PATH};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing or bad PORT is the only fatal setting.
    let config = RelayConfig::from_env().context("invalid relay configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    for fallback in &config.fallbacks {
        tracing::warn!(error = %fallback, "unusable setting ignored; using default");
    }

    tracing::info!(
        addr = %config.listen_addr,
        mode = ?config.routing_mode,
        secret_configured = config.shared_secret.is_some(),
        allow_unauthenticated_ws = config.allow_unauthenticated_ws,
        heartbeat_secs = config.heartbeat_interval.as_secs(),
        "starting controller-relay"
    );
    if config.shared_secret.is_none() {
        tracing::warn!("RELAY_SECRET not set; all publish attempts will be rejected");
    }

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, ws_path = WS_PATH, "HTTP+WS listening");

    server::serve(listener, &config, server::shutdown_signal()).await?;

    tracing::info!("controller-relay stopped");
    Ok(())
}
