mod server;
mod session;

use eyre::{Result, WrapErr};
use hand_robot_lib::{init_tracing_with, RelayConfig, RELAY_WS_PATH};
use server::{router, spawn_sweeper, AppState};
use std::env;
use std::path::Path;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";

fn load_config() -> Result<RelayConfig> {
    let path = env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        info!("Loading relay config from {}", path);
        RelayConfig::load_from_file(&path).wrap_err_with(|| format!("Failed to load {}", path))?
    } else {
        warn!("Relay config {} not found, using defaults", path);
        RelayConfig::default()
    }
    .apply_env_overrides();

    config.validate()?;
    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_tracing_with("info,hyper=warn");

    info!("Starting relay server...");

    let config = load_config()?;
    info!(
        "Heartbeat timeout: {}s, sweep interval: {}s",
        config.heartbeat_timeout_secs, config.sweep_interval_secs
    );

    let state = AppState::new();
    let sweeper = spawn_sweeper(state.clone(), config.sweep_interval(), config.heartbeat_timeout());
    let app = router(state, &config.allowed_origins);

    let addr = config.socket_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {}", addr))?;

    info!("Relay listening on ws://{}{}", addr, RELAY_WS_PATH);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Relay server shutdown complete");
    Ok(())
}
