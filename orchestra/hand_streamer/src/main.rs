mod pipeline;

use eyre::{Result, WrapErr};
use hand_robot_lib::{
    init_tracing, ConnectionConfig, ConnectionObserver, ReportFormat, StreamingTransportClient,
    TransportError,
};
use pipeline::FramePipeline;
use std::env;
use std::path::Path;
use std::sync::{Arc, PoisonError};
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/connection.toml";

struct LinkLogger;

impl ConnectionObserver for LinkLogger {
    fn on_connected(&self) {
        info!("Arm link up");
    }

    fn on_disconnected(&self) {
        warn!("Arm link down");
    }

    fn on_error(&self, error: &TransportError) {
        error!("Arm link error: {}", error);
    }
}

fn load_config() -> Result<ConnectionConfig> {
    let path = env::var("CONNECTION_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let config = if Path::new(&path).exists() {
        info!("Loading connection config from {}", path);
        ConnectionConfig::load_from_file(&path).wrap_err_with(|| format!("Failed to load {}", path))?
    } else {
        warn!("Connection config {} not found, using defaults", path);
        ConnectionConfig::default()
    };

    Ok(config.apply_env_overrides())
}

fn report_format() -> Option<ReportFormat> {
    let value = env::var("REPORT_FORMAT").ok()?;
    match value.parse() {
        Ok(format) => Some(format),
        Err(e) => {
            warn!("{}, reports disabled", e);
            None
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _guard = init_tracing();

    info!("Starting hand streamer...");

    let config = load_config()?;
    config.validate().wrap_err("Invalid connection config")?;
    info!(
        "Target: {} at {} Hz (compression: {})",
        config.endpoint_url(),
        config.update_frequency_hz,
        config.compression_enabled
    );

    let mut pipeline = FramePipeline::new(report_format());
    let latest = pipeline.latest();

    let client = StreamingTransportClient::builder(config)
        .observer(Arc::new(LinkLogger))
        .build();
    if let Err(e) = client.connect().await {
        warn!("Initial connection failed, retrying in background: {}", e);
    }
    client.start_streaming(move || *latest.lock().unwrap_or_else(PoisonError::into_inner));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut frames: u64 = 0;

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match pipeline.process_line(&line, Instant::now()) {
                        Ok(result) => {
                            frames += 1;
                            if let Some(report) = result.report {
                                debug!("Report:\n{}", report);
                            }
                        }
                        Err(e) => warn!("Skipping frame: {:#}", e),
                    }
                }
                Ok(None) => {
                    info!("End of landmark input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read landmark input: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                break;
            }
        }
    }

    client.shutdown().await;

    info!("Hand streamer shutdown complete ({} frames)", frames);
    Ok(())
}
