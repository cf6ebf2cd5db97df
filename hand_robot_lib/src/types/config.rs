use eyre::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::time::Duration;
use thiserror::Error;

pub const MIN_UPDATE_FREQUENCY_HZ: u32 = 1;
pub const MAX_UPDATE_FREQUENCY_HZ: u32 = 30;

/// Path on the relay server that accepts WebSocket upgrades
pub const RELAY_WS_PATH: &str = "/ws";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("target host is missing")]
    MissingHost,
    #[error("target port must be non-zero")]
    InvalidPort,
    #[error("update frequency {0} Hz outside [1, 30]")]
    InvalidFrequency(u32),
}

/// Where and how fast the streaming client pushes commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub target_host: String,
    pub target_port: u16,
    pub update_frequency_hz: u32,
    /// Selects the delimited text encoding instead of compact JSON
    pub compression_enabled: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            target_host: "192.168.1.100".to_string(),
            target_port: 8080,
            update_frequency_hz: 10,
            compression_enabled: false,
        }
    }
}

impl ConnectionConfig {
    pub fn new(target_host: impl Into<String>, target_port: u16, update_frequency_hz: u32) -> Self {
        Self {
            target_host: target_host.into(),
            target_port,
            update_frequency_hz,
            compression_enabled: false,
        }
    }

    pub fn with_compression(mut self, compression_enabled: bool) -> Self {
        self.compression_enabled = compression_enabled;
        self
    }

    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ConnectionConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from TARGET_HOST, TARGET_PORT, UPDATE_FREQUENCY_HZ and COMPRESSION
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(host) = env::var("TARGET_HOST") {
            self.target_host = host;
        }
        if let Some(port) = env::var("TARGET_PORT").ok().and_then(|v| v.parse().ok()) {
            self.target_port = port;
        }
        if let Some(hz) = env::var("UPDATE_FREQUENCY_HZ").ok().and_then(|v| v.parse().ok()) {
            self.update_frequency_hz = hz;
        }
        if let Some(compression) = env::var("COMPRESSION").ok().and_then(|v| v.parse().ok()) {
            self.compression_enabled = compression;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.target_host.trim().is_empty() {
            return Err(ConfigError::MissingHost);
        }
        if self.target_port == 0 {
            return Err(ConfigError::InvalidPort);
        }
        if !(MIN_UPDATE_FREQUENCY_HZ..=MAX_UPDATE_FREQUENCY_HZ).contains(&self.update_frequency_hz) {
            return Err(ConfigError::InvalidFrequency(self.update_frequency_hz));
        }
        Ok(())
    }

    /// Loopback targets are the local relay server; anything else is a board
    pub fn targets_relay(&self) -> bool {
        matches!(self.target_host.trim(), "localhost" | "127.0.0.1" | "::1")
    }

    pub fn endpoint_url(&self) -> String {
        let host = self.target_host.trim();
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };

        if self.targets_relay() {
            format!("ws://{}:{}{}", host, self.target_port, RELAY_WS_PATH)
        } else {
            format!("ws://{}:{}", host, self.target_port)
        }
    }

    /// Streaming period, `1000 / update_frequency_hz` milliseconds
    pub fn update_interval(&self) -> Duration {
        let hz = self
            .update_frequency_hz
            .clamp(MIN_UPDATE_FREQUENCY_HZ, MAX_UPDATE_FREQUENCY_HZ);
        Duration::from_millis(1000 / hz as u64)
    }
}

/// Relay server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind_address: String,
    pub port: u16,
    /// Sessions silent for longer than this are evicted
    pub heartbeat_timeout_secs: u64,
    pub sweep_interval_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 5000,
            heartbeat_timeout_secs: 30,
            sweep_interval_secs: 10,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
        }
    }
}

impl RelayConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(bind_address) = env::var("BIND_ADDRESS") {
            self.bind_address = bind_address;
        }
        if let Some(port) = env::var("RELAY_PORT").ok().and_then(|v| v.parse().ok()) {
            self.port = port;
        }
        if let Some(secs) = env::var("HEARTBEAT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) {
            self.heartbeat_timeout_secs = secs;
        }
        if let Some(secs) = env::var("SWEEP_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()) {
            self.sweep_interval_secs = secs;
        }
        if let Ok(origins) = env::var("ALLOWED_ORIGINS") {
            self.allowed_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_timeout_secs == 0 || self.sweep_interval_secs == 0 {
            return Err(eyre::eyre!(
                "Heartbeat timeout ({}s) and sweep interval ({}s) must be non-zero",
                self.heartbeat_timeout_secs,
                self.sweep_interval_secs
            ));
        }
        Ok(())
    }

    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_connection_config_is_valid() {
        let config = ConnectionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.update_interval(), Duration::from_millis(100));
        assert!(!config.targets_relay());
        assert_eq!(config.endpoint_url(), "ws://192.168.1.100:8080");
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ConnectionConfig::new("  ", 8080, 10);
        assert_eq!(config.validate(), Err(ConfigError::MissingHost));

        config.target_host = "10.0.0.2".to_string();
        config.target_port = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidPort));

        config.target_port = 81;
        config.update_frequency_hz = 31;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFrequency(31)));

        config.update_frequency_hz = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidFrequency(0)));
    }

    #[test]
    fn test_loopback_targets_use_relay_path() {
        assert_eq!(ConnectionConfig::new("localhost", 5000, 10).endpoint_url(), "ws://localhost:5000/ws");
        assert_eq!(ConnectionConfig::new("127.0.0.1", 5000, 10).endpoint_url(), "ws://127.0.0.1:5000/ws");
        assert_eq!(ConnectionConfig::new("::1", 5000, 10).endpoint_url(), "ws://[::1]:5000/ws");
    }

    #[test]
    fn test_update_interval_follows_frequency() {
        assert_eq!(ConnectionConfig::new("a", 1, 1).update_interval(), Duration::from_millis(1000));
        assert_eq!(ConnectionConfig::new("a", 1, 30).update_interval(), Duration::from_millis(33));
    }

    #[test]
    fn test_connection_config_from_toml() {
        let config: ConnectionConfig = toml::from_str(
            r#"
            target_host = "192.168.4.1"
            target_port = 81
            compression_enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(config.target_port, 81);
        assert_eq!(config.update_frequency_hz, 10);
        assert!(config.compression_enabled);
    }

    #[test]
    fn test_relay_config_defaults() {
        let config = RelayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.heartbeat_timeout(), Duration::from_secs(30));
        assert_eq!(config.sweep_interval(), Duration::from_secs(10));
        assert_eq!(config.socket_address(), "0.0.0.0:5000");
    }
}
