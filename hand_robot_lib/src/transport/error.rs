use crate::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// Rejected before any connection attempt
    #[error("invalid connection config: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("socket error: {0}")]
    Socket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("not connected")]
    NotConnected,

    /// The link task is behind; the frame was dropped
    #[error("outbound queue full")]
    QueueFull,

    /// A disconnect or retarget happened while the attempt was in flight
    #[error("connection attempt cancelled")]
    Cancelled,
}

impl TransportError {
    pub fn is_config(&self) -> bool {
        matches!(self, TransportError::Config(_))
    }
}
