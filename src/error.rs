use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed envelope: {0}")]
    Envelope(String),

    #[error("Callback channel error: {0}")]
    Channel(String),

    #[error("Callback channel already closed")]
    ChannelClosed,

    #[error("Plan id store error: {0}")]
    Store(String),

    #[error("Provisioning SDK error: {0}")]
    Sdk(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
