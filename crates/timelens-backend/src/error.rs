//! Backend error types

use thiserror::Error;
use timelens_bridge::BridgeError;
use timelens_codec::CodecError;
use timelens_common::ValidationError;
use timelens_history::HistoryError;

/// Backend result type
pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised while loading settings or handling panel messages
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Failed to write settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid settings: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid payload: {0}")]
    Codec(#[from] CodecError),

    #[error("Malformed '{event}' message: {reason}")]
    InvalidMessage { event: String, reason: String },

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

impl BackendError {
    /// Create an InvalidMessage error
    pub fn invalid_message(event: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidMessage {
            event: event.into(),
            reason: reason.to_string(),
        }
    }
}
