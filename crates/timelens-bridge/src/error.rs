//! Error types for the bridge

use thiserror::Error;

/// Bridge result type
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while sending over a bridge
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The receiving side has gone away
    #[error("Bridge closed, dropped event: {0}")]
    Closed(String),
}
