//! Error types for the value codec

use thiserror::Error;

/// Codec result type
pub type Result<T> = std::result::Result<T, CodecError>;

/// Errors that can occur while encoding or decoding values
#[derive(Debug, Error)]
pub enum CodecError {
    /// Input was not valid JSON
    #[error("Malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A `_custom` envelope could not be revived
    #[error("Invalid {kind} envelope: {message}")]
    InvalidEnvelope { kind: String, message: String },

    /// Value has no representation in a plain store state
    #[error("Value of type {0} cannot be stored in state")]
    Unrepresentable(&'static str),
}

impl CodecError {
    /// Create an InvalidEnvelope error with context
    pub fn invalid_envelope(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvelope {
            kind: kind.into(),
            message: message.into(),
        }
    }
}
