//! Error types for the history engine

use thiserror::Error;
use timelens_codec::CodecError;
use timelens_common::{PathError, ValidationError};

/// History result type
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Errors raised by a mutation handler
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The module state the handler is bound to no longer exists
    #[error("State for module '{module}' no longer exists")]
    StaleState {
        /// Module key
        module: String,
    },

    /// The handler itself failed
    #[error("Mutation handler failed: {0}")]
    Failed(String),
}

impl HandlerError {
    /// Create a Failed error with context
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Errors raised by a store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    /// Module path is empty
    #[error("Invalid module path: {0:?}")]
    InvalidModulePath(String),

    /// Module already registered at this path
    #[error("Module already registered: {0}")]
    AlreadyRegistered(String),

    /// No module registered at this path
    #[error("Module not registered: {0}")]
    NotRegistered(String),

    /// Parent state has to exist before a child module is attached
    #[error("Cannot register '{module}': parent state '{parent}' does not exist")]
    ParentMissing {
        /// Module key
        module: String,
        /// Parent key
        parent: String,
    },

    /// Children have to be detached before their parent
    #[error("Cannot unregister '{module}': child modules still registered: {children:?}")]
    HasChildren {
        /// Module key
        module: String,
        /// Registered child keys
        children: Vec<String>,
    },

    /// No handler registered for the mutation type
    #[error("Unknown mutation type: {0}")]
    UnknownMutation(String),

    /// Handler error
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// State path error
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Errors that can occur in the history engine
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Store adapter error on a live operation
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Reconstruction failed; the live store is untouched
    #[error("State reconstruction failed at index {index}: {source}")]
    ReplayFailed {
        /// Log index of the failing step
        index: i64,
        /// Underlying error
        #[source]
        source: StoreError,
    },

    /// Imported or edited payload could not be decoded
    #[error("Invalid payload: {0}")]
    InvalidPayload(#[from] CodecError),

    /// Edit path error
    #[error("Invalid state path: {0}")]
    Path(#[from] PathError),

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    Config(#[from] ValidationError),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl HistoryError {
    /// Create a ReplayFailed error
    pub fn replay_failed(index: i64, source: impl Into<StoreError>) -> Self {
        Self::ReplayFailed {
            index,
            source: source.into(),
        }
    }

    /// Create a Validation error with context
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
