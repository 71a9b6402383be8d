//! Error types for op lookup and execution.

use thiserror::Error;

/// Result type for op operations.
pub type OpResult<T> = Result<T, OpError>;

/// Errors raised by the registry or by an op while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    /// No op is registered under this name.
    #[error("unknown op: {name}")]
    UnknownOperation {
        /// The requested name.
        name: String,
    },

    /// An op with this name is already registered.
    #[error("op already registered: {name}")]
    DuplicateOperation {
        /// The conflicting name.
        name: String,
    },

    /// The op was called with arguments it cannot use.
    #[error("invalid arguments for {op}: {message}")]
    InvalidArguments {
        /// Op name.
        op: String,
        /// What was wrong.
        message: String,
    },

    /// The root value has a shape the op cannot work with.
    #[error("{op} cannot apply to current state: {message}")]
    InvalidState {
        /// Op name.
        op: String,
        /// What was wrong.
        message: String,
    },
}

impl OpError {
    pub(crate) fn invalid_arguments(op: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            op: op.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_state(op: &str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            op: op.to_string(),
            message: message.into(),
        }
    }
}
