//! Error types for store operations.

use crate::reference::Ref;
use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store cannot be reached or is held by another process.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A stored object could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// The requested commit does not exist.
    #[error("ref not found: {0}")]
    RefNotFound(Ref),

    /// Stored data failed an integrity check.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// A ref string could not be parsed.
    #[error("invalid ref: {0:?}")]
    InvalidRef(String),
}

impl StoreError {
    /// Returns true if the error means the store could not be reached at all,
    /// as opposed to the store reporting a failure.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
