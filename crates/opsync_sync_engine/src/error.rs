//! Error types for the sync engine.

use opsync_ops::OpError;
use opsync_store::{Ref, StoreError};
use std::io;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// An op was unknown or failed while applying.
    #[error("op error: {0}")]
    Op(#[from] OpError),

    /// The versioned store reported a failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The server log holds records local history does not contain.
    #[error(
        "server log has {log_len} record(s) but local history diverges at index {fork_point}; pull first"
    )]
    NonFastForward {
        /// Number of records in the log.
        log_len: usize,
        /// First index where the log and local history disagree.
        fork_point: usize,
    },

    /// Replaying a log record produced a different commit than recorded.
    #[error(
        "replay of record {index} ({op_name}) produced {actual} but the log records {expected}"
    )]
    ReplayMismatch {
        /// Index of the record in the log.
        index: usize,
        /// Op that was replayed.
        op_name: String,
        /// Ref recorded in the log.
        expected: Ref,
        /// Ref the replay produced.
        actual: Ref,
    },

    /// The remote-tracking branch is not a prefix of the server log.
    ///
    /// Pull recovers from this by rebuilding the branch, so it is only ever
    /// logged, never returned.
    #[error(
        "remote-tracking branch ({remote_len} commit(s)) diverges from the server log at index {fork_point}"
    )]
    DivergentRemote {
        /// First index where the branch and the log disagree.
        fork_point: usize,
        /// Length of the remote-tracking branch.
        remote_len: usize,
    },

    /// A line of the server log could not be parsed.
    #[error("malformed server log line {line}: {reason}")]
    MalformedLog {
        /// 1-based line number.
        line: usize,
        /// What was wrong.
        reason: String,
    },

    /// A record cannot be represented in the log format.
    #[error("invalid log record: {0}")]
    InvalidRecord(String),

    /// Reading or writing the server log failed.
    #[error("server log I/O error: {0}")]
    LogIo(#[from] io::Error),

    /// Another operation is already running on this engine.
    #[error("cannot start {requested}: {active} is in progress")]
    Busy {
        /// The operation in progress.
        active: String,
        /// The operation that was refused.
        requested: String,
    },
}

impl SyncError {
    /// Returns true if the caller should pull before pushing again.
    pub fn is_non_fast_forward(&self) -> bool {
        matches!(self, SyncError::NonFastForward { .. })
    }

    /// Returns true if the error indicates a non-deterministic op or a
    /// tampered log rather than an ordinary failure.
    pub fn is_correctness_fault(&self) -> bool {
        matches!(
            self,
            SyncError::ReplayMismatch { .. } | SyncError::MalformedLog { .. }
        )
    }

    /// Returns true if retrying the same call later may succeed.
    ///
    /// The engine never retries by itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_unavailable(),
            SyncError::LogIo(_) | SyncError::Busy { .. } => true,
            _ => false,
        }
    }
}
