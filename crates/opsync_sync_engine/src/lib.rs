//! # opsync Sync Engine
//!
//! Push, pull and rebase for opsync replicas.
//!
//! This crate provides:
//! - The server log: an append-only, line-oriented record of shared commits
//! - [`fork_point`]: the single primitive used to compare two histories
//! - [`SyncEngine`]: `op`, `push`, `pull`, `rebase` and a combined `sync`
//!
//! ## Architecture
//!
//! Each replica keeps two branches in its [`opsync_store::VersionedStore`]:
//! `local` (its own work) and `remote` (the last state it pulled from the
//! server log). Commits carry the op name and arguments that produced them,
//! so moving work between replicas means replaying ops rather than copying
//! state:
//! 1. `push` appends local commits the log has not seen yet
//! 2. `pull` replays log records the remote branch has not seen yet
//! 3. `rebase` replays local-only commits on top of the remote branch
//!
//! ## Key Invariants
//!
//! - Fast-forward detection is a prefix comparison of ref sequences
//! - Replay is driven by recorded `(op_name, args)`, never by diffing values
//! - Push never rewinds the log
//! - A failed rebase leaves `local` untouched
//! - Histories are re-read at every decision point, never cached

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod fork;
mod log;
mod state;

pub use config::{SyncConfig, DEFAULT_LOCAL_BRANCH, DEFAULT_REMOTE_BRANCH, DEFAULT_SCRATCH_BRANCH};
pub use error::{SyncError, SyncResult};
pub use fork::{fork_point, relation, HistoryRelation};
pub use log::{LogRecord, ServerLog};
pub use state::{
    PullOutcome, PushOutcome, RebaseOutcome, SyncCycleResult, SyncEngine, SyncState, SyncStats,
};
