//! CLI command implementations.

pub mod dump_log;
pub mod inspect;
pub mod op;
pub mod replicate;

use clap::ValueEnum;
use opsync_ops::Registry;
use opsync_store::{FileStore, StoreConfig};
use opsync_sync_engine::{SyncConfig, SyncEngine};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors raised by the CLI itself rather than the libraries it drives.
#[derive(Error, Debug)]
pub enum CliError {
    /// An op argument was not valid JSON.
    #[error("argument {index} is not valid JSON ({input:?}): {message}")]
    InvalidJsonArg {
        /// 0-based position of the argument.
        index: usize,
        /// The raw argument.
        input: String,
        /// Parser message.
        message: String,
    },

    /// A read-only command was pointed at a store that does not exist.
    #[error("no store at {0}")]
    MissingStore(String),
}

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per entry.
    Text,
    /// Pretty-printed JSON array.
    Json,
}

/// Settings shared by every command.
pub struct Context {
    source: String,
    verbose: bool,
}

impl Context {
    /// Creates a context from the global flags.
    pub fn new(source: String, verbose: bool) -> Self {
        Self { source, verbose }
    }

    /// Opens the store at `db` (creating it if needed) and wraps it in an
    /// engine with the built-in ops.
    pub fn engine(&self, db: &Path) -> Result<SyncEngine<FileStore>, Box<dyn std::error::Error>> {
        let store = FileStore::open(db, StoreConfig::default())?;
        debug!("opened store at {} as {}", db.display(), self.source);
        let config = SyncConfig::new(self.source.clone()).with_verbose(self.verbose);
        Ok(SyncEngine::new(config, store, Registry::builtin()))
    }
}

/// Opens an existing store without creating it.
pub fn open_existing(db: &Path) -> Result<FileStore, Box<dyn std::error::Error>> {
    if !db.is_dir() {
        return Err(CliError::MissingStore(db.display().to_string()).into());
    }
    Ok(FileStore::open(db, StoreConfig::new().create_if_missing(false))?)
}
