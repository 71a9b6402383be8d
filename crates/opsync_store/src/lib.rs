//! # opsync Store
//!
//! Versioned, content-addressed commit store for opsync.
//!
//! The sync engine never talks to a concrete store. It consumes the narrow
//! [`VersionedStore`] trait: branch histories, commits carrying op metadata,
//! ref lookups and atomic branch-pointer moves. Any store offering those
//! operations can be substituted.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For tests and ephemeral replicas
//! - [`FileStore`] - Directory-backed store with an exclusive advisory lock
//!
//! ## Example
//!
//! ```rust
//! use opsync_store::{CommitMeta, InMemoryStore, VersionedStore};
//! use serde_json::json;
//!
//! let store = InMemoryStore::new();
//! let meta = CommitMeta::new("setColor", vec![json!("red")], "client-a");
//! let r = store.commit("local", &json!({"color": "red"}), &meta).unwrap();
//! assert_eq!(store.branch_history("local").unwrap(), vec![r]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod commit;
mod config;
mod error;
mod file;
mod memory;
mod reference;
mod store;

pub use commit::{Commit, CommitMeta};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use reference::Ref;
pub use store::VersionedStore;
