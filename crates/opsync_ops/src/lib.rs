//! # opsync Ops
//!
//! Registry of named, deterministic state transitions.
//!
//! Replication in opsync ships ops, not state: every commit records the op
//! name and arguments that produced it, and other replicas rebuild the
//! commit by looking the op up here and re-running it. An op must therefore
//! be a pure function of the root value and its arguments.
//!
//! The registry is a static table of compiled functions. There is no
//! dynamic loading of op code.
//!
//! ## Example
//!
//! ```rust
//! use opsync_ops::Registry;
//! use serde_json::json;
//!
//! let registry = Registry::builtin();
//! let next = registry.apply("setColor", &json!({}), &[json!("red")]).unwrap();
//! assert_eq!(next, json!({"color": "red"}));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builtin;
mod error;
mod registry;

pub use builtin::BUILTIN_OPS;
pub use error::{OpError, OpResult};
pub use registry::{OpFn, Registry};
