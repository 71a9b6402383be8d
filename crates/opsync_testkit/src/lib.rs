//! # opsync Testkit
//!
//! Test utilities for opsync.
//!
//! This crate provides:
//! - Replica and server log fixtures
//! - A fault-injecting store wrapper
//! - Property-based generators for op scripts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use opsync_testkit::prelude::*;
//!
//! #[test]
//! fn two_replicas_converge() {
//!     let log = TestLog::new();
//!     let a = Replica::memory("a");
//!     let b = Replica::memory("b");
//!     a.apply("append", vec![json!("x")]);
//!     a.sync(&log);
//!     b.sync(&log);
//!     assert_eq!(a.local_value(), b.local_value());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
