//! Op lookup table.

use crate::builtin::BUILTIN_OPS;
use crate::error::{OpError, OpResult};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A deterministic transition from the current root value and the op's
/// arguments to the next root value.
pub type OpFn = fn(&Value, &[Value]) -> OpResult<Value>;

/// Maps op names to their transition functions.
#[derive(Clone, Default)]
pub struct Registry {
    ops: BTreeMap<String, OpFn>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in op.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, op) in BUILTIN_OPS {
            registry.ops.insert((*name).to_string(), *op);
        }
        registry
    }

    /// Registers `op` under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::DuplicateOperation`] if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, op: OpFn) -> OpResult<()> {
        let name = name.into();
        if self.ops.contains_key(&name) {
            return Err(OpError::DuplicateOperation { name });
        }
        self.ops.insert(name, op);
        Ok(())
    }

    /// Looks up the op registered under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`OpError::UnknownOperation`] if nothing is registered.
    pub fn lookup(&self, name: &str) -> OpResult<OpFn> {
        self.ops
            .get(name)
            .copied()
            .ok_or_else(|| OpError::UnknownOperation {
                name: name.to_string(),
            })
    }

    /// Looks up `name` and applies it to `root` with `args`.
    pub fn apply(&self, name: &str, root: &Value, args: &[Value]) -> OpResult<Value> {
        let op = self.lookup(name)?;
        op(root, args)
    }

    /// Returns true if an op is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.ops.keys().map(String::as_str).collect()
    }

    /// Number of registered ops.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("ops", &self.names())
            .finish()
    }
}
