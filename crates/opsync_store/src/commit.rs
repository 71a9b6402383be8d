//! Commits and the op metadata they carry.

use crate::reference::Ref;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Domain tag mixed into every commit digest.
const COMMIT_DIGEST_TAG: &[u8] = b"opsync.commit.v1";

/// Describes the op that produced a commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitMeta {
    /// Name of the op in the registry.
    pub op_name: String,
    /// Arguments the op was invoked with, in order.
    pub args: Vec<Value>,
    /// Replica or branch that originally produced the commit.
    pub source: String,
}

impl CommitMeta {
    /// Creates commit metadata.
    pub fn new(op_name: impl Into<String>, args: Vec<Value>, source: impl Into<String>) -> Self {
        Self {
            op_name: op_name.into(),
            args,
            source: source.into(),
        }
    }
}

/// An immutable commit node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Parent commit, absent for the first commit of a chain.
    pub parent: Option<Ref>,
    /// Root value after the op was applied.
    pub value: Value,
    /// Op metadata.
    pub meta: CommitMeta,
}

impl Commit {
    /// Creates a commit.
    pub fn new(parent: Option<Ref>, value: Value, meta: CommitMeta) -> Self {
        Self {
            parent,
            value,
            meta,
        }
    }

    /// Computes the content-derived ref of this commit.
    ///
    /// The digest covers the parent, the root value, the op name and the
    /// args. `meta.source` is excluded: replicas replaying the same op on
    /// the same parent must land on the same ref regardless of who
    /// originally produced it.
    ///
    /// Map keys are hashed in serde_json's default sorted order, so the
    /// `preserve_order` feature must stay disabled for refs to be stable.
    pub fn compute_ref(&self) -> Ref {
        let mut hasher = Sha256::new();
        hasher.update(COMMIT_DIGEST_TAG);

        match &self.parent {
            Some(parent) => {
                hasher.update([1u8]);
                hasher.update(parent.as_bytes());
            }
            None => hasher.update([0u8]),
        }

        update_field(&mut hasher, self.value.to_string().as_bytes());
        update_field(&mut hasher, self.meta.op_name.as_bytes());
        hasher.update((self.meta.args.len() as u64).to_le_bytes());
        for arg in &self.meta.args {
            update_field(&mut hasher, arg.to_string().as_bytes());
        }

        Ref::from_bytes(hasher.finalize().into())
    }
}

/// Length-prefixes a field so adjacent fields cannot alias.
fn update_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
