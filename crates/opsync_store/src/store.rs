//! Versioned store trait definition.

use crate::commit::CommitMeta;
use crate::error::StoreResult;
use crate::reference::Ref;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A versioned, content-addressed commit store with named branches.
///
/// This is the entire surface the sync engine requires. Branches are
/// created implicitly by the first `commit` or `sync_pointer` that targets
/// them.
///
/// # Invariants
///
/// - `commit` and `sync_pointer` move a branch head atomically
/// - committing the same `(parent, value, op_name, args)` yields the same ref
/// - `branch_history` is ordered oldest first
/// - Implementations must be `Send + Sync`
///
/// # Implementors
///
/// - [`crate::InMemoryStore`] - For testing
/// - [`crate::FileStore`] - For persistent replicas
pub trait VersionedStore: Send + Sync {
    /// Returns the head ref of `branch`, or `None` if it does not exist.
    fn head(&self, branch: &str) -> StoreResult<Option<Ref>>;

    /// Returns true if `branch` exists.
    fn branch_exists(&self, branch: &str) -> StoreResult<bool> {
        Ok(self.head(branch)?.is_some())
    }

    /// Returns the refs of `branch` from root to head.
    ///
    /// An absent branch has an empty history.
    fn branch_history(&self, branch: &str) -> StoreResult<Vec<Ref>>;

    /// Commits `value` onto `branch` with `meta`, returning the new ref.
    ///
    /// The new commit's parent is the branch's prior head.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit cannot be written or the branch
    /// pointer cannot be moved.
    fn commit(&self, branch: &str, value: &Value, meta: &CommitMeta) -> StoreResult<Ref>;

    /// Returns the root value at the head of `branch`, or `{}` if absent.
    fn read_root_value(&self, branch: &str) -> StoreResult<Value>;

    /// Returns the op metadata of a commit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::RefNotFound`] if the commit is unknown.
    fn read_meta(&self, commit: &Ref) -> StoreResult<CommitMeta>;

    /// Returns true if the commit exists in the store.
    fn ref_exists(&self, commit: &Ref) -> StoreResult<bool>;

    /// Moves the head of `dst_branch` to `src`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StoreError::RefNotFound`] if `src` is unknown.
    fn sync_pointer(&self, src: &Ref, dst_branch: &str) -> StoreResult<()>;

    /// Deletes `branch`. Deleting an absent branch is a no-op.
    fn delete_branch(&self, branch: &str) -> StoreResult<()>;

    /// Returns all branch names in sorted order.
    fn branches(&self) -> StoreResult<Vec<String>>;
}

impl<S: VersionedStore + ?Sized> VersionedStore for Arc<S> {
    fn head(&self, branch: &str) -> StoreResult<Option<Ref>> {
        (**self).head(branch)
    }

    fn branch_exists(&self, branch: &str) -> StoreResult<bool> {
        (**self).branch_exists(branch)
    }

    fn branch_history(&self, branch: &str) -> StoreResult<Vec<Ref>> {
        (**self).branch_history(branch)
    }

    fn commit(&self, branch: &str, value: &Value, meta: &CommitMeta) -> StoreResult<Ref> {
        (**self).commit(branch, value, meta)
    }

    fn read_root_value(&self, branch: &str) -> StoreResult<Value> {
        (**self).read_root_value(branch)
    }

    fn read_meta(&self, commit: &Ref) -> StoreResult<CommitMeta> {
        (**self).read_meta(commit)
    }

    fn ref_exists(&self, commit: &Ref) -> StoreResult<bool> {
        (**self).ref_exists(commit)
    }

    fn sync_pointer(&self, src: &Ref, dst_branch: &str) -> StoreResult<()> {
        (**self).sync_pointer(src, dst_branch)
    }

    fn delete_branch(&self, branch: &str) -> StoreResult<()> {
        (**self).delete_branch(branch)
    }

    fn branches(&self) -> StoreResult<Vec<String>> {
        (**self).branches()
    }
}

/// Root value of a branch that does not exist yet.
pub(crate) fn empty_root() -> Value {
    Value::Object(Map::new())
}

/// Walks parent links back from `head` and returns the chain oldest first.
pub(crate) fn collect_history<F>(head: Option<Ref>, mut parent_of: F) -> StoreResult<Vec<Ref>>
where
    F: FnMut(&Ref) -> StoreResult<Option<Ref>>,
{
    let mut history = Vec::new();
    let mut cursor = head;
    while let Some(current) = cursor {
        cursor = parent_of(&current)?;
        history.push(current);
    }
    history.reverse();
    Ok(history)
}
