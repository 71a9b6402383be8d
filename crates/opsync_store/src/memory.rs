//! In-memory versioned store for testing.

use crate::commit::{Commit, CommitMeta};
use crate::error::{StoreError, StoreResult};
use crate::reference::Ref;
use crate::store::{collect_history, empty_root, VersionedStore};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
struct Tables {
    commits: HashMap<Ref, Commit>,
    branches: BTreeMap<String, Ref>,
}

/// An in-memory versioned store.
///
/// This store keeps every commit and branch pointer in memory and is
/// suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral replicas that don't need persistence
///
/// # Thread Safety
///
/// All tables sit behind one lock, so each call observes and mutates a
/// consistent snapshot.
///
/// # Example
///
/// ```rust
/// use opsync_store::{CommitMeta, InMemoryStore, VersionedStore};
/// use serde_json::json;
///
/// let store = InMemoryStore::new();
/// let meta = CommitMeta::new("append", vec![json!("hi")], "test");
/// let r = store.commit("local", &json!({"words": ["hi"]}), &meta).unwrap();
/// assert!(store.ref_exists(&r).unwrap());
/// assert_eq!(store.read_root_value("local").unwrap()["words"][0], "hi");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of commits held, across all branches.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.tables.read().commits.len()
    }

    /// Returns a copy of a stored commit.
    pub fn get_commit(&self, commit: &Ref) -> StoreResult<Commit> {
        self.tables
            .read()
            .commits
            .get(commit)
            .cloned()
            .ok_or(StoreError::RefNotFound(*commit))
    }
}

impl VersionedStore for InMemoryStore {
    fn head(&self, branch: &str) -> StoreResult<Option<Ref>> {
        Ok(self.tables.read().branches.get(branch).copied())
    }

    fn branch_history(&self, branch: &str) -> StoreResult<Vec<Ref>> {
        let tables = self.tables.read();
        collect_history(tables.branches.get(branch).copied(), |r| {
            tables
                .commits
                .get(r)
                .map(|c| c.parent)
                .ok_or(StoreError::RefNotFound(*r))
        })
    }

    fn commit(&self, branch: &str, value: &Value, meta: &CommitMeta) -> StoreResult<Ref> {
        let mut tables = self.tables.write();
        let parent = tables.branches.get(branch).copied();
        let commit = Commit::new(parent, value.clone(), meta.clone());
        let r = commit.compute_ref();
        tables.commits.entry(r).or_insert(commit);
        tables.branches.insert(branch.to_string(), r);
        Ok(r)
    }

    fn read_root_value(&self, branch: &str) -> StoreResult<Value> {
        let tables = self.tables.read();
        match tables.branches.get(branch) {
            Some(head) => tables
                .commits
                .get(head)
                .map(|c| c.value.clone())
                .ok_or(StoreError::RefNotFound(*head)),
            None => Ok(empty_root()),
        }
    }

    fn read_meta(&self, commit: &Ref) -> StoreResult<CommitMeta> {
        self.tables
            .read()
            .commits
            .get(commit)
            .map(|c| c.meta.clone())
            .ok_or(StoreError::RefNotFound(*commit))
    }

    fn ref_exists(&self, commit: &Ref) -> StoreResult<bool> {
        Ok(self.tables.read().commits.contains_key(commit))
    }

    fn sync_pointer(&self, src: &Ref, dst_branch: &str) -> StoreResult<()> {
        let mut tables = self.tables.write();
        if !tables.commits.contains_key(src) {
            return Err(StoreError::RefNotFound(*src));
        }
        tables.branches.insert(dst_branch.to_string(), *src);
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> StoreResult<()> {
        self.tables.write().branches.remove(branch);
        Ok(())
    }

    fn branches(&self) -> StoreResult<Vec<String>> {
        Ok(self.tables.read().branches.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn meta(name: &str, args: Vec<Value>) -> CommitMeta {
        CommitMeta::new(name, args, "test")
    }

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert_eq!(store.commit_count(), 0);
        assert!(store.branches().unwrap().is_empty());
        assert!(!store.branch_exists("local").unwrap());
    }

    #[test]
    fn absent_branch_reads_as_empty() {
        let store = InMemoryStore::new();
        assert!(store.branch_history("local").unwrap().is_empty());
        assert_eq!(store.read_root_value("local").unwrap(), json!({}));
    }

    #[test]
    fn commit_advances_branch() {
        let store = InMemoryStore::new();
        let c0 = store
            .commit("local", &json!({"color": "red"}), &meta("setColor", vec![json!("red")]))
            .unwrap();
        let c1 = store
            .commit("local", &json!({"color": "blue"}), &meta("setColor", vec![json!("blue")]))
            .unwrap();

        assert_eq!(store.branch_history("local").unwrap(), vec![c0, c1]);
        assert_eq!(store.head("local").unwrap(), Some(c1));
        assert_eq!(store.get_commit(&c1).unwrap().parent, Some(c0));
        assert_eq!(store.read_root_value("local").unwrap(), json!({"color": "blue"}));
        assert_eq!(store.read_meta(&c0).unwrap().args, vec![json!("red")]);
    }

    #[test]
    fn identical_commits_share_a_ref() {
        let store = InMemoryStore::new();
        let a = store
            .commit("a", &json!({"color": "red"}), &meta("setColor", vec![json!("red")]))
            .unwrap();
        let b = store
            .commit("b", &json!({"color": "red"}), &meta("setColor", vec![json!("red")]))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn sync_pointer_moves_head() {
        let store = InMemoryStore::new();
        let c0 = store
            .commit("local", &json!({"n": 1}), &meta("x", vec![]))
            .unwrap();
        store.sync_pointer(&c0, "remote").unwrap();
        assert_eq!(store.branch_history("remote").unwrap(), vec![c0]);
    }

    #[test]
    fn sync_pointer_unknown_ref_fails() {
        let store = InMemoryStore::new();
        let result = store.sync_pointer(&Ref::zero(), "remote");
        assert!(matches!(result, Err(StoreError::RefNotFound(_))));
        assert!(!store.branch_exists("remote").unwrap());
    }

    #[test]
    fn delete_branch_keeps_commits() {
        let store = InMemoryStore::new();
        let c0 = store
            .commit("tmp", &json!({}), &meta("x", vec![]))
            .unwrap();
        store.delete_branch("tmp").unwrap();
        store.delete_branch("tmp").unwrap();
        assert!(!store.branch_exists("tmp").unwrap());
        assert!(store.ref_exists(&c0).unwrap());
    }

    #[test]
    fn read_meta_unknown_ref_fails() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.read_meta(&Ref::zero()),
            Err(StoreError::RefNotFound(_))
        ));
    }
}
