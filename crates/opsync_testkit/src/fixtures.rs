//! Test fixtures: replicas, server logs and fault injection.
//!
//! Fixtures panic on unexpected failures so tests can stay focused on the
//! behaviour under test.

use opsync_ops::Registry;
use opsync_store::{
    CommitMeta, FileStore, InMemoryStore, Ref, StoreConfig, StoreError, StoreResult,
    VersionedStore,
};
use opsync_sync_engine::{LogRecord, ServerLog, SyncConfig, SyncCycleResult, SyncEngine};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A server log in a temporary directory.
pub struct TestLog {
    log: ServerLog,
    _temp_dir: TempDir,
}

impl TestLog {
    /// Creates an empty log. The file does not exist until the first push.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let log = ServerLog::new(temp_dir.path().join("server.log"));
        Self {
            log,
            _temp_dir: temp_dir,
        }
    }

    /// Reads every record.
    pub fn records(&self) -> Vec<LogRecord> {
        self.log.read().expect("Failed to read server log")
    }

    /// Returns the refs of every record, in order.
    pub fn refs(&self) -> Vec<Ref> {
        self.records().iter().map(|r| r.commit).collect()
    }

    /// Returns the raw file content, or nothing if the file is absent.
    pub fn bytes(&self) -> Vec<u8> {
        std::fs::read(self.log.path()).unwrap_or_default()
    }
}

impl Default for TestLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestLog {
    type Target = ServerLog;

    fn deref(&self) -> &Self::Target {
        &self.log
    }
}

/// A replica: a sync engine over its own store.
pub struct Replica<S: VersionedStore> {
    /// The engine.
    pub engine: SyncEngine<S>,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl Replica<InMemoryStore> {
    /// Creates a replica over an in-memory store.
    pub fn memory(source: &str) -> Self {
        Self::with_store(source, InMemoryStore::new())
    }
}

impl Replica<FileStore> {
    /// Creates a replica over a file store in a temporary directory.
    pub fn file(source: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(&temp_dir.path().join(source), StoreConfig::default())
            .expect("Failed to open file store");
        Self {
            engine: engine(source, store),
            _temp_dir: Some(temp_dir),
        }
    }
}

impl Replica<FlakyStore<InMemoryStore>> {
    /// Creates a replica whose store can be told to fail.
    pub fn flaky(source: &str) -> Self {
        Self::with_store(source, FlakyStore::new(InMemoryStore::new()))
    }
}

impl<S: VersionedStore> Replica<S> {
    /// Creates a replica over `store` with the built-in ops.
    pub fn with_store(source: &str, store: S) -> Self {
        Self {
            engine: engine(source, store),
            _temp_dir: None,
        }
    }

    /// Applies an op locally.
    pub fn apply(&self, name: &str, args: Vec<Value>) -> Ref {
        self.engine
            .op(name, args)
            .unwrap_or_else(|e| panic!("op {} failed: {}", name, e))
    }

    /// Runs a full pull, rebase, push cycle.
    pub fn sync(&self, log: &ServerLog) -> SyncCycleResult {
        self.engine
            .sync(log)
            .unwrap_or_else(|e| panic!("sync of {} failed: {}", self.engine.config().source, e))
    }

    /// Root value of the local branch.
    pub fn local_value(&self) -> Value {
        self.branch_value(&self.engine.config().local_branch)
    }

    /// History of the local branch.
    pub fn local_history(&self) -> Vec<Ref> {
        self.branch_history(&self.engine.config().local_branch)
    }

    /// History of the remote-tracking branch.
    pub fn remote_history(&self) -> Vec<Ref> {
        self.branch_history(&self.engine.config().remote_branch)
    }

    fn branch_value(&self, branch: &str) -> Value {
        self.engine
            .store()
            .read_root_value(branch)
            .expect("Failed to read root value")
    }

    fn branch_history(&self, branch: &str) -> Vec<Ref> {
        self.engine
            .store()
            .branch_history(branch)
            .expect("Failed to read branch history")
    }
}

impl<S: VersionedStore> std::ops::Deref for Replica<S> {
    type Target = SyncEngine<S>;

    fn deref(&self) -> &Self::Target {
        &self.engine
    }
}

fn engine<S: VersionedStore>(source: &str, store: S) -> SyncEngine<S> {
    SyncEngine::new(SyncConfig::new(source), store, Registry::builtin())
}

/// Wraps a store and fails writes once a budget is spent.
///
/// `commit` and `sync_pointer` each consume one unit of budget; when none
/// is left they return [`StoreError::Unavailable`] without touching the
/// inner store. Reads and `delete_branch` always pass through.
pub struct FlakyStore<S> {
    inner: S,
    budget: AtomicUsize,
    injected: AtomicUsize,
}

impl<S: VersionedStore> FlakyStore<S> {
    /// Wraps `inner` with an unlimited budget.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            budget: AtomicUsize::new(usize::MAX),
            injected: AtomicUsize::new(0),
        }
    }

    /// Allows `writes` more writes before failing.
    pub fn fail_after(&self, writes: usize) {
        self.budget.store(writes, Ordering::SeqCst);
    }

    /// Removes the write limit.
    pub fn heal(&self) {
        self.budget.store(usize::MAX, Ordering::SeqCst);
    }

    /// Number of writes that were refused.
    pub fn injected_failures(&self) -> usize {
        self.injected.load(Ordering::SeqCst)
    }

    /// Returns the wrapped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn spend(&self, what: &str) -> StoreResult<()> {
        let spent = self
            .budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1));
        if spent.is_err() {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(StoreError::Unavailable(format!("injected {} failure", what)));
        }
        Ok(())
    }
}

impl<S: VersionedStore> VersionedStore for FlakyStore<S> {
    fn head(&self, branch: &str) -> StoreResult<Option<Ref>> {
        self.inner.head(branch)
    }

    fn branch_history(&self, branch: &str) -> StoreResult<Vec<Ref>> {
        self.inner.branch_history(branch)
    }

    fn commit(&self, branch: &str, value: &Value, meta: &CommitMeta) -> StoreResult<Ref> {
        self.spend("commit")?;
        self.inner.commit(branch, value, meta)
    }

    fn read_root_value(&self, branch: &str) -> StoreResult<Value> {
        self.inner.read_root_value(branch)
    }

    fn read_meta(&self, commit: &Ref) -> StoreResult<CommitMeta> {
        self.inner.read_meta(commit)
    }

    fn ref_exists(&self, commit: &Ref) -> StoreResult<bool> {
        self.inner.ref_exists(commit)
    }

    fn sync_pointer(&self, src: &Ref, dst_branch: &str) -> StoreResult<()> {
        self.spend("sync_pointer")?;
        self.inner.sync_pointer(src, dst_branch)
    }

    fn delete_branch(&self, branch: &str) -> StoreResult<()> {
        self.inner.delete_branch(branch)
    }

    fn branches(&self) -> StoreResult<Vec<String>> {
        self.inner.branches()
    }
}
