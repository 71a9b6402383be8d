//! Integration tests for the sync engine over real store and log files.

use opsync_ops::{OpError, Registry};
use opsync_store::{FileStore, InMemoryStore, StoreConfig, VersionedStore};
use opsync_sync_engine::{
    LogRecord, RebaseOutcome, ServerLog, SyncConfig, SyncEngine, SyncError,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn memory_engine(source: &str) -> SyncEngine<InMemoryStore> {
    SyncEngine::new(
        SyncConfig::new(source),
        InMemoryStore::new(),
        Registry::builtin(),
    )
}

fn file_engine(dir: &TempDir, name: &str) -> SyncEngine<FileStore> {
    let store = FileStore::open(&dir.path().join(name), StoreConfig::default()).unwrap();
    SyncEngine::new(SyncConfig::new(name), store, Registry::builtin())
}

fn server_log(dir: &TempDir) -> ServerLog {
    ServerLog::new(dir.path().join("server.log"))
}

#[test]
fn push_then_pull_tracks_local_head() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let engine = file_engine(&dir, "phone");

    let _c0 = engine.op("setColor", vec![json!("red")]).unwrap();
    let c1 = engine.op("setColor", vec![json!("blue")]).unwrap();
    engine.push(&log).unwrap();
    let pulled = engine.pull(&log).unwrap();

    let store = engine.store();
    assert_eq!(pulled.head, Some(c1));
    assert!(!pulled.rebuilt);
    assert_eq!(store.head("remote").unwrap(), Some(c1));
    assert_eq!(
        store.read_root_value("remote").unwrap(),
        json!({"color": "blue"})
    );
}

#[test]
fn repeated_push_leaves_log_byte_identical() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let engine = file_engine(&dir, "phone");

    engine.op("stockWidgets", vec![json!(3)]).unwrap();
    engine.op("sellWidget", vec![]).unwrap();
    engine.push(&log).unwrap();
    let first = fs::read(log.path()).unwrap();

    let again = engine.push(&log).unwrap();
    assert!(again.appended.is_empty());
    assert_eq!(again.fork_point, 2);
    assert_eq!(fs::read(log.path()).unwrap(), first);
}

#[test]
fn push_only_appends_the_missing_suffix() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let engine = file_engine(&dir, "phone");

    engine.op("append", vec![json!("one")]).unwrap();
    engine.push(&log).unwrap();
    let c1 = engine.op("append", vec![json!("two")]).unwrap();

    let outcome = engine.push(&log).unwrap();
    assert_eq!(outcome.fork_point, 1);
    assert_eq!(outcome.appended, vec![c1]);
    assert_eq!(log.read().unwrap().len(), 2);
}

#[test]
fn non_fast_forward_push_leaves_log_unchanged() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let laptop = file_engine(&dir, "laptop");
    let phone = file_engine(&dir, "phone");

    laptop.op("setColor", vec![json!("green")]).unwrap();
    laptop.push(&log).unwrap();
    let before = fs::read(log.path()).unwrap();

    phone.op("setColor", vec![json!("red")]).unwrap();
    let err = phone.push(&log).unwrap_err();
    match err {
        SyncError::NonFastForward {
            log_len,
            fork_point,
        } => {
            assert_eq!(log_len, 1);
            assert_eq!(fork_point, 0);
        }
        other => panic!("expected NonFastForward, got {other:?}"),
    }
    assert_eq!(fs::read(log.path()).unwrap(), before);
}

#[test]
fn rebase_is_fast_forward_when_local_extends_remote() {
    let engine = memory_engine("phone");
    let store = engine.store();

    let c0 = engine.op("append", vec![json!("a")]).unwrap();
    let c1 = engine.op("append", vec![json!("b")]).unwrap();
    let c2 = engine.op("append", vec![json!("c")]).unwrap();
    store.sync_pointer(&c1, "remote").unwrap();
    assert_eq!(store.branch_history("remote").unwrap(), vec![c0, c1]);

    let outcome = engine.rebase().unwrap();
    assert_eq!(outcome, RebaseOutcome::FastForward { head: Some(c2) });
    assert_eq!(store.head("local").unwrap(), Some(c2));
    assert!(!store.branch_exists("tmp").unwrap());
}

#[test]
fn diverged_rebase_replays_local_work_on_remote() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let laptop = file_engine(&dir, "laptop");
    let phone = file_engine(&dir, "phone");

    // Shared base c0.
    let c0 = laptop.op("setColor", vec![json!("red")]).unwrap();
    laptop.push(&log).unwrap();
    phone.pull(&log).unwrap();
    phone.rebase().unwrap();
    assert_eq!(phone.store().head("local").unwrap(), Some(c0));

    // Phone works offline while the laptop pushes r1.
    let c1 = phone.op("dog", vec![]).unwrap();
    let r1 = laptop.op("toggleColor", vec![]).unwrap();
    laptop.push(&log).unwrap();

    phone.pull(&log).unwrap();
    let outcome = phone.rebase().unwrap();
    let head = match outcome {
        RebaseOutcome::Rebased {
            fork_point,
            replayed,
            head,
        } => {
            assert_eq!(fork_point, 1);
            assert_eq!(replayed, 1);
            head
        }
        other => panic!("expected Rebased, got {other:?}"),
    };

    let store = phone.store();
    assert_ne!(head, c1);
    assert_eq!(store.branch_history("local").unwrap(), vec![c0, r1, head]);
    assert_eq!(
        store.read_root_value("local").unwrap(),
        json!({"color": "green", "command": "Go dog go, the light is green now!"})
    );
    let meta = store.read_meta(&head).unwrap();
    assert_eq!(meta.op_name, "dog");
    assert_eq!(meta.source, "phone");
    assert!(!store.branch_exists("tmp").unwrap());

    // The rebased history now fast-forwards the log.
    let pushed = phone.push(&log).unwrap();
    assert_eq!(pushed.appended, vec![head]);
}

#[test]
fn replay_is_deterministic_across_stores() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let writer = memory_engine("writer");

    writer.op("insert", vec![json!("pear")]).unwrap();
    writer.op("insert", vec![json!("apple")]).unwrap();
    writer.op("stockWidgets", vec![json!("12")]).unwrap();
    writer.op("append", vec![json!("hello world")]).unwrap();
    writer.push(&log).unwrap();

    let first = file_engine(&dir, "first");
    let second = memory_engine("second");
    let a = first.pull(&log).unwrap();
    let b = second.pull(&log).unwrap();

    assert_eq!(a.replayed, 4);
    assert_eq!(a.head, b.head);
    assert_eq!(
        first.store().branch_history("remote").unwrap(),
        writer.store().branch_history("local").unwrap()
    );
    assert_eq!(
        second.store().read_root_value("remote").unwrap(),
        json!({
            "sorted": ["apple", "pear"],
            "widgets": 12,
            "words": ["hello world"]
        })
    );
}

#[test]
fn divergent_remote_is_rebuilt_from_log() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let phone = file_engine(&dir, "phone");

    // Phone tracks a log that is later replaced wholesale.
    let stale = phone.op("setColor", vec![json!("red")]).unwrap();
    phone.push(&log).unwrap();
    phone.pull(&log).unwrap();
    assert_eq!(phone.store().head("remote").unwrap(), Some(stale));

    let other_dir = TempDir::new().unwrap();
    let other_log = server_log(&other_dir);
    let laptop = memory_engine("laptop");
    laptop.op("setColor", vec![json!("blue")]).unwrap();
    let fresh = laptop.op("append", vec![json!("x")]).unwrap();
    laptop.push(&other_log).unwrap();
    fs::copy(other_log.path(), log.path()).unwrap();
    let replaced = fs::read(log.path()).unwrap();

    let outcome = phone.pull(&log).unwrap();
    assert!(outcome.rebuilt);
    assert_eq!(outcome.fork_point, 0);
    assert_eq!(outcome.replayed, 2);
    assert_eq!(outcome.head, Some(fresh));
    assert_eq!(
        phone.store().branch_history("remote").unwrap(),
        laptop.store().branch_history("local").unwrap()
    );
    assert_eq!(fs::read(log.path()).unwrap(), replaced);
    assert_eq!(phone.stats().remote_rebuilds, 1);
}

#[test]
fn tampered_log_is_a_replay_mismatch() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let writer = memory_engine("writer");
    writer.op("setColor", vec![json!("red")]).unwrap();
    writer.op("setColor", vec![json!("blue")]).unwrap();
    writer.push(&log).unwrap();

    // Keep the recorded ref but change the argument of the second record.
    let mut records = log.read().unwrap();
    records[1].args = vec![json!("purple")];
    log.rewrite_from(0, &records).unwrap();

    let reader = memory_engine("reader");
    let err = reader.pull(&log).unwrap_err();
    assert!(err.is_correctness_fault());
    match err {
        SyncError::ReplayMismatch {
            index,
            op_name,
            expected,
            ..
        } => {
            assert_eq!(index, 1);
            assert_eq!(op_name, "setColor");
            assert_eq!(expected, records[1].commit);
        }
        other => panic!("expected ReplayMismatch, got {other:?}"),
    }

    // The remote branch is left at the last verified record.
    assert_eq!(
        reader.store().head("remote").unwrap(),
        Some(records[0].commit)
    );
}

#[test]
fn unknown_op_in_log_aborts_pull() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let record = LogRecord {
        commit: opsync_store::Ref::from_bytes([7u8; 32]),
        source: "mystery".into(),
        op_name: "launchRockets".into(),
        args: vec![json!(3)],
    };
    log.append(&[record]).unwrap();

    let engine = memory_engine("phone");
    let err = engine.pull(&log).unwrap_err();
    assert!(matches!(
        err,
        SyncError::Op(OpError::UnknownOperation { ref name }) if name == "launchRockets"
    ));
    assert!(!engine.store().branch_exists("remote").unwrap());
}

#[test]
fn identical_concurrent_ops_are_deduplicated() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let laptop = file_engine(&dir, "laptop");
    let phone = file_engine(&dir, "phone");

    // Same op, same args, same parent: the same commit on both replicas.
    let a = laptop.op("setColor", vec![json!("red")]).unwrap();
    let b = phone.op("setColor", vec![json!("red")]).unwrap();
    assert_eq!(a, b);

    laptop.push(&log).unwrap();
    let pulled = phone.pull(&log).unwrap();
    assert_eq!(pulled.synced, 1);
    assert_eq!(pulled.replayed, 0);
    assert_eq!(
        phone.rebase().unwrap(),
        RebaseOutcome::FastForward { head: Some(b) }
    );
    assert!(phone.push(&log).unwrap().appended.is_empty());
    assert_eq!(log.read().unwrap().len(), 1);
}

#[test]
fn malformed_log_line_is_reported() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    fs::write(log.path(), "not a record\n").unwrap();

    let engine = memory_engine("phone");
    engine.op("dog", vec![]).unwrap();
    assert!(matches!(
        engine.push(&log),
        Err(SyncError::MalformedLog { line: 1, .. })
    ));
    assert!(matches!(
        engine.pull(&log),
        Err(SyncError::MalformedLog { line: 1, .. })
    ));
}

#[test]
fn replicas_converge_after_sync() {
    let dir = TempDir::new().unwrap();
    let log = server_log(&dir);
    let laptop = file_engine(&dir, "laptop");
    let phone = file_engine(&dir, "phone");

    laptop.op("stockWidgets", vec![json!(10)]).unwrap();
    laptop.sync(&log).unwrap();
    phone.sync(&log).unwrap();

    laptop.op("stockWidgets", vec![json!(1)]).unwrap();
    phone.op("sellWidget", vec![]).unwrap();
    phone.op("sellWidget", vec![]).unwrap();

    laptop.sync(&log).unwrap();
    phone.sync(&log).unwrap();
    laptop.sync(&log).unwrap();

    let expected = json!({"widgets": 9});
    assert_eq!(laptop.store().read_root_value("local").unwrap(), expected);
    assert_eq!(phone.store().read_root_value("local").unwrap(), expected);
    assert_eq!(
        laptop.store().branch_history("local").unwrap(),
        phone.store().branch_history("local").unwrap()
    );
    assert_eq!(log.read().unwrap().len(), 4);
}
