//! End-to-end tests for the opsync binary.

use serde_json::{json, Value};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn opsync(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_opsync"))
        .args(args)
        .output()
        .expect("failed to run opsync")
}

fn path(p: &Path) -> &str {
    p.to_str().expect("temp path is not UTF-8")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn op_then_get_prints_root() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("phone");

    let out = opsync(&["op", path(&db), "setColor", "red"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim().len(), 64);

    let out = opsync(&["op", path(&db), "stockWidgets", "--json-args", "3"]);
    assert!(out.status.success());

    let out = opsync(&["get", path(&db)]);
    assert!(out.status.success());
    let root: Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(root, json!({"color": "red", "widgets": 3}));
}

#[test]
fn two_replicas_share_work_through_the_log() {
    let dir = TempDir::new().unwrap();
    let laptop = dir.path().join("laptop");
    let phone = dir.path().join("phone");
    let log = dir.path().join("server.log");

    assert!(opsync(&["--source", "laptop", "op", path(&laptop), "append", "one"]).status.success());
    assert!(opsync(&["sync", path(&laptop), path(&log)]).status.success());
    assert!(opsync(&["--source", "phone", "op", path(&phone), "append", "two"]).status.success());
    assert!(opsync(&["sync", path(&phone), path(&log)]).status.success());
    assert!(opsync(&["sync", path(&laptop), path(&log)]).status.success());

    for db in [&laptop, &phone] {
        let out = opsync(&["get", path(db)]);
        let root: Value = serde_json::from_str(&stdout(&out)).unwrap();
        assert_eq!(root, json!({"words": ["one", "two"]}));
    }

    let out = opsync(&["dump-log", path(&log), "--format", "json"]);
    assert!(out.status.success());
    let records: Value = serde_json::from_str(&stdout(&out)).unwrap();
    let sources: Vec<&str> = records
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["source"].as_str().unwrap())
        .collect();
    assert_eq!(sources, vec!["laptop", "phone"]);
}

#[test]
fn rejected_push_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let log = dir.path().join("server.log");

    assert!(opsync(&["op", path(&a), "setColor", "red"]).status.success());
    assert!(opsync(&["push", path(&a), path(&log)]).status.success());
    assert!(opsync(&["op", path(&b), "setColor", "blue"]).status.success());

    let out = opsync(&["push", path(&b), path(&log)]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error: "));
    assert!(stderr.contains("pull first"));
}

#[test]
fn unknown_op_exits_with_error() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("db");

    let out = opsync(&["op", path(&db), "launchRockets"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("launchRockets"));
}

#[test]
fn ops_lists_builtins() {
    let out = opsync(&["ops"]);
    assert!(out.status.success());
    let names: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert!(names.contains(&"setColor".to_string()));
    assert!(names.contains(&"insert".to_string()));
}
