//! Read-only store commands: get, log and ops.

use super::{open_existing, OutputFormat};
use opsync_ops::Registry;
use opsync_store::VersionedStore;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// A commit as printed by the log command.
#[derive(Debug, Serialize)]
pub struct CommitInfo {
    /// Position in the branch history, root first.
    pub index: usize,
    /// Commit ref, hex-encoded.
    pub commit: String,
    /// Replica that produced the commit.
    pub source: String,
    /// Op that produced the commit.
    pub op_name: String,
    /// Op arguments.
    pub args: Vec<Value>,
}

/// Runs the get command.
pub fn get(db: &Path, branch: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(db)?;
    let root = store.read_root_value(branch)?;
    println!("{}", serde_json::to_string_pretty(&root)?);
    Ok(())
}

/// Runs the log command.
pub fn log(db: &Path, branch: &str, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_existing(db)?;
    let commits = branch_commits(&store, branch)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&commits)?),
        OutputFormat::Text => {
            if commits.is_empty() {
                println!("Branch {} is empty", branch);
            }
            for info in &commits {
                println!(
                    "{:>4}  {}  {:<12} {}({})",
                    info.index,
                    &info.commit[..16],
                    info.source,
                    info.op_name,
                    render_args(&info.args)
                );
            }
        }
    }

    Ok(())
}

/// Runs the ops command.
pub fn ops() {
    for name in Registry::builtin().names() {
        println!("{}", name);
    }
}

/// Collects the history of `branch` with each commit's metadata.
pub fn branch_commits<S: VersionedStore>(
    store: &S,
    branch: &str,
) -> Result<Vec<CommitInfo>, Box<dyn std::error::Error>> {
    store
        .branch_history(branch)?
        .into_iter()
        .enumerate()
        .map(|(index, commit)| -> Result<CommitInfo, Box<dyn std::error::Error>> {
            let meta = store.read_meta(&commit)?;
            Ok(CommitInfo {
                index,
                commit: commit.to_hex(),
                source: meta.source,
                op_name: meta.op_name,
                args: meta.args,
            })
        })
        .collect()
}

/// Renders op arguments as a comma-separated list of JSON values.
pub fn render_args(args: &[Value]) -> String {
    args.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
