//! Dump-log command implementation.

use super::inspect::render_args;
use super::OutputFormat;
use opsync_sync_engine::{LogRecord, ServerLog};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Server log record representation for output.
#[derive(Debug, Serialize)]
pub struct LogRecordInfo {
    /// Position in the log.
    pub index: usize,
    /// Commit ref, hex-encoded.
    pub commit: String,
    /// Replica that produced the commit.
    pub source: String,
    /// Op name.
    pub op_name: String,
    /// Op arguments.
    pub args: Vec<Value>,
}

impl LogRecordInfo {
    fn new(index: usize, record: LogRecord) -> Self {
        Self {
            index,
            commit: record.commit.to_hex(),
            source: record.source,
            op_name: record.op_name,
            args: record.args,
        }
    }
}

/// Runs the dump-log command.
pub fn run(path: &Path, format: OutputFormat) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<LogRecordInfo> = ServerLog::new(path)
        .read()?
        .into_iter()
        .enumerate()
        .map(|(index, record)| LogRecordInfo::new(index, record))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&records)?),
        OutputFormat::Text => print_text_output(&records),
    }

    Ok(())
}

fn print_text_output(records: &[LogRecordInfo]) {
    println!("{:>6}  {:<16}  {:<12}  OPERATION", "INDEX", "COMMIT", "SOURCE");
    println!("{}", "-".repeat(60));

    for record in records {
        println!(
            "{:>6}  {:<16}  {:<12}  {}({})",
            record.index,
            &record.commit[..16],
            record.source,
            record.op_name,
            render_args(&record.args)
        );
    }

    println!();
    println!("Total: {} records", records.len());
}
