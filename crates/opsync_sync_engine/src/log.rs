//! The server log: an append-only record of shared commits.
//!
//! One record per line, fields separated by single spaces:
//!
//! ```text
//! <ref> <source> <op_name> <args as a compact JSON array>
//! ```
//!
//! The args column runs to the end of the line. An absent file is an empty
//! log and is created on first append.

use crate::error::{SyncError, SyncResult};
use opsync_store::{CommitMeta, Ref};
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A commit accepted onto the shared branch.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Ref of the commit.
    pub commit: Ref,
    /// Replica that produced it.
    pub source: String,
    /// Op that produced it.
    pub op_name: String,
    /// Op arguments.
    pub args: Vec<Value>,
}

impl LogRecord {
    /// Creates a record for `commit` from its metadata.
    pub fn from_meta(commit: Ref, meta: CommitMeta) -> Self {
        Self {
            commit,
            source: meta.source,
            op_name: meta.op_name,
            args: meta.args,
        }
    }

    /// The commit metadata this record describes.
    pub fn meta(&self) -> CommitMeta {
        CommitMeta::new(self.op_name.clone(), self.args.clone(), self.source.clone())
    }

    /// Renders the record as one log line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRecord`] if `source` or `op_name` is
    /// empty or contains whitespace.
    pub fn to_line(&self) -> SyncResult<String> {
        check_field("source", &self.source)?;
        check_field("op name", &self.op_name)?;
        let args = serde_json::to_string(&self.args)
            .map_err(|e| SyncError::InvalidRecord(e.to_string()))?;
        Ok(format!(
            "{} {} {} {}",
            self.commit, self.source, self.op_name, args
        ))
    }

    /// Parses one log line. `line_no` is 1-based and only used for errors.
    pub fn parse_line(line: &str, line_no: usize) -> SyncResult<Self> {
        let malformed = |reason: String| SyncError::MalformedLog {
            line: line_no,
            reason,
        };

        let mut fields = line.splitn(4, ' ');
        let (commit, source, op_name, args) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(c), Some(s), Some(o), Some(a)) => (c, s, o, a),
                _ => return Err(malformed("expected `ref source op args`".into())),
            };

        let commit = Ref::from_hex(commit).ok_or_else(|| malformed(format!("bad ref {:?}", commit)))?;
        if source.is_empty() || op_name.is_empty() {
            return Err(malformed("empty source or op name".into()));
        }
        let args: Vec<Value> = serde_json::from_str(args)
            .map_err(|e| malformed(format!("args are not a JSON array: {}", e)))?;

        Ok(Self {
            commit,
            source: source.to_string(),
            op_name: op_name.to_string(),
            args,
        })
    }
}

fn check_field(what: &str, value: &str) -> SyncResult<()> {
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(SyncError::InvalidRecord(format!(
            "{} must be non-empty and contain no whitespace: {:?}",
            what, value
        )));
    }
    Ok(())
}

/// Handle to a server log file.
#[derive(Debug, Clone)]
pub struct ServerLog {
    path: PathBuf,
}

impl ServerLog {
    /// Creates a handle for the log at `path`. The file need not exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the log file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record in order.
    ///
    /// A missing file reads as an empty log. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MalformedLog`] for the first line that does not
    /// parse.
    pub fn read(&self) -> SyncResult<Vec<LogRecord>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| LogRecord::parse_line(line.trim_end_matches('\r'), i + 1))
            .collect()
    }

    /// Appends `records` in order, one line each, creating the file if
    /// needed.
    ///
    /// All records are validated before anything is written, and the lines
    /// go out in a single write. Existing content is never touched.
    pub fn append(&self, records: &[LogRecord]) -> SyncResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&record.to_line()?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;

        if ends_without_newline(&mut file)? {
            buf.insert(0, '\n');
        }

        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        Ok(())
    }

    /// Keeps the first `keep` records, drops everything after them and
    /// appends `records`.
    ///
    /// This is the only operation that removes content from the log.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidRecord`] if the log holds fewer than
    /// `keep` records.
    pub fn rewrite_from(&self, keep: usize, records: &[LogRecord]) -> SyncResult<()> {
        for record in records {
            record.to_line()?;
        }

        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let mut offset = 0usize;
        let mut kept = 0usize;
        for line in text.split_inclusive('\n') {
            if kept == keep {
                break;
            }
            offset += line.len();
            if !line.trim().is_empty() {
                kept += 1;
            }
        }

        if kept < keep {
            return Err(SyncError::InvalidRecord(format!(
                "cannot keep {} record(s), the log holds {}",
                keep, kept
            )));
        }

        if offset < text.len() {
            let file = OpenOptions::new().write(true).open(&self.path)?;
            file.set_len(offset as u64)?;
            file.sync_all()?;
        }

        self.append(records)
    }
}

fn ends_without_newline(file: &mut File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
