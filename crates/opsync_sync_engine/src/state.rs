//! Sync engine: local ops, push, pull and rebase.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::fork::{fork_point, relation};
use crate::log::{LogRecord, ServerLog};
use opsync_ops::Registry;
use opsync_store::{CommitMeta, Ref, VersionedStore};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// What the engine is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle.
    Idle,
    /// Engine is committing a local op.
    Committing,
    /// Engine is appending local commits to the server log.
    Pushing,
    /// Engine is replaying the server log onto the remote-tracking branch.
    Pulling,
    /// Engine is replaying local commits on top of the remote branch.
    Rebasing,
}

impl SyncState {
    /// Returns true if an operation is in progress.
    pub fn is_active(&self) -> bool {
        !matches!(self, SyncState::Idle)
    }
}

/// Counters accumulated over the engine's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Local ops committed.
    pub ops_committed: u64,
    /// Records appended to the server log.
    pub records_pushed: u64,
    /// Log records fast-forwarded onto the remote branch by pointer.
    pub records_synced: u64,
    /// Log records rebuilt by replaying their op.
    pub records_replayed: u64,
    /// Rebases that replayed local work.
    pub rebases: u64,
    /// Times the remote-tracking branch was rebuilt from scratch.
    pub remote_rebuilds: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a push.
#[derive(Debug, Clone, PartialEq)]
pub struct PushOutcome {
    /// Where local history and the log first differed.
    pub fork_point: usize,
    /// Refs appended to the log, in order.
    pub appended: Vec<Ref>,
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq)]
pub struct PullOutcome {
    /// Where the remote branch and the log first differed.
    pub fork_point: usize,
    /// Records applied by moving the branch pointer to an existing commit.
    pub synced: usize,
    /// Records applied by re-executing their op.
    pub replayed: usize,
    /// True if the remote branch had diverged and was rebuilt from the log.
    pub rebuilt: bool,
    /// Remote-tracking head after the pull.
    pub head: Option<Ref>,
}

/// Result of a rebase.
#[derive(Debug, Clone, PartialEq)]
pub enum RebaseOutcome {
    /// Local already contains the remote branch; nothing was done.
    FastForward {
        /// Unchanged local head.
        head: Option<Ref>,
    },
    /// Local-only commits were replayed on top of the remote branch.
    Rebased {
        /// Where local and remote first differed.
        fork_point: usize,
        /// Number of local commits replayed.
        replayed: usize,
        /// New local head.
        head: Ref,
    },
}

/// Result of a full sync cycle.
#[derive(Debug, Clone)]
pub struct SyncCycleResult {
    /// Pull phase.
    pub pull: PullOutcome,
    /// Rebase phase.
    pub rebase: RebaseOutcome,
    /// Push phase.
    pub push: PushOutcome,
    /// Duration of the cycle.
    pub duration: Duration,
}

/// Resets the engine to idle when an operation finishes, however it ends.
struct ActiveGuard<'a> {
    state: &'a RwLock<SyncState>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.state.write() = SyncState::Idle;
    }
}

/// Replicates a store's branches through a shared server log.
///
/// Every public operation is a sequential workflow: histories and the log
/// are re-read at each decision point and nothing is cached between calls.
/// Operations on one engine do not overlap; starting one while another is
/// in progress fails with [`SyncError::Busy`].
pub struct SyncEngine<S: VersionedStore> {
    config: SyncConfig,
    store: Arc<S>,
    registry: Registry,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
}

impl<S: VersionedStore> SyncEngine<S> {
    /// Creates a new sync engine.
    pub fn new(config: SyncConfig, store: S, registry: Registry) -> Self {
        Self {
            config,
            store: Arc::new(store),
            registry,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Gets the op registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Applies op `name` to the local branch and commits the result.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Op`] if the op is unknown or rejects its
    /// arguments; nothing is committed in that case.
    pub fn op(&self, name: &str, args: Vec<Value>) -> SyncResult<Ref> {
        let _active = self.begin(SyncState::Committing)?;
        let result = self.commit_local_op(name, args);
        self.finish(result)
    }

    /// Appends local commits the server log has not recorded yet.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NonFastForward`] without touching the log if
    /// the log holds records local history does not contain.
    pub fn push(&self, log: &ServerLog) -> SyncResult<PushOutcome> {
        let _active = self.begin(SyncState::Pushing)?;
        let result = self.push_records(log);
        self.finish(result)
    }

    /// Brings the remote-tracking branch up to date with the server log.
    ///
    /// If the branch is not a prefix of the log it is deleted and rebuilt
    /// by replaying the whole log; this is reported in
    /// [`PullOutcome::rebuilt`] rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ReplayMismatch`] if replaying a record yields a
    /// different ref than the log recorded.
    pub fn pull(&self, log: &ServerLog) -> SyncResult<PullOutcome> {
        let _active = self.begin(SyncState::Pulling)?;
        let result = self.pull_records(log);
        self.finish(result)
    }

    /// Moves local-only work on top of the remote-tracking branch.
    ///
    /// Replay happens on the scratch branch; `local` is only moved once
    /// every commit has replayed, so a failure leaves it untouched.
    pub fn rebase(&self) -> SyncResult<RebaseOutcome> {
        let _active = self.begin(SyncState::Rebasing)?;
        let result = self.rebase_local();
        self.finish(result)
    }

    /// Performs a full cycle: pull, rebase, then push.
    pub fn sync(&self, log: &ServerLog) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();
        let _active = self.begin(SyncState::Pulling)?;

        let result = self.pull_records(log).and_then(|pull| {
            self.set_state(SyncState::Rebasing);
            let rebase = self.rebase_local()?;
            self.set_state(SyncState::Pushing);
            let push = self.push_records(log)?;
            Ok(SyncCycleResult {
                pull,
                rebase,
                push,
                duration: start.elapsed(),
            })
        });

        self.finish(result)
    }

    fn begin(&self, next: SyncState) -> SyncResult<ActiveGuard<'_>> {
        let mut state = self.state.write();
        if state.is_active() {
            return Err(SyncError::Busy {
                active: format!("{:?}", *state),
                requested: format!("{:?}", next),
            });
        }
        *state = next;
        Ok(ActiveGuard { state: &self.state })
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    fn finish<T>(&self, result: SyncResult<T>) -> SyncResult<T> {
        if let Err(e) = &result {
            self.stats.write().last_error = Some(e.to_string());
        }
        result
    }

    fn trace_record(&self, action: &str, index: usize, commit: &Ref, op_name: &str) {
        if self.config.verbose {
            info!("{} [{}] {} {}", action, index, commit.short(), op_name);
        } else {
            debug!("{} [{}] {} {}", action, index, commit.short(), op_name);
        }
    }

    fn commit_local_op(&self, name: &str, args: Vec<Value>) -> SyncResult<Ref> {
        let op = self.registry.lookup(name)?;
        let branch = &self.config.local_branch;

        let root = self.store.read_root_value(branch)?;
        let next = op(&root, &args)?;
        let meta = CommitMeta::new(name, args, self.config.source.clone());
        let commit = self.store.commit(branch, &next, &meta)?;

        self.stats.write().ops_committed += 1;
        debug!("committed {} on {} as {}", name, branch, commit.short());
        Ok(commit)
    }

    fn push_records(&self, log: &ServerLog) -> SyncResult<PushOutcome> {
        let local = self.store.branch_history(&self.config.local_branch)?;
        let log_refs: Vec<Ref> = log.read()?.iter().map(|r| r.commit).collect();

        let fp = fork_point(&log_refs, &local);
        if fp < log_refs.len() {
            return Err(SyncError::NonFastForward {
                log_len: log_refs.len(),
                fork_point: fp,
            });
        }

        let mut pending = Vec::with_capacity(local.len() - fp);
        for (index, commit) in local.iter().enumerate().skip(fp) {
            let meta = self.store.read_meta(commit)?;
            self.trace_record("push", index, commit, &meta.op_name);
            pending.push(LogRecord::from_meta(*commit, meta));
        }

        log.append(&pending)?;

        self.stats.write().records_pushed += pending.len() as u64;
        info!(
            "pushed {} record(s) to {}",
            pending.len(),
            log.path().display()
        );
        Ok(PushOutcome {
            fork_point: fp,
            appended: local[fp..].to_vec(),
        })
    }

    fn pull_records(&self, log: &ServerLog) -> SyncResult<PullOutcome> {
        let branch = &self.config.remote_branch;
        let remote = self.store.branch_history(branch)?;
        let records = log.read()?;
        let log_refs: Vec<Ref> = records.iter().map(|r| r.commit).collect();

        let fp = fork_point(&remote, &log_refs);
        let rebuilt = fp != remote.len();

        let (synced, replayed) = if rebuilt {
            let anomaly = SyncError::DivergentRemote {
                fork_point: fp,
                remote_len: remote.len(),
            };
            warn!("{}; rebuilding it from the server log", anomaly);

            self.store.delete_branch(branch)?;
            let counts = self.apply_records(&records, 0)?;

            // Every record has now been verified against the rebuilt branch.
            log.rewrite_from(fp, &records[fp..])?;
            self.stats.write().remote_rebuilds += 1;
            counts
        } else {
            self.apply_records(&records, fp)?
        };

        let head = self.store.head(branch)?;
        info!(
            "pulled {} record(s) from {} ({} synced, {} replayed)",
            synced + replayed,
            log.path().display(),
            synced,
            replayed
        );
        Ok(PullOutcome {
            fork_point: fp,
            synced,
            replayed,
            rebuilt,
            head,
        })
    }

    /// Applies `records[start..]` to the remote-tracking branch.
    fn apply_records(&self, records: &[LogRecord], start: usize) -> SyncResult<(usize, usize)> {
        let branch = &self.config.remote_branch;
        let mut synced = 0;
        let mut replayed = 0;

        for (index, record) in records.iter().enumerate().skip(start) {
            if self.store.ref_exists(&record.commit)? {
                self.trace_record("sync", index, &record.commit, &record.op_name);
                self.store.sync_pointer(&record.commit, branch)?;
                synced += 1;
                self.stats.write().records_synced += 1;
                continue;
            }

            self.trace_record("replay", index, &record.commit, &record.op_name);
            let previous = self.store.head(branch)?;
            let root = self.store.read_root_value(branch)?;
            let next = self.registry.apply(&record.op_name, &root, &record.args)?;
            let actual = self.store.commit(branch, &next, &record.meta())?;

            if actual != record.commit {
                match previous {
                    Some(head) => self.store.sync_pointer(&head, branch)?,
                    None => self.store.delete_branch(branch)?,
                }
                return Err(SyncError::ReplayMismatch {
                    index,
                    op_name: record.op_name.clone(),
                    expected: record.commit,
                    actual,
                });
            }

            replayed += 1;
            self.stats.write().records_replayed += 1;
        }

        Ok((synced, replayed))
    }

    fn rebase_local(&self) -> SyncResult<RebaseOutcome> {
        let local_branch = &self.config.local_branch;
        let local = self.store.branch_history(local_branch)?;
        let remote = self.store.branch_history(&self.config.remote_branch)?;

        let fp = fork_point(&local, &remote);
        if fp == remote.len() {
            debug!(
                "rebase is a fast-forward ({:?} relative to remote)",
                relation(&local, &remote)
            );
            return Ok(RebaseOutcome::FastForward {
                head: local.last().copied(),
            });
        }

        // fp < remote.len(), so remote has a head.
        let remote_head = remote[remote.len() - 1];
        let scratch = &self.config.scratch_branch;
        self.store.delete_branch(scratch)?;
        self.store.sync_pointer(&remote_head, scratch)?;

        let head = match self.replay_onto_scratch(&local[fp..], remote_head) {
            Ok(head) => head,
            Err(e) => {
                if let Err(cleanup) = self.store.delete_branch(scratch) {
                    warn!("failed to delete scratch branch {}: {}", scratch, cleanup);
                }
                return Err(e);
            }
        };

        self.store.sync_pointer(&head, local_branch)?;
        self.store.delete_branch(scratch)?;

        let replayed = local.len() - fp;
        self.stats.write().rebases += 1;
        info!(
            "rebased {} local commit(s) onto {}",
            replayed,
            remote_head.short()
        );
        Ok(RebaseOutcome::Rebased {
            fork_point: fp,
            replayed,
            head,
        })
    }

    fn replay_onto_scratch(&self, commits: &[Ref], base: Ref) -> SyncResult<Ref> {
        let scratch = &self.config.scratch_branch;
        let mut head = base;

        for (index, commit) in commits.iter().enumerate() {
            let meta = self.store.read_meta(commit)?;
            self.trace_record("rebase", index, commit, &meta.op_name);
            let root = self.store.read_root_value(scratch)?;
            let next = self.registry.apply(&meta.op_name, &root, &meta.args)?;
            head = self.store.commit(scratch, &next, &meta)?;
        }

        Ok(head)
    }
}
