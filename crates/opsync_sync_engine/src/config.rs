//! Configuration for the sync engine.

/// Branch holding the replica's own work.
pub const DEFAULT_LOCAL_BRANCH: &str = "local";
/// Remote-tracking branch: the last state pulled from the server log.
pub const DEFAULT_REMOTE_BRANCH: &str = "remote";
/// Throwaway branch used while rebasing.
pub const DEFAULT_SCRATCH_BRANCH: &str = "tmp";

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identifier recorded as the `source` of commits made through `op`.
    pub source: String,
    /// Name of the local branch.
    pub local_branch: String,
    /// Name of the remote-tracking branch.
    pub remote_branch: String,
    /// Name of the scratch branch used by rebase.
    pub scratch_branch: String,
    /// Log every pushed, pulled and replayed record at `info` instead of
    /// `debug`.
    pub verbose: bool,
}

impl SyncConfig {
    /// Creates a configuration for a replica identified by `source`.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            local_branch: DEFAULT_LOCAL_BRANCH.into(),
            remote_branch: DEFAULT_REMOTE_BRANCH.into(),
            scratch_branch: DEFAULT_SCRATCH_BRANCH.into(),
            verbose: false,
        }
    }

    /// Sets the local branch name.
    pub fn with_local_branch(mut self, name: impl Into<String>) -> Self {
        self.local_branch = name.into();
        self
    }

    /// Sets the remote-tracking branch name.
    pub fn with_remote_branch(mut self, name: impl Into<String>) -> Self {
        self.remote_branch = name.into();
        self
    }

    /// Sets the scratch branch name.
    pub fn with_scratch_branch(mut self, name: impl Into<String>) -> Self {
        self.scratch_branch = name.into();
        self
    }

    /// Sets per-record logging verbosity.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("cli")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_branches() {
        let config = SyncConfig::default();
        assert_eq!(config.source, "cli");
        assert_eq!(config.local_branch, "local");
        assert_eq!(config.remote_branch, "remote");
        assert_eq!(config.scratch_branch, "tmp");
        assert!(!config.verbose);
    }

    #[test]
    fn sync_config_builder() {
        let config = SyncConfig::new("phone")
            .with_local_branch("mine")
            .with_remote_branch("theirs")
            .with_scratch_branch("scratch")
            .with_verbose(true);

        assert_eq!(config.source, "phone");
        assert_eq!(config.local_branch, "mine");
        assert_eq!(config.remote_branch, "theirs");
        assert_eq!(config.scratch_branch, "scratch");
        assert!(config.verbose);
    }
}
