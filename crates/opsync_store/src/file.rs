//! Directory-backed versioned store.
//!
//! ```text
//! <store>/
//! ├─ LOCK            # Advisory lock for single-writer
//! ├─ BRANCHES        # CBOR map of branch name -> head ref
//! └─ objects/
//!    └─ <ref hex>    # One CBOR-encoded commit per file, write-once
//! ```

use crate::commit::{Commit, CommitMeta};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::reference::Ref;
use crate::store::{collect_history, empty_root, VersionedStore};
use fs2::FileExt;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const BRANCHES_FILE: &str = "BRANCHES";
const BRANCHES_TEMP: &str = "BRANCHES.tmp";
const OBJECTS_DIR: &str = "objects";

/// A persistent versioned store rooted at a directory.
///
/// Commits are immutable and content-addressed, so each one is written to
/// its own file exactly once. Branch pointers live in a single table that is
/// replaced with write-then-rename, which makes every `commit` and
/// `sync_pointer` an atomic pointer move on disk.
///
/// The store holds an exclusive advisory lock on the directory for as long
/// as it is open. A second open, from this or another process, fails with
/// [`StoreError::Unavailable`].
///
/// # Example
///
/// ```no_run
/// use opsync_store::{FileStore, StoreConfig, VersionedStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("replica.db"), StoreConfig::default()).unwrap();
/// println!("{}", store.read_root_value("local").unwrap());
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    config: StoreConfig,
    branches: RwLock<BTreeMap<String, Ref>>,
    objects: RwLock<HashMap<Ref, Commit>>,
    _lock_file: File,
}

impl FileStore {
    /// Opens the store at `path`, creating it when the config allows.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another handle holds the lock (returns `Unavailable`)
    /// - The branch table cannot be decoded (returns `Corrupted`)
    /// - I/O errors occur
    pub fn open(path: &Path, config: StoreConfig) -> StoreResult<Self> {
        if !path.exists() {
            if config.create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::Unavailable(format!(
                    "store directory does not exist: {}",
                    path.display()
                )));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "store path is not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::Unavailable(format!(
                "store is locked by another process: {}",
                path.display()
            )));
        }

        fs::create_dir_all(path.join(OBJECTS_DIR))?;
        let branches = load_branches(&path.join(BRANCHES_FILE))?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
            branches: RwLock::new(branches),
            objects: RwLock::new(HashMap::new()),
            _lock_file: lock_file,
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn object_path(&self, commit: &Ref) -> PathBuf {
        self.path.join(OBJECTS_DIR).join(commit.to_hex())
    }

    /// Loads a commit, verifying that its content hashes to its name.
    pub fn load_commit(&self, commit: &Ref) -> StoreResult<Commit> {
        if let Some(cached) = self.objects.read().get(commit) {
            return Ok(cached.clone());
        }

        let data = match fs::read(self.object_path(commit)) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::RefNotFound(*commit))
            }
            Err(e) => return Err(e.into()),
        };

        let decoded: Commit = ciborium::de::from_reader(data.as_slice())
            .map_err(|e| StoreError::Corrupted(format!("object {}: {}", commit.short(), e)))?;

        let actual = decoded.compute_ref();
        if actual != *commit {
            return Err(StoreError::Corrupted(format!(
                "object {} hashes to {}",
                commit.short(),
                actual.short()
            )));
        }

        self.objects.write().insert(*commit, decoded.clone());
        Ok(decoded)
    }

    fn write_commit(&self, commit_ref: &Ref, commit: &Commit) -> StoreResult<()> {
        let object_path = self.object_path(commit_ref);
        if object_path.exists() {
            return Ok(());
        }

        let mut data = Vec::new();
        ciborium::ser::into_writer(commit, &mut data)
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        let temp_path = object_path.with_extension("tmp");
        write_file(&temp_path, &data, self.config.sync_writes)?;
        fs::rename(&temp_path, &object_path)?;
        Ok(())
    }

    /// Persists the branch table with write-then-rename.
    fn save_branches(&self, branches: &BTreeMap<String, Ref>) -> StoreResult<()> {
        let mut data = Vec::new();
        ciborium::ser::into_writer(branches, &mut data)
            .map_err(|e| StoreError::Codec(e.to_string()))?;

        let temp_path = self.path.join(BRANCHES_TEMP);
        write_file(&temp_path, &data, self.config.sync_writes)?;
        fs::rename(&temp_path, self.path.join(BRANCHES_FILE))?;

        if self.config.sync_writes {
            self.sync_directory()?;
        }
        Ok(())
    }

    /// Applies `update` to the branch table and persists it, leaving the
    /// in-memory table unchanged if the write fails.
    fn update_branches<F>(&self, update: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, Ref>) -> bool,
    {
        let mut branches = self.branches.write();
        let mut next = branches.clone();
        if !update(&mut next) {
            return Ok(());
        }
        self.save_branches(&next)?;
        *branches = next;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StoreResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StoreResult<()> {
        Ok(())
    }
}

fn write_file(path: &Path, data: &[u8], sync: bool) -> StoreResult<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    if sync {
        file.sync_all()?;
    }
    Ok(())
}

fn load_branches(path: &Path) -> StoreResult<BTreeMap<String, Ref>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    if data.is_empty() {
        return Ok(BTreeMap::new());
    }

    ciborium::de::from_reader(data.as_slice())
        .map_err(|e| StoreError::Corrupted(format!("branch table: {}", e)))
}

impl VersionedStore for FileStore {
    fn head(&self, branch: &str) -> StoreResult<Option<Ref>> {
        Ok(self.branches.read().get(branch).copied())
    }

    fn branch_history(&self, branch: &str) -> StoreResult<Vec<Ref>> {
        let head = self.head(branch)?;
        collect_history(head, |r| Ok(self.load_commit(r)?.parent))
    }

    fn commit(&self, branch: &str, value: &Value, meta: &CommitMeta) -> StoreResult<Ref> {
        let mut branches = self.branches.write();
        let parent = branches.get(branch).copied();
        let commit = Commit::new(parent, value.clone(), meta.clone());
        let commit_ref = commit.compute_ref();

        self.write_commit(&commit_ref, &commit)?;

        let mut next = branches.clone();
        next.insert(branch.to_string(), commit_ref);
        self.save_branches(&next)?;
        *branches = next;

        self.objects.write().entry(commit_ref).or_insert(commit);
        Ok(commit_ref)
    }

    fn read_root_value(&self, branch: &str) -> StoreResult<Value> {
        match self.head(branch)? {
            Some(head) => Ok(self.load_commit(&head)?.value),
            None => Ok(empty_root()),
        }
    }

    fn read_meta(&self, commit: &Ref) -> StoreResult<CommitMeta> {
        Ok(self.load_commit(commit)?.meta)
    }

    fn ref_exists(&self, commit: &Ref) -> StoreResult<bool> {
        if self.objects.read().contains_key(commit) {
            return Ok(true);
        }
        Ok(self.object_path(commit).exists())
    }

    fn sync_pointer(&self, src: &Ref, dst_branch: &str) -> StoreResult<()> {
        if !self.ref_exists(src)? {
            return Err(StoreError::RefNotFound(*src));
        }
        self.update_branches(|branches| {
            branches.insert(dst_branch.to_string(), *src) != Some(*src)
        })
    }

    fn delete_branch(&self, branch: &str) -> StoreResult<()> {
        self.update_branches(|branches| branches.remove(branch).is_some())
    }

    fn branches(&self) -> StoreResult<Vec<String>> {
        Ok(self.branches.read().keys().cloned().collect())
    }
}
