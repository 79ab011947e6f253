//! Persisted list storage.
//!
//! Each list is a UTF-8 text file with one entry per line. Writes go to a
//! temporary sibling which is fsynced and renamed over the target, so a reader
//! (or a power cut) only ever sees the previous or the new content.

use std::{
    collections::HashMap,
    fs::{self, File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use fs2::FileExt;
use parking_lot::RwLock;
use tempfile::NamedTempFile;
use tracing::{debug, error, warn};

use crate::{
    error::{StoreError, StoreResult},
    pools::{normalize_entry, ListKey},
};

/// Durable key to ordered-list storage.
pub trait ListStore: Send + Sync {
    /// Entries of `key` in persisted order; empty if never written.
    fn load(&self, key: ListKey) -> StoreResult<Vec<String>>;

    /// Atomically replace the full content of `key`.
    fn save(&self, key: ListKey, entries: &[String]) -> StoreResult<()>;

    /// Append one trimmed entry. Blank input is a no-op and returns `false`.
    fn append(&self, key: ListKey, entry: &str) -> StoreResult<bool> {
        let Some(entry) = normalize_entry(entry) else {
            return Ok(false);
        };
        let mut entries = self.load(key)?;
        entries.push(entry);
        self.save(key, &entries)?;
        Ok(true)
    }

    /// Whether `key` has ever been written (and not removed since).
    fn exists(&self, key: ListKey) -> StoreResult<bool>;

    /// Delete `key`; later loads return an empty list.
    fn remove(&self, key: ListKey) -> StoreResult<()>;
}

/// Lock file that marks a data root as owned by one process.
pub const LOCK_FILE: &str = ".tombola.lock";

const LOCK_RETRY: Duration = Duration::from_millis(50);

/// File-backed store rooted at a data directory.
///
/// The store holds an exclusive advisory lock on the data root for as long as
/// it (or any clone) is alive, so two processes never mutate the same lists.
#[derive(Debug, Clone)]
pub struct FileListStore {
    root: PathBuf,
    _lock: Arc<File>,
}

impl FileListStore {
    /// Open the store, creating the data directory when it is missing.
    ///
    /// Fails with [`StoreError::Locked`] at once if another store owns the root.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::open_with_wait(root, Duration::ZERO)
    }

    /// Like [`FileListStore::open`], but waits up to `wait` for the owner to go away.
    pub fn open_with_wait(root: impl Into<PathBuf>, wait: Duration) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|err| {
            error!(root = %root.display(), %err, "failed to prepare data root");
            StoreError::unavailable(&root, err)
        })?;
        let lock = lock_root(&root, wait)?;
        debug!(root = %root.display(), "list store opened");
        Ok(Self {
            root,
            _lock: Arc::new(lock),
        })
    }

    /// Directory holding the list files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `key`.
    pub fn path_for(&self, key: ListKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn ensure_mounted(&self) -> StoreResult<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(StoreError::unavailable(
                &self.root,
                io::Error::new(io::ErrorKind::NotFound, "data root is not mounted"),
            ))
        }
    }
}

impl ListStore for FileListStore {
    fn load(&self, key: ListKey) -> StoreResult<Vec<String>> {
        self.ensure_mounted()?;
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(decode_entries(&String::from_utf8_lossy(&bytes))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(StoreError::unavailable(path, err)),
        }
    }

    fn save(&self, key: ListKey, entries: &[String]) -> StoreResult<()> {
        self.ensure_mounted()?;
        let path = self.path_for(key);
        let encoded = encode_entries(entries);

        let mut staged =
            NamedTempFile::new_in(&self.root).map_err(|err| StoreError::unavailable(&path, err))?;
        staged
            .write_all(encoded.as_bytes())
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|err| StoreError::unavailable(&path, err))?;
        staged
            .persist(&path)
            .map_err(|err| StoreError::unavailable(&path, err.error))?;

        debug!(key = %key, count = entries.len(), "list saved");
        Ok(())
    }

    fn exists(&self, key: ListKey) -> StoreResult<bool> {
        self.ensure_mounted()?;
        Ok(self.path_for(key).is_file())
    }

    fn remove(&self, key: ListKey) -> StoreResult<()> {
        self.ensure_mounted()?;
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::unavailable(path, err)),
        }
    }
}

/// In-process store used for dry runs and tests.
#[derive(Debug)]
pub struct MemoryListStore {
    lists: RwLock<HashMap<ListKey, Vec<String>>>,
    saves: RwLock<HashMap<ListKey, usize>>,
    mounted: AtomicBool,
}

impl Default for MemoryListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryListStore {
    /// Create an empty, mounted store.
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(HashMap::new()),
            saves: RwLock::new(HashMap::new()),
            mounted: AtomicBool::new(true),
        }
    }

    /// Simulate the storage being detached (`false`) or re-attached (`true`).
    pub fn set_mounted(&self, mounted: bool) {
        self.mounted.store(mounted, Ordering::SeqCst);
    }

    /// Number of successful saves of `key` so far.
    pub fn save_count(&self, key: ListKey) -> usize {
        self.saves.read().get(&key).copied().unwrap_or(0)
    }

    fn ensure_mounted(&self) -> StoreResult<()> {
        if self.mounted.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::unavailable(
                "memory",
                io::Error::new(io::ErrorKind::NotConnected, "storage detached"),
            ))
        }
    }
}

impl ListStore for MemoryListStore {
    fn load(&self, key: ListKey) -> StoreResult<Vec<String>> {
        self.ensure_mounted()?;
        Ok(self.lists.read().get(&key).cloned().unwrap_or_default())
    }

    fn save(&self, key: ListKey, entries: &[String]) -> StoreResult<()> {
        self.ensure_mounted()?;
        let normalized = entries
            .iter()
            .filter_map(|entry| normalize_entry(entry))
            .collect();
        self.lists.write().insert(key, normalized);
        *self.saves.write().entry(key).or_insert(0) += 1;
        Ok(())
    }

    fn exists(&self, key: ListKey) -> StoreResult<bool> {
        self.ensure_mounted()?;
        Ok(self.lists.read().contains_key(&key))
    }

    fn remove(&self, key: ListKey) -> StoreResult<()> {
        self.ensure_mounted()?;
        self.lists.write().remove(&key);
        Ok(())
    }
}

fn lock_root(root: &Path, wait: Duration) -> StoreResult<File> {
    let path = root.join(LOCK_FILE);
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&path)
        .map_err(|err| StoreError::unavailable(&path, err))?;

    let deadline = Instant::now() + wait;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(file),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                if Instant::now() >= deadline {
                    warn!(root = %root.display(), "data root owned by another process");
                    return Err(StoreError::Locked {
                        path: root.to_path_buf(),
                    });
                }
                thread::sleep(LOCK_RETRY);
            }
            Err(err) => return Err(StoreError::unavailable(&path, err)),
        }
    }
}

fn decode_entries(content: &str) -> Vec<String> {
    content.lines().filter_map(normalize_entry).collect()
}

fn encode_entries(entries: &[String]) -> String {
    let mut encoded = String::new();
    for entry in entries.iter().filter_map(|entry| normalize_entry(entry)) {
        encoded.push_str(&entry);
        encoded.push('\n');
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn missing_key_loads_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        assert!(store.load(ListKey::Roster)?.is_empty());
        assert!(!store.exists(ListKey::Roster)?);
        Ok(())
    }

    #[test]
    fn save_round_trip_preserves_order_and_trims() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        store.save(ListKey::Roster, &names(&["Zoe  ", " Ana", "", "Luis", "Ana"]))?;

        assert_eq!(store.load(ListKey::Roster)?, names(&["Zoe", "Ana", "Luis", "Ana"]));
        let raw = fs::read_to_string(store.path_for(ListKey::Roster))?;
        assert_eq!(raw, "Zoe\nAna\nLuis\nAna\n");
        Ok(())
    }

    #[test]
    fn save_replaces_without_leaving_temp_files() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        store.save(ListKey::Questions, &names(&["one", "two", "three"]))?;
        store.save(ListKey::Questions, &names(&["four"]))?;

        assert_eq!(store.load(ListKey::Questions)?, names(&["four"]));
        let files: Vec<_> = fs::read_dir(dir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name != LOCK_FILE)
            .collect();
        assert_eq!(files, vec!["questions.txt".to_string()]);
        Ok(())
    }

    #[test]
    fn load_tolerates_crlf_and_invalid_utf8() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        fs::write(
            store.path_for(ListKey::Roster),
            b"Jos\xc3\xa9\r\n\r\nBad\xff\r\n",
        )?;

        let loaded = store.load(ListKey::Roster)?;
        assert_eq!(loaded[0], "José");
        assert!(loaded[1].starts_with("Bad"));
        assert_eq!(loaded.len(), 2);
        Ok(())
    }

    #[test]
    fn append_ignores_blank_input() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        assert!(store.append(ListKey::Roster, " Ana ")?);
        assert!(!store.append(ListKey::Roster, "   ")?);
        assert!(store.append(ListKey::Roster, "Luis")?);
        assert_eq!(store.load(ListKey::Roster)?, names(&["Ana", "Luis"]));
        Ok(())
    }

    #[test]
    fn remove_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let store = FileListStore::open(dir.path())?;
        store.save(ListKey::RosterMaster, &names(&["Ana"]))?;
        store.remove(ListKey::RosterMaster)?;
        store.remove(ListKey::RosterMaster)?;
        assert!(!store.exists(ListKey::RosterMaster)?);
        assert!(store.load(ListKey::RosterMaster)?.is_empty());
        Ok(())
    }

    #[test]
    fn unmounted_root_reports_unavailable() -> Result<()> {
        let dir = tempdir()?;
        let root = dir.path().join("flash");
        let store = FileListStore::open(&root)?;
        fs::remove_dir_all(&root)?;

        assert!(matches!(
            store.load(ListKey::Roster),
            Err(StoreError::Unavailable { .. })
        ));
        assert!(store.save(ListKey::Roster, &names(&["Ana"])).is_err());
        assert!(store.exists(ListKey::Roster).is_err());
        assert!(store.remove(ListKey::Roster).is_err());
        Ok(())
    }

    #[test]
    fn second_store_on_same_root_is_locked_out() -> Result<()> {
        let dir = tempdir()?;
        let owner = FileListStore::open(dir.path())?;
        let shared = owner.clone();

        assert!(matches!(
            FileListStore::open(dir.path()),
            Err(StoreError::Locked { .. })
        ));
        let started = Instant::now();
        assert!(matches!(
            FileListStore::open_with_wait(dir.path(), Duration::from_millis(120)),
            Err(StoreError::Locked { .. })
        ));
        assert!(started.elapsed() >= Duration::from_millis(120));

        drop(owner);
        assert!(FileListStore::open(dir.path()).is_err());
        drop(shared);
        let next = FileListStore::open(dir.path())?;
        assert_eq!(next.root(), dir.path());
        Ok(())
    }

    #[test]
    fn waiting_open_succeeds_once_owner_closes() -> Result<()> {
        let dir = tempdir()?;
        let owner = FileListStore::open(dir.path())?;
        let root = dir.path().to_path_buf();
        let waiter =
            thread::spawn(move || FileListStore::open_with_wait(root, Duration::from_secs(5)));

        thread::sleep(Duration::from_millis(100));
        drop(owner);
        let store = waiter.join().expect("waiter thread panicked")?;
        store.save(ListKey::Roster, &names(&["Ana"]))?;
        assert_eq!(store.load(ListKey::Roster)?, names(&["Ana"]));
        Ok(())
    }

    #[test]
    fn memory_store_counts_saves_and_detaches() {
        let store = MemoryListStore::new();
        store.save(ListKey::Roster, &names(&["Ana"])).unwrap();
        store.append(ListKey::Roster, "Luis").unwrap();
        assert_eq!(store.save_count(ListKey::Roster), 2);

        store.set_mounted(false);
        assert!(store.load(ListKey::Roster).is_err());
        store.set_mounted(true);
        assert_eq!(store.load(ListKey::Roster).unwrap(), names(&["Ana", "Luis"]));
    }
}
