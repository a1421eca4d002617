// crates/reproduce-store-json/src/store.rs
// ============================================================================
// Module: JSON Cache Store
// Description: File-backed CacheStore with locked merge-on-write flushes.
// Purpose: Persist verdicts without losing entries to concurrent writers.
// Dependencies: reproduce-core, fs2, serde_json, tempfile, thiserror, tracing
// ============================================================================

//! ## Overview
//! [`JsonCacheStore`] loads the cache file once, serves reads from memory, and
//! tracks which keys this process wrote. A flush takes the in-process mutex,
//! then an exclusive advisory lock on a sibling `.lock` file, re-reads the
//! file, overlays the locally written keys, and atomically replaces the file
//! through a temporary sibling.
//!
//! Loading is best effort: a missing file is an empty cache and an unreadable
//! or corrupt file is logged and treated as empty. Entries written by earlier
//! releases are migrated as they are read. Migration alone never marks a key
//! as written: the flush re-read migrates whatever legacy entries are still
//! on disk, so a newer entry from another writer is never replaced by a stale
//! migrated copy.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use fs2::FileExt;
use reproduce_core::CacheEntry;
use reproduce_core::CacheStore;
use reproduce_core::StoreError;
use reproduce_core::migrate_entry;
use serde_json::Value;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default cache file name.
pub const DEFAULT_CACHE_FILE: &str = "cache.json";
/// Suffix of the advisory lock file.
const LOCK_SUFFIX: &str = ".lock";
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// JSON store errors.
#[derive(Debug, Error)]
pub enum JsonStoreError {
    /// Store I/O error.
    #[error("json store io error: {0}")]
    Io(String),
    /// Store path or data is invalid.
    #[error("json store invalid data: {0}")]
    Invalid(String),
    /// Entries could not be serialized.
    #[error("json store serialization error: {0}")]
    Serialize(String),
    /// Store mutex was poisoned.
    #[error("json store mutex poisoned")]
    Poisoned,
}

impl From<JsonStoreError> for StoreError {
    fn from(error: JsonStoreError) -> Self {
        match error {
            JsonStoreError::Io(message) => Self::Io(message),
            JsonStoreError::Invalid(message) => Self::Invalid(message),
            JsonStoreError::Serialize(message) => Self::Store(message),
            JsonStoreError::Poisoned => Self::Store("json store mutex poisoned".to_string()),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// In-memory view of the cache file.
#[derive(Debug, Default)]
struct StoreState {
    /// Entries by spec.
    entries: BTreeMap<String, CacheEntry>,
    /// Keys written by this process since the last flush.
    dirty: BTreeSet<String>,
}

/// File-backed cache store.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    /// Cache file path.
    path: PathBuf,
    /// Shared state guarded by a mutex.
    state: Arc<Mutex<StoreState>>,
}

impl JsonCacheStore {
    /// Loads the cache file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Invalid`] when the path is unusable. Missing
    /// or corrupt files are not errors.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, JsonStoreError> {
        let path = path.into();
        validate_store_path(&path)?;
        let (entries, migrated) = read_entries(&path);
        if !migrated.is_empty() {
            debug!(path = %path.display(), count = migrated.len(), "migrated legacy cache entries");
        }
        Ok(Self {
            path,
            state: Arc::new(Mutex::new(StoreState {
                entries,
                dirty: BTreeSet::new(),
            })),
        })
    }

    /// Returns the cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of entries held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Poisoned`] when the store mutex is poisoned.
    pub fn len(&self) -> Result<usize, JsonStoreError> {
        Ok(self.state.lock().map_err(|_| JsonStoreError::Poisoned)?.entries.len())
    }

    /// Returns true when no entries are held in memory.
    ///
    /// # Errors
    ///
    /// Returns [`JsonStoreError::Poisoned`] when the store mutex is poisoned.
    pub fn is_empty(&self) -> Result<bool, JsonStoreError> {
        Ok(self.len()? == 0)
    }

    /// Merges locally written entries into the file.
    fn flush_entries(&self) -> Result<(), JsonStoreError> {
        let mut state = self.state.lock().map_err(|_| JsonStoreError::Poisoned)?;
        if state.dirty.is_empty() {
            return Ok(());
        }
        let parent = ensure_parent_dir(&self.path)?;

        let lock_path = lock_path(&self.path);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|err| JsonStoreError::Io(format!("{}: {err}", lock_path.display())))?;
        lock_file.lock_exclusive().map_err(|err| JsonStoreError::Io(format!("{}: {err}", lock_path.display())))?;

        let (mut merged, _) = read_entries(&self.path);
        for key in &state.dirty {
            if let Some(entry) = state.entries.get(key) {
                merged.insert(key.clone(), entry.clone());
            }
        }
        write_atomically(&self.path, parent, &merged)?;
        drop(lock_file);

        state.entries = merged;
        state.dirty.clear();
        drop(state);
        Ok(())
    }
}

impl CacheStore for JsonCacheStore {
    fn get(&self, spec: &str) -> Result<Option<CacheEntry>, StoreError> {
        let state = self.state.lock().map_err(|_| StoreError::from(JsonStoreError::Poisoned))?;
        Ok(state.entries.get(spec).cloned())
    }

    fn put(&self, spec: &str, entry: CacheEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock().map_err(|_| StoreError::from(JsonStoreError::Poisoned))?;
        state.entries.insert(spec.to_string(), entry);
        state.dirty.insert(spec.to_string());
        drop(state);
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        self.flush_entries().map_err(StoreError::from)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Reads and migrates the cache file, falling back to an empty map.
///
/// Returns the entries and the keys whose entries were migrated.
fn read_entries(path: &Path) -> (BTreeMap<String, CacheEntry>, BTreeSet<String>) {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => return (BTreeMap::new(), BTreeSet::new()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cache file unreadable; starting empty");
            return (BTreeMap::new(), BTreeSet::new());
        }
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return (BTreeMap::new(), BTreeSet::new());
    }
    let raw: BTreeMap<String, Value> = match serde_json::from_slice(&bytes) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "cache file corrupt; starting empty");
            return (BTreeMap::new(), BTreeSet::new());
        }
    };

    let mut entries = BTreeMap::new();
    let mut migrated = BTreeSet::new();
    for (spec, value) in raw {
        match serde_json::from_value::<CacheEntry>(value) {
            Ok(mut entry) => {
                if migrate_entry(&mut entry) {
                    migrated.insert(spec.clone());
                }
                entries.insert(spec, entry);
            }
            Err(err) => warn!(spec = %spec, error = %err, "dropping unreadable cache entry"),
        }
    }
    (entries, migrated)
}

/// Writes entries to a sibling temporary file and renames it into place.
fn write_atomically(
    path: &Path,
    parent: &Path,
    entries: &BTreeMap<String, CacheEntry>,
) -> Result<(), JsonStoreError> {
    let mut temp = NamedTempFile::new_in(parent).map_err(|err| JsonStoreError::Io(err.to_string()))?;
    serde_json::to_writer_pretty(&mut temp, entries).map_err(|err| JsonStoreError::Serialize(err.to_string()))?;
    temp.write_all(b"\n").map_err(|err| JsonStoreError::Io(err.to_string()))?;
    temp.as_file().sync_all().map_err(|err| JsonStoreError::Io(err.to_string()))?;
    temp.persist(path).map_err(|err| JsonStoreError::Io(err.error.to_string()))?;
    Ok(())
}

/// Returns the advisory lock path for a cache file.
fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|name| name.to_os_string()).unwrap_or_default();
    name.push(LOCK_SUFFIX);
    path.with_file_name(name)
}

/// Creates the parent directory of the cache file.
fn ensure_parent_dir(path: &Path) -> Result<&Path, JsonStoreError> {
    let parent = match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Path::new("."),
        Some(parent) => parent,
        None => return Err(JsonStoreError::Invalid("store path missing parent directory".to_string())),
    };
    fs::create_dir_all(parent).map_err(|err| JsonStoreError::Io(err.to_string()))?;
    Ok(parent)
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), JsonStoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(JsonStoreError::Invalid("store path is empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(JsonStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    if path.components().any(|component| component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH) {
        return Err(JsonStoreError::Invalid("store path contains an overlong component".to_string()));
    }
    if path.is_dir() {
        return Err(JsonStoreError::Invalid("store path must be a file, not a directory".to_string()));
    }
    if path.file_name().is_none() {
        return Err(JsonStoreError::Invalid("store path has no file name".to_string()));
    }
    Ok(())
}
