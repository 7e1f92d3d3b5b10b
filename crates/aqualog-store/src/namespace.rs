//! The flat key-value namespace.
//!
//! A string-to-string map with no transactions: each `set` replaces one key,
//! and concurrent writers race with the last one winning. Containers,
//! global settings, temperature readings and stats histories live here as
//! JSON-encoded values; images never do.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use aqualog_types::{Container, ContainerId, GlobalSettings, StatsEntry, TemperatureReading};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::directory::write_atomic;
use crate::error::{StorageError, StorageResult};

/// Key holding the JSON array of containers.
pub const CONTAINERS_KEY: &str = "aquariums";

/// Key holding the JSON-encoded [`GlobalSettings`].
pub const SETTINGS_KEY: &str = "global_settings";

/// Key prefix for a container's temperature readings.
pub const TEMPERATURE_PREFIX: &str = "temperature-";

/// Key prefix for a container's water chemistry history.
pub const STATS_PREFIX: &str = "stats-";

/// Storage interface for the flat namespace.
pub trait KeyValueStore: Send + Sync {
    /// Read a key. Returns `Ok(None)` if absent.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write (create or replace) a key.
    fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// Remove a key. Returns `true` if it existed.
    fn remove(&self, key: &str) -> StorageResult<bool>;

    /// All keys, sorted.
    fn keys(&self) -> StorageResult<Vec<String>>;
}

fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// An in-memory implementation of [`KeyValueStore`].
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(entries.keys().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// File-backed
// ---------------------------------------------------------------------------

/// A [`KeyValueStore`] persisted as one JSON object file.
///
/// Every read goes to disk, so writes from another process become visible.
/// Every write rewrites the whole file atomically. Writers within one
/// process are serialized; across processes the last writer wins.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyValueStore {
    /// Open (or create) the namespace file at `path`.
    ///
    /// An existing file that is not a JSON object of strings is rejected.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::Unavailable(format!("{}: {e}", parent.display())))?;
        }
        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> StorageResult<BTreeMap<String, String>> {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                location: self.path.display().to_string(),
                reason: e.to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> StorageResult<()> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let bytes = serde_json::to_vec_pretty(entries)?;
        write_atomic(&dir, &self.path, &bytes)
    }

    fn modify<T>(&self, f: impl FnOnce(&mut BTreeMap<String, String>) -> T) -> StorageResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("lock poisoned: {e}")))?;
        let mut entries = self.load()?;
        let out = f(&mut entries);
        self.store(&entries)?;
        Ok(out)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        check_key(key)?;
        self.modify(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> StorageResult<bool> {
        self.modify(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}

// ---------------------------------------------------------------------------
// Typed access
// ---------------------------------------------------------------------------

/// Typed view over a [`KeyValueStore`] for the values aqualog keeps there.
#[derive(Clone)]
pub struct FlatNamespace {
    kv: Arc<dyn KeyValueStore>,
}

impl FlatNamespace {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// A namespace over a fresh [`InMemoryKeyValueStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryKeyValueStore::new()))
    }

    pub fn raw(&self) -> &dyn KeyValueStore {
        self.kv.as_ref()
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> StorageResult<Option<T>> {
        match self.kv.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    location: format!("key {key:?}"),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.kv.set(key, &raw)
    }

    /// The container list, empty if never written.
    pub fn containers(&self) -> StorageResult<Vec<Container>> {
        Ok(self.read_json(CONTAINERS_KEY)?.unwrap_or_default())
    }

    /// Replace the container list wholesale.
    pub fn replace_containers(&self, containers: &[Container]) -> StorageResult<()> {
        debug!(count = containers.len(), "writing container list");
        self.write_json(CONTAINERS_KEY, containers)
    }

    pub fn global_settings(&self) -> StorageResult<GlobalSettings> {
        Ok(self.read_json(SETTINGS_KEY)?.unwrap_or_default())
    }

    pub fn set_global_settings(&self, settings: &GlobalSettings) -> StorageResult<()> {
        self.write_json(SETTINGS_KEY, settings)
    }

    /// A container's temperature readings, oldest first as recorded.
    pub fn temperatures(&self, container: &ContainerId) -> StorageResult<Vec<TemperatureReading>> {
        Ok(self
            .read_json(&temperature_key(container))?
            .unwrap_or_default())
    }

    pub fn set_temperatures(
        &self,
        container: &ContainerId,
        readings: &[TemperatureReading],
    ) -> StorageResult<()> {
        self.write_json(&temperature_key(container), readings)
    }

    /// Drop a container's readings. Returns `true` if any were stored.
    pub fn remove_temperatures(&self, container: &ContainerId) -> StorageResult<bool> {
        self.kv.remove(&temperature_key(container))
    }

    /// A container's stats history, oldest first.
    pub fn stats_history(&self, container: &ContainerId) -> StorageResult<Vec<StatsEntry>> {
        Ok(self.read_json(&stats_key(container))?.unwrap_or_default())
    }

    pub fn set_stats_history(&self, container: &ContainerId, history: &[StatsEntry]) -> StorageResult<()> {
        self.write_json(&stats_key(container), history)
    }

    /// Drop a container's stats history. Returns `true` if any was stored.
    pub fn remove_stats_history(&self, container: &ContainerId) -> StorageResult<bool> {
        self.kv.remove(&stats_key(container))
    }

    /// Remove the `"images"` key some older builds wrote here.
    ///
    /// Images belong to the record collection; a copy in this namespace is
    /// never read.
    pub fn drop_stray_images_key(&self) -> StorageResult<()> {
        if self.kv.remove("images")? {
            warn!("removed stray \"images\" key from flat namespace");
        }
        Ok(())
    }
}

impl std::fmt::Debug for FlatNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlatNamespace").finish_non_exhaustive()
    }
}

fn temperature_key(container: &ContainerId) -> String {
    format!("{TEMPERATURE_PREFIX}{container}")
}

fn stats_key(container: &ContainerId) -> String {
    format!("{STATS_PREFIX}{container}")
}
