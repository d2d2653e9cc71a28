//! Persisted key-value store abstraction.
//!
//! The channel catalog and its advisory build lock live in a shared
//! key-value store so that independent execution contexts (separate
//! processes on the same host) reuse one catalog instead of rebuilding it.
//! The trait mirrors a plain string store: serialized text in, serialized
//! text out. Implementations must tolerate concurrent readers and writers;
//! coordination happens above this layer via the advisory lock.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Errors from the persisted key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure reading or writing the backing storage.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters the backing storage cannot represent.
    #[error("invalid store key: {0}")]
    InvalidKey(String),
}

/// Shared string store, localStorage-style.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the value stored under `key`.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

/// File-backed store: one file per key under a directory.
///
/// Writes go through a temporary file and an atomic rename so a concurrent
/// reader never observes a half-written value.
pub struct FileKvStore {
    directory: PathBuf,
}

impl FileKvStore {
    /// Open (creating if needed) a store rooted at `directory`.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty()
            || key
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
        {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.directory.join(key))
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryKvStore::new();
        assert!(store.get("catalog").unwrap().is_none());
        store.set("catalog", "{}").unwrap();
        assert_eq!(store.get("catalog").unwrap().as_deref(), Some("{}"));
        store.remove("catalog").unwrap();
        assert!(store.get("catalog").unwrap().is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();

        assert!(store.get("sensor.catalog").unwrap().is_none());
        store.set("sensor.catalog", "payload").unwrap();
        assert_eq!(
            store.get("sensor.catalog").unwrap().as_deref(),
            Some("payload")
        );

        // A second store over the same directory sees the value.
        let other = FileKvStore::open(dir.path()).unwrap();
        assert_eq!(
            other.get("sensor.catalog").unwrap().as_deref(),
            Some("payload")
        );
    }

    #[test]
    fn file_store_rejects_path_traversal_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(store.get(""), Err(StoreError::InvalidKey(_))));
    }

    #[test]
    fn file_store_overwrites_existing_value() {
        let dir = TempDir::new().unwrap();
        let store = FileKvStore::open(dir.path()).unwrap();
        store.set("k", "one").unwrap();
        store.set("k", "two").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("two"));
    }
}
