//! Persisted key/value storage backing the session, the equivalent of browser local storage.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Flat JSON object on disk, rewritten on every mutation.
pub struct FileStore {
    file_path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    fn load_entries(file_path: &Path) -> Result<HashMap<String, String>, StorageError> {
        let content = fs::read_to_string(file_path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn open(file_path: impl Into<PathBuf>) -> FileStore {
        let file_path = file_path.into();
        let entries = match Self::load_entries(&file_path) {
            Ok(entries) => entries,
            Err(StorageError::Io(e)) if e.kind() == ErrorKind::NotFound => {
                debug!("no session store at {}, starting empty", file_path.display());
                HashMap::new()
            }
            Err(e) => {
                warn!(
                    "ignoring unreadable session store {}: {}",
                    file_path.display(),
                    e
                );
                HashMap::new()
            }
        };

        FileStore {
            file_path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn save(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let json_string = serde_json::to_string_pretty(entries)?;
        fs::write(&self.file_path, json_string)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if entries.remove(key).is_some() {
            self.save(&entries)?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = FileStore::open(&path);
        store.set("token", "\"abc\"").unwrap();
        store.set("expirationdate", "1700000000").unwrap();
        store.remove("expirationdate").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("\"abc\""));
        assert_eq!(reopened.get("expirationdate").unwrap(), None);
    }

    #[test]
    fn test_file_store_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ not json").unwrap();

        let store = FileStore::open(&path);
        assert_eq!(store.get("user").unwrap(), None);

        // First write replaces the corrupt content.
        store.set("user", "{}").unwrap();
        assert_eq!(FileStore::open(&path).get("user").unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty());
        store.set("a", "1").unwrap();
        assert_eq!(store.len(), 1);
        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }
}
