//! Key-value persistence for the office ledgers.
//!
//! Each ledger is stored as one JSON document under a fixed key and
//! overwritten on every mutation. A value that no longer parses is logged
//! and replaced by an empty state instead of failing the caller.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::logs::log_warning;
use crate::error::StoreResult;

/// Key of the compensation ledger.
pub const EXPENSE_KEY: &str = "expense-data";

/// Key of the stock ledger.
pub const STOCK_KEY: &str = "stock-data";

/// String-valued key-value storage.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;
}

/// One `<key>.json` file per key under a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", file))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-process store, used by tests.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the value under `key`, or `T::default()` when it is missing,
/// unreadable or no longer parses.
pub fn load_or_default<T>(store: &dyn KeyValueStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return T::default(),
        Err(e) => {
            log_warning(format!("Failed to load '{}': {}", key, e));
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            log_warning(format!("Stored value for '{}' is corrupt, starting empty: {}", key, e));
            T::default()
        }
    }
}

/// Serialize `value` as JSON and overwrite `key`.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> StoreResult<()> {
    let json = serde_json::to_string(value)?;
    store.set(key, &json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get(EXPENSE_KEY).unwrap(), None);
        save(&store, EXPENSE_KEY, &vec![1, 2, 3]).unwrap();

        let loaded: Vec<i32> = load_or_default(&store, EXPENSE_KEY);
        assert_eq!(loaded, vec![1, 2, 3]);
        assert!(dir.path().join("nested").join("expense-data.json").exists());
    }

    #[test]
    fn test_corrupt_value_starts_empty() {
        let store = MemoryStore::new();
        store.set(STOCK_KEY, "{not json").unwrap();

        let loaded: Vec<String> = load_or_default(&store, STOCK_KEY);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_incompatible_value_starts_empty() {
        let store = MemoryStore::new();
        store.set(EXPENSE_KEY, "{\"unexpected\": true}").unwrap();

        let loaded: Vec<u64> = load_or_default(&store, EXPENSE_KEY);
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_missing_key_is_default() {
        let store = MemoryStore::new();
        let loaded: Vec<u64> = load_or_default(&store, "never-written");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_key_sanitized_for_file_name() {
        let store = FileStore::new("/tmp/unused");
        assert!(store.path_for("../escape").ends_with("___escape.json"));
    }
}
