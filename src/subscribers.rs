//! Subscriber preference store.
//!
//! Push recipients are keyed by an opaque channel token, each with an
//! individual minimum-magnitude threshold. The backing store is a
//! swappable adapter behind the `SubscriberStore` trait; the core only
//! needs upsert/delete/list with last-write-wins semantics.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::QuakeWatchError;

/// Default minimum magnitude for a new subscriber.
pub const DEFAULT_THRESHOLD: f64 = 6.0;

/// Keyed store of per-subscriber magnitude thresholds.
pub trait SubscriberStore: Send + Sync {
    /// Register or update a subscriber (last write wins).
    fn upsert(&self, token: &str, threshold: f64) -> Result<(), QuakeWatchError>;

    /// Remove a subscriber. Removing an unknown token is not an error.
    fn delete(&self, token: &str) -> Result<(), QuakeWatchError>;

    /// All stored `(token, threshold)` pairs. Order is not significant.
    fn list(&self) -> Result<Vec<(String, f64)>, QuakeWatchError>;
}

/// In-memory adapter, used for tests and single-run sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, f64>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubscriberStore for MemoryStore {
    fn upsert(&self, token: &str, threshold: f64) -> Result<(), QuakeWatchError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        records.insert(token.to_string(), threshold);
        Ok(())
    }

    fn delete(&self, token: &str) -> Result<(), QuakeWatchError> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        records.remove(token);
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, f64)>, QuakeWatchError> {
        let records = self
            .records
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        Ok(records.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    subscribers: HashMap<String, f64>,
}

/// JSON-file-backed adapter for durable subscriber records.
///
/// The whole file is re-read on every operation and rewritten on every
/// mutation; subscriber counts are small and this keeps concurrent CLI
/// invocations from clobbering each other's view.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write sequences within this process.
    guard: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or lazily create) a store at the given path.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    fn load(path: &Path) -> Result<StoreFile, QuakeWatchError> {
        if !path.exists() {
            return Ok(StoreFile::default());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| QuakeWatchError::Store(format!("read {}: {e}", path.display())))?;
        let file: StoreFile = serde_json::from_str(&raw)
            .map_err(|e| QuakeWatchError::Store(format!("parse {}: {e}", path.display())))?;
        Ok(file)
    }

    fn save(path: &Path, file: &StoreFile) -> Result<(), QuakeWatchError> {
        let raw = serde_json::to_string_pretty(file)
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        std::fs::write(path, raw)
            .map_err(|e| QuakeWatchError::Store(format!("write {}: {e}", path.display())))?;
        Ok(())
    }
}

impl SubscriberStore for JsonFileStore {
    fn upsert(&self, token: &str, threshold: f64) -> Result<(), QuakeWatchError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        let mut file = Self::load(&self.path)?;
        file.subscribers.insert(token.to_string(), threshold);
        Self::save(&self.path, &file)?;
        debug!("stored subscriber {token} with threshold {threshold}");
        Ok(())
    }

    fn delete(&self, token: &str) -> Result<(), QuakeWatchError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        let mut file = Self::load(&self.path)?;
        file.subscribers.remove(token);
        Self::save(&self.path, &file)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<(String, f64)>, QuakeWatchError> {
        let _guard = self
            .guard
            .lock()
            .map_err(|e| QuakeWatchError::Store(e.to_string()))?;
        let file = Self::load(&self.path)?;
        Ok(file.subscribers.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_last_write_wins() {
        let store = MemoryStore::new();
        store.upsert("tok-a", 5.0).unwrap();
        store.upsert("tok-a", 7.5).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed, vec![("tok-a".to_string(), 7.5)]);
    }

    #[test]
    fn test_memory_delete_unknown_is_ok() {
        let store = MemoryStore::new();
        store.delete("never-registered").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_json_file_round_trip() {
        let path = std::env::temp_dir().join(format!(
            "quakewatch-store-test-{}.json",
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);

        let store = JsonFileStore::open(&path);
        store.upsert("tok-a", 5.0).unwrap();
        store.upsert("tok-b", 7.0).unwrap();
        store.upsert("tok-a", 4.5).unwrap();
        store.delete("tok-b").unwrap();

        // A fresh handle on the same path sees the committed state.
        let reopened = JsonFileStore::open(&path);
        let mut listed = reopened.list().unwrap();
        listed.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(listed, vec![("tok-a".to_string(), 4.5)]);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_json_file_missing_is_empty() {
        let store = JsonFileStore::open("/nonexistent-dir-hopefully/never.json");
        assert!(store.list().unwrap().is_empty());
    }
}
