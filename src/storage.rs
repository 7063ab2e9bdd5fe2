//! Balance and history persistence
//!
//! The engine only needs the balance and the recent history to survive a
//! restart. [`JsonFileStore`] keeps them in one JSON document;
//! [`MemoryStore`] is the in-process stand-in used by tests and simulations.

use crate::common::traits::StateStore;
use crate::common::types::lock;
use crate::errors::{StorageError, WagerResult};
use crate::ledger::HistoryEntry;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// Persisted layout: a balance and the history, newest first
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedState {
    pub balance: f64,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// JSON file store with atomic replace
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "wager_state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self) -> WagerResult<Option<PersistedState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StorageError::ReadFailed(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                ))
                .into())
            }
        };

        let state: PersistedState = serde_json::from_str(&content).map_err(|e| {
            StorageError::CorruptedData(format!("{}: {}", self.path.display(), e))
        })?;

        debug!(
            "Loaded state from {} ({} history entries)",
            self.path.display(),
            state.history.len()
        );
        Ok(Some(state))
    }

    fn save(&self, state: &PersistedState) -> WagerResult<()> {
        let json = serde_json::to_string_pretty(state)
            .map_err(|e| StorageError::WriteFailed(format!("serialize: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::WriteFailed(format!("{}: {}", parent.display(), e)))?;
        }

        let temp = self.temp_path();
        std::fs::write(&temp, json)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", temp.display(), e)))?;
        std::fs::rename(&temp, &self.path)
            .map_err(|e| StorageError::WriteFailed(format!("{}: {}", self.path.display(), e)))?;

        Ok(())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    pub fn current(&self) -> Option<PersistedState> {
        lock(&self.state).clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> WagerResult<Option<PersistedState>> {
        Ok(self.current())
    }

    fn save(&self, state: &PersistedState) -> WagerResult<()> {
        *lock(&self.state) = Some(state.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WagerError;
    use crate::games::types::{GameType, SessionId};
    use tempfile::TempDir;

    fn sample_state() -> PersistedState {
        PersistedState {
            balance: 87.5,
            history: vec![HistoryEntry::new(SessionId::new(), GameType::Plinko, 5.0, 0.5)],
        }
    }

    #[test]
    fn test_missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state.json"));
        let state = sample_state();

        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").unwrap();

        match JsonFileStore::new(&path).load() {
            Err(WagerError::Storage(StorageError::CorruptedData(_))) => {}
            other => panic!("expected corrupted data, got {:?}", other),
        }
    }

    #[test]
    fn test_history_defaults_to_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"balance": 12.0}"#).unwrap();

        let state = JsonFileStore::new(&path).load().unwrap().unwrap();
        assert_eq!(state.balance, 12.0);
        assert!(state.history.is_empty());
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert!(store.load().unwrap().is_none());
        store.save(&sample_state()).unwrap();
        assert_eq!(store.load().unwrap().unwrap().balance, 87.5);
    }
}
