//! Key-value backends for the persisted authorization record.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::SessionError;

/// Storage key holding the serialised [`StoredAuthorization`](crate::StoredAuthorization).
pub const AUTH_STORAGE_KEY: &str = "auth_login";

pub trait SessionStorage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError>;
    fn write(&self, key: &str, value: &str) -> Result<(), SessionError>;
    fn remove(&self, key: &str) -> Result<(), SessionError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-scoped storage; gone when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// One JSON object file (`key -> value`) shared by all keys.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&data) {
            Ok(map) => Ok(map),
            Err(e) => {
                warn!(path = %self.path.display(), "discarding unreadable session file: {e}");
                Ok(BTreeMap::new())
            }
        }
    }

    fn store(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(entries)?)?;
        Ok(())
    }
}

impl SessionStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, SessionError> {
        let _guard = lock(&self.guard);
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        entries.insert(key.to_string(), value.to_string());
        self.store(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), SessionError> {
        let _guard = lock(&self.guard);
        let mut entries = self.load()?;
        if entries.remove(key).is_some() {
            self.store(&entries)?;
        }
        Ok(())
    }
}
