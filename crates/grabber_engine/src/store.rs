use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use crate::persist::{write_atomic, PersistError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {path:?} unreadable: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("state file {path:?} is not a JSON object: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("stored value for {key} is malformed: {message}")]
    Corrupt { key: String, message: String },
    #[error("failed to write state: {0}")]
    Write(#[from] PersistError),
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("state lock poisoned")]
    Poisoned,
}

/// Durable key/value storage that outlives a single page load.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// `get`, substituting `default` for a missing or `null` value.
    fn get_or(&self, key: &str, default: Value) -> Result<Value, StoreError> {
        Ok(match self.get(key)? {
            Some(Value::Null) | None => default,
            Some(value) => value,
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }
}

/// A JSON object on disk, re-read on every access so separate processes
/// (an interrupted run and a later `resume`) observe each other's writes.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, values: &BTreeMap<String, Value>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(values)?;
        write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, Value>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut values = self.read_all()?;
        f(&mut values);
        self.write_all(&values)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.modify(|values| {
            values.insert(key.to_string(), value);
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.modify(|values| {
            values.remove(key);
        })
    }
}
