//! Persisted key-value storage used for badge flags.
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use thiserror::Error;

/// Errors raised by a persisted key-value backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("storage file {path} is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage backend rejected write: {0}")]
    Rejected(String),
}

/// Minimal integer key-value store, modelled after engine player-prefs APIs.
pub trait KeyValueStore {
    /// Read an integer, returning `default` when the key is absent.
    fn get_int(&self, key: &str, default: i32) -> i32;

    /// Stage an integer write.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the write.
    fn set_int(&mut self, key: &str, value: i32) -> Result<(), StorageError>;

    /// Make staged writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot persist its contents.
    fn flush(&mut self) -> Result<(), StorageError>;
}

/// In-memory store. Clones share the same backing map, so a test or tool can
/// keep a handle and inspect what the game persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<BTreeMap<String, i32>>>,
    flushes: Rc<RefCell<usize>>,
    reject_writes: Rc<RefCell<bool>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-populated with the provided entries.
    #[must_use]
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, i32)>,
        K: Into<String>,
    {
        let store = Self::default();
        store
            .values
            .borrow_mut()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        store
    }

    /// Current value for `key`, if any was ever written.
    #[must_use]
    pub fn peek(&self, key: &str) -> Option<i32> {
        self.values.borrow().get(key).copied()
    }

    /// Make every subsequent write fail, simulating a full or locked disk.
    pub fn set_reject_writes(&self, reject: bool) {
        *self.reject_writes.borrow_mut() = reject;
    }

    /// Number of times `flush` was called across all clones.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self.flushes.borrow()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.peek(key).unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        if *self.reject_writes.borrow() {
            return Err(StorageError::Rejected(key.to_string()));
        }
        self.values.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        *self.flushes.borrow_mut() += 1;
        Ok(())
    }
}

/// JSON file backed store. Writes are staged in memory until `flush`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, i32>,
}

impl JsonFileStore {
    /// Open the store at `path`. A missing file yields an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StorageError::Format {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_int(&self, key: &str, default: i32) -> i32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn set_int(&mut self, key: &str, value: i32) -> Result<(), StorageError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        let io_err = |source| StorageError::Io {
            path: self.path.clone(),
            source,
        };
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            StorageError::Format {
                path: self.path.clone(),
                source,
            }
        })?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, text).map_err(io_err)?;
        fs::rename(&staging, &self.path).map_err(io_err)?;
        log::debug!("flushed {} keys to {}", self.values.len(), self.path.display());
        Ok(())
    }
}
