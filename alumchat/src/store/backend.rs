//! Key-value storage backends for locally persisted chat state.
//!
//! The persisted families are small JSON documents (one roster list, one
//! message log per contact), so the contract is a minimal string-valued
//! key-value store. [`JsonFileStorage`] keeps one file per key under a data
//! directory; [`MemoryStorage`] backs tests.

use std::collections::HashMap;
use std::path::PathBuf;

use parking_lot::Mutex;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// An underlying I/O operation failed.
    #[error("storage I/O error for key {key}: {source}")]
    Io {
        /// The key being read or written.
        key: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Synchronous key-value storage contract.
///
/// Reads distinguish "no data" (`Ok(None)`) from real failures; callers in
/// this crate treat both as empty collections, per the best-effort
/// persistence policy, but the distinction is kept for logging.
pub trait Storage: Send + Sync {
    /// Reads the value stored under `key`, or `None` if absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to write.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Deletes the value under `key`. Deleting an absent key is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the backend fails to delete.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory [`Storage`] implementation for tests.
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

/// File-backed [`Storage`]: one JSON file per key under a data directory.
///
/// Keys are contact emails and the fixed roster key, so they are sanitized
/// into safe file names (`ada@alum.example` → `ada@alum.example.json`).
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    /// Opens (creating if needed) the data directory.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '@' | '-' | '_' | '+') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }
}

impl Storage for JsonFileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        std::fs::write(self.path_for(key), value).map_err(|source| StorageError::Io {
            key: key.to_string(),
            source,
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}
