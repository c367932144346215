//! Local key-value storage.
//!
//! Plays the role browser storage plays for a web storefront: a handful of
//! string values under well-known keys, surviving restarts when file-backed.
//! Values are JSON documents written whole; the last writer wins.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Guest cart lines.
    pub const GUEST_CART: &str = "guest_cart";
    /// Last account cart fetched from the backend.
    pub const CACHED_CART: &str = "cached_cart";
    /// Bearer token of the signed-in shopper.
    pub const AUTH_TOKEN: &str = "auth_token";
    /// Product comparison list.
    pub const COMPARE_ITEMS: &str = "compareItems";
}

/// Errors that can occur when reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters that cannot be used as a file name.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    /// Value could not be encoded.
    #[error("Failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String key-value storage.
pub trait KeyValueStorage: Send + Sync {
    /// Read a value; `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting an absent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// A value that fails to decode is logged and treated as absent, the same way
/// a storefront treats a mangled browser-storage entry.
///
/// # Errors
///
/// Returns an error only if the storage read itself fails.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn KeyValueStorage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding unreadable stored value");
            Ok(None)
        }
    }
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns an error if encoding or the storage write fails.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn KeyValueStorage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, &raw)
}

// =============================================================================
// FileStorage
// =============================================================================

/// Directory-backed storage: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create storage rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the stored values.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir).map_err(|source| StorageError::Io {
            path: self.dir.clone(),
            source,
        })?;

        // Write-then-rename so readers never see a partial value
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| StorageError::Io { path, source })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path, source }),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-process storage for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);

        storage.set(keys::GUEST_CART, "[1,2]").unwrap();
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some("[1,2]"));

        storage.set(keys::GUEST_CART, "[]").unwrap();
        assert_eq!(storage.get(keys::GUEST_CART).unwrap().as_deref(), Some("[]"));

        storage.remove(keys::GUEST_CART).unwrap();
        assert_eq!(storage.get(keys::GUEST_CART).unwrap(), None);
        // Removing twice is fine
        storage.remove(keys::GUEST_CART).unwrap();
    }

    #[test]
    fn test_file_storage_survives_new_instance() {
        let dir = tempfile::tempdir().unwrap();
        FileStorage::new(dir.path()).set(keys::AUTH_TOKEN, "\"abc\"").unwrap();

        let reopened = FileStorage::new(dir.path());
        assert_eq!(reopened.get(keys::AUTH_TOKEN).unwrap().as_deref(), Some("\"abc\""));
    }

    #[test]
    fn test_file_storage_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        assert!(matches!(
            storage.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(storage.get(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_read_json_discards_corrupt_value() {
        let storage = MemoryStorage::new();
        storage.set(keys::GUEST_CART, "{not json").unwrap();

        let value: Option<Vec<u32>> = read_json(&storage, keys::GUEST_CART).unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_write_then_read_json() {
        let storage = MemoryStorage::new();
        write_json(&storage, keys::COMPARE_ITEMS, &vec![1_u32, 2, 3]).unwrap();

        let value: Option<Vec<u32>> = read_json(&storage, keys::COMPARE_ITEMS).unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
