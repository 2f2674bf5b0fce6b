//! Namespaced key-value storage for portkit.
//!
//! The portability engine never talks to a database directly: it goes through
//! [`StorageAdapter`], a small get/set/remove/prefix-scan contract over string
//! values, partitioned by an account namespace. Two implementations ship here:
//!
//! - [`MemoryStorage`]: process-local, used by tests and throwaway sessions
//! - [`SqliteStorage`]: persistent, one row per `(namespace, key)`
//!
//! Values are stored as JSON text. The typed helpers [`StorageJsonExt::get_json`]
//! and [`StorageJsonExt::set_json`] wrap the raw calls.

mod error;
mod memory;
mod sqlite;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStorage;
pub use sqlite::SqliteStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// A namespaced key-value store.
///
/// Every method takes the owning account's namespace; implementations must
/// never let one namespace observe another's keys.
pub trait StorageAdapter: Send + Sync {
    /// Short backend name for logging.
    fn backend_name(&self) -> &'static str;

    /// Reads the raw string stored at `key`.
    fn get_raw(&self, namespace: &str, key: &str) -> StorageResult<Option<String>>;

    /// Writes a raw string at `key`, replacing any previous value.
    fn set_raw(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Returns true if it existed.
    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool>;

    /// Lists every key in the namespace, sorted.
    fn keys(&self, namespace: &str) -> StorageResult<Vec<String>>;

    /// Returns true if `key` exists.
    fn has(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        Ok(self.get_raw(namespace, key)?.is_some())
    }

    /// Lists the keys starting with `prefix`, sorted.
    fn keys_with_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys(namespace)?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }

    /// Reads and parses the JSON value at `key`.
    fn get_value(&self, namespace: &str, key: &str) -> StorageResult<Option<serde_json::Value>> {
        match self.get_raw(namespace, key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| StorageError::Corrupt {
                    key: key.to_string(),
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    /// Serializes and writes a JSON value at `key`.
    fn set_value(&self, namespace: &str, key: &str, value: &serde_json::Value) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(namespace, key, &raw)
    }
}

/// Typed JSON helpers over any [`StorageAdapter`].
pub trait StorageJsonExt: StorageAdapter {
    /// Reads and deserializes the value at `key`.
    fn get_json<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> StorageResult<Option<T>> {
        match self.get_value(namespace, key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serializes and writes `value` at `key`.
    fn set_json<T: Serialize + ?Sized>(&self, namespace: &str, key: &str, value: &T) -> StorageResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(namespace, key, &raw)
    }
}

impl<S: StorageAdapter + ?Sized> StorageJsonExt for S {}
