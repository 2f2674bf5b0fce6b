//! In-memory storage backend.

use crate::{StorageAdapter, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Namespaces = BTreeMap<String, BTreeMap<String, String>>;

/// Process-local store, optionally capped by a byte quota.
///
/// The quota mimics browser storage limits: a write that would push the
/// namespace's total (key + value, two bytes per UTF-16 unit) past the cap
/// fails with [`StorageError::QuotaExceeded`] and leaves the store untouched.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: Mutex<Namespaces>,
    quota_bytes: Option<u64>,
}

impl MemoryStorage {
    /// Creates an empty, unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store capped at `quota_bytes` per namespace.
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    /// Number of keys stored in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.data
            .lock()
            .map(|d| d.get(namespace).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    /// Returns true if the namespace holds no keys.
    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    fn entry_cost(key: &str, value: &str) -> u64 {
        (key.encode_utf16().count() + value.encode_utf16().count()) as u64 * 2
    }
}

impl StorageAdapter for MemoryStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn get_raw(&self, namespace: &str, key: &str) -> StorageResult<Option<String>> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data.get(namespace).and_then(|ns| ns.get(key)).cloned())
    }

    fn set_raw(&self, namespace: &str, key: &str, value: &str) -> StorageResult<()> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        let ns = data.entry(namespace.to_string()).or_default();

        if let Some(quota) = self.quota_bytes {
            let used: u64 = ns
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| Self::entry_cost(k, v))
                .sum();
            let needed = Self::entry_cost(key, value);
            if used + needed > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available: quota.saturating_sub(used),
                });
            }
        }

        ns.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str, key: &str) -> StorageResult<bool> {
        let mut data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data
            .get_mut(namespace)
            .map(|ns| ns.remove(key).is_some())
            .unwrap_or(false))
    }

    fn keys(&self, namespace: &str) -> StorageResult<Vec<String>> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data
            .get(namespace)
            .map(|ns| ns.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn keys_with_prefix(&self, namespace: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let data = self.data.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(data
            .get(namespace)
            .map(|ns| {
                ns.range(prefix.to_string()..)
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
