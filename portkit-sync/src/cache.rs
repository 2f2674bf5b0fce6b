//! Cache manager: the façade over registry and storage.
//!
//! Every storage call the engine makes goes through here. The manager is an
//! explicit session object: build one per signed-in account, bind it with
//! [`CacheManager::initialize`], and pass it by reference to the exporter
//! and importer.

use portkit_model::{Category, DataTypeDescriptor, DataTypeRegistry, Snapshot};
use portkit_storage::StorageAdapter;
use portkit_types::{OwnerId, format_size, utf16_size_estimate};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::events::{CacheEvent, CacheEventHandler, ChangeAction, EventBus};

/// Which registered data types an operation covers.
///
/// `include` restricts to the listed type keys when set; `exclude` always
/// removes the listed type keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataScope {
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl DataScope {
    /// Every registered type.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Only the given type keys.
    pub fn only<I, S>(type_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            include: Some(type_keys.into_iter().map(Into::into).collect()),
            exclude: Vec::new(),
        }
    }

    /// Adds type keys to the exclusion list.
    #[must_use]
    pub fn excluding<I, S>(mut self, type_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(type_keys.into_iter().map(Into::into));
        self
    }

    /// Returns true if the scope covers the given type key.
    pub fn admits(&self, type_key: &str) -> bool {
        if self.exclude.iter().any(|k| k == type_key) {
            return false;
        }
        match &self.include {
            Some(include) => include.iter().any(|k| k == type_key),
            None => true,
        }
    }
}

/// Item count and estimated size of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub items: usize,
    pub size_bytes: u64,
}

impl CategoryStats {
    /// Size formatted for display.
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Aggregate counts over a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_items: usize,
    pub total_size_bytes: u64,
    pub categories: BTreeMap<Category, CategoryStats>,
}

impl CacheStats {
    fn record(&mut self, category: Category, size_bytes: u64) {
        let entry = self.categories.entry(category).or_default();
        entry.items += 1;
        entry.size_bytes += size_bytes;
        self.total_items += 1;
        self.total_size_bytes += size_bytes;
    }

    /// Total size formatted for display.
    pub fn size_display(&self) -> String {
        format_size(self.total_size_bytes)
    }
}

/// Result of [`CacheManager::collect_all_data`].
#[derive(Debug, Clone, Default)]
pub struct CollectedData {
    pub snapshot: Snapshot,
    pub stats: CacheStats,
    /// Keys that could not be read and were left out.
    pub skipped: Vec<String>,
}

/// Tally of a snapshot commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitStats {
    pub saved: usize,
    pub failed: usize,
    pub failed_keys: Vec<String>,
}

/// Registry + storage façade bound to one account.
pub struct CacheManager {
    registry: Arc<DataTypeRegistry>,
    storage: Arc<dyn StorageAdapter>,
    owner: Option<OwnerId>,
    events: EventBus,
    /// Held while an import writes its merged snapshot.
    commit_lock: Mutex<()>,
}

impl CacheManager {
    /// Creates an unbound manager. Every data operation fails with
    /// [`SyncError::NotInitialized`] until [`initialize`](Self::initialize) is called.
    pub fn new(registry: Arc<DataTypeRegistry>, storage: Arc<dyn StorageAdapter>) -> Self {
        Self {
            registry,
            storage,
            owner: None,
            events: EventBus::new(),
            commit_lock: Mutex::new(()),
        }
    }

    /// Binds the manager to an account's storage namespace.
    pub fn initialize(&mut self, owner: OwnerId) {
        info!(
            "cache manager bound to {} ({} backend)",
            owner,
            self.storage.backend_name()
        );
        let event = CacheEvent::Initialized {
            owner: owner.to_string(),
        };
        self.owner = Some(owner);
        self.events.emit(&event);
    }

    /// Returns true once bound to an account.
    pub fn is_initialized(&self) -> bool {
        self.owner.is_some()
    }

    /// The bound account.
    pub fn owner(&self) -> SyncResult<&OwnerId> {
        self.owner.as_ref().ok_or(SyncError::NotInitialized)
    }

    /// The registry this manager collects from.
    pub fn registry(&self) -> &DataTypeRegistry {
        &self.registry
    }

    /// Registers an event handler.
    pub fn subscribe(&self, handler: Arc<dyn CacheEventHandler>) {
        self.events.subscribe(handler);
    }

    fn namespace(&self) -> SyncResult<&str> {
        Ok(self.owner()?.as_str())
    }

    // ── Pass-through operations ──────────────────────────────────

    /// Reads the JSON value at `key`.
    pub fn get(&self, key: &str) -> SyncResult<Option<Value>> {
        let ns = self.namespace()?;
        Ok(self.storage.get_value(ns, key)?)
    }

    /// Writes a JSON value at `key` and emits `DataChanged`.
    pub fn set(&self, key: &str, value: &Value) -> SyncResult<()> {
        let ns = self.namespace()?;
        self.storage.set_value(ns, key, value)?;
        self.events.emit(&CacheEvent::DataChanged {
            key: key.to_string(),
            action: ChangeAction::Set,
        });
        Ok(())
    }

    /// Removes `key`. Returns true if it existed; only then is
    /// `DataChanged` emitted.
    pub fn remove(&self, key: &str) -> SyncResult<bool> {
        let ns = self.namespace()?;
        let existed = self.storage.remove(ns, key)?;
        if existed {
            self.events.emit(&CacheEvent::DataChanged {
                key: key.to_string(),
                action: ChangeAction::Remove,
            });
        }
        Ok(existed)
    }

    /// Returns true if `key` exists.
    pub fn has(&self, key: &str) -> SyncResult<bool> {
        let ns = self.namespace()?;
        Ok(self.storage.has(ns, key)?)
    }

    // ── Collection ───────────────────────────────────────────────

    /// Reads one registered data type: its single key, or every key of its
    /// prefix family. Unreadable keys are logged and left out.
    pub fn collect_data_type(&self, type_key: &str) -> SyncResult<BTreeMap<String, Value>> {
        let descriptor = self.registry.require(type_key)?;
        let mut skipped = Vec::new();
        self.collect_descriptor(descriptor, &mut skipped)
    }

    fn collect_descriptor(
        &self,
        descriptor: &DataTypeDescriptor,
        skipped: &mut Vec<String>,
    ) -> SyncResult<BTreeMap<String, Value>> {
        let ns = self.namespace()?;
        let keys = if descriptor.is_prefix {
            match self.storage.keys_with_prefix(ns, &descriptor.key) {
                Ok(keys) => keys,
                Err(e) => {
                    warn!("skipping data type {}: prefix scan failed: {}", descriptor.key, e);
                    skipped.push(descriptor.key.clone());
                    return Ok(BTreeMap::new());
                }
            }
        } else {
            vec![descriptor.key.clone()]
        };

        let mut records = BTreeMap::new();
        for key in keys {
            match self.storage.get_value(ns, &key) {
                Ok(Some(value)) => {
                    records.insert(key, value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("skipping unreadable key {}: {}", key, e);
                    skipped.push(key);
                }
            }
        }
        Ok(records)
    }

    /// Collects every exportable data type admitted by `scope` into a
    /// categorized snapshot, with per-category counts and size estimates.
    ///
    /// A record that fails to read is skipped and listed in
    /// [`CollectedData::skipped`]; the collection itself still succeeds.
    pub fn collect_all_data(&self, scope: &DataScope) -> SyncResult<CollectedData> {
        self.namespace()?;
        let mut collected = CollectedData::default();

        for descriptor in self.registry.exportable() {
            if !scope.admits(&descriptor.key) {
                continue;
            }
            let records = self.collect_descriptor(descriptor, &mut collected.skipped)?;
            for (key, value) in records {
                let size = match serde_json::to_string(&value) {
                    Ok(text) => utf16_size_estimate(&text),
                    Err(e) => {
                        warn!("skipping unserializable key {}: {}", key, e);
                        collected.skipped.push(key);
                        continue;
                    }
                };
                collected.stats.record(descriptor.category, size);
                collected.snapshot.insert(descriptor.category, key, value);
            }
        }

        debug!(
            "collected {} items ({}) across {} categories, {} skipped",
            collected.stats.total_items,
            collected.stats.size_display(),
            collected.stats.categories.len(),
            collected.skipped.len()
        );
        Ok(collected)
    }

    /// Counts and sizes of everything exportable.
    pub fn stats(&self) -> SyncResult<CacheStats> {
        Ok(self.collect_all_data(&DataScope::everything())?.stats)
    }

    /// Per-category counts and sizes of everything exportable.
    pub fn category_stats(&self) -> SyncResult<BTreeMap<Category, CategoryStats>> {
        Ok(self.stats()?.categories)
    }

    // ── Bulk deletion ────────────────────────────────────────────

    /// Removes every key of one data type. Returns the number removed.
    pub fn clear_data_type(&self, type_key: &str) -> SyncResult<usize> {
        let descriptor = self.registry.require(type_key)?;
        let count = self.clear_descriptor(descriptor)?;
        info!("cleared {} keys of {}", count, type_key);
        self.events.emit(&CacheEvent::DataCleared {
            type_key: type_key.to_string(),
            count,
        });
        Ok(count)
    }

    /// Removes every key of every exportable data type. Private types are kept.
    pub fn clear_all_data(&self) -> SyncResult<usize> {
        self.namespace()?;
        let mut count = 0;
        for descriptor in self.registry.exportable() {
            count += self.clear_descriptor(descriptor)?;
        }
        info!("cleared {} keys across all data types", count);
        self.events.emit(&CacheEvent::AllDataCleared { count });
        Ok(count)
    }

    fn clear_descriptor(&self, descriptor: &DataTypeDescriptor) -> SyncResult<usize> {
        let ns = self.namespace()?;
        let keys = if descriptor.is_prefix {
            self.storage.keys_with_prefix(ns, &descriptor.key)?
        } else {
            vec![descriptor.key.clone()]
        };
        let mut removed = 0;
        for key in keys {
            match self.storage.remove(ns, &key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => warn!("failed to remove {}: {}", key, e),
            }
        }
        Ok(removed)
    }

    // ── Commit ───────────────────────────────────────────────────

    /// Writes every record of a snapshot back to storage.
    ///
    /// Records whose key resolves to no exportable data type are refused.
    /// Individual write failures are tallied, not propagated.
    pub fn commit_snapshot(&self, snapshot: &Snapshot) -> SyncResult<CommitStats> {
        self.namespace()?;
        let _guard = self
            .commit_lock
            .lock()
            .map_err(|_| SyncError::LockPoisoned("commit"))?;

        let mut stats = CommitStats::default();
        for (_, key, value) in snapshot.iter() {
            let writable = self
                .registry
                .descriptor_for_key(key)
                .is_some_and(|d| d.exportable);
            if !writable {
                warn!("refusing to write unregistered key {}", key);
                stats.failed += 1;
                stats.failed_keys.push(key.to_string());
                continue;
            }
            match self.set(key, value) {
                Ok(()) => stats.saved += 1,
                Err(e) => {
                    warn!("failed to save {}: {}", key, e);
                    stats.failed += 1;
                    stats.failed_keys.push(key.to_string());
                }
            }
        }
        Ok(stats)
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("owner", &self.owner)
            .field("backend", &self.storage.backend_name())
            .field("types", &self.registry.descriptors().len())
            .field("events", &self.events)
            .finish()
    }
}
