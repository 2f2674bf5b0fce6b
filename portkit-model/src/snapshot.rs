//! Categorized snapshots of stored records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::Category;

/// Wire form of a snapshot: category name → (key → value).
///
/// This is what export files carry and what the checksum covers. Keys are
/// sorted at both levels, so serializing the same data always yields the
/// same text.
pub type SnapshotData = BTreeMap<String, BTreeMap<String, Value>>;

/// Category → (storage key → record), read from storage at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    categories: BTreeMap<Category, BTreeMap<String, Value>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record, returning the previous value at that key.
    pub fn insert(&mut self, category: Category, key: impl Into<String>, value: Value) -> Option<Value> {
        self.categories
            .entry(category)
            .or_default()
            .insert(key.into(), value)
    }

    pub fn get(&self, category: Category, key: &str) -> Option<&Value> {
        self.categories.get(&category).and_then(|c| c.get(key))
    }

    pub fn remove(&mut self, category: Category, key: &str) -> Option<Value> {
        let removed = self.categories.get_mut(&category)?.remove(key);
        if self.categories.get(&category).is_some_and(BTreeMap::is_empty) {
            self.categories.remove(&category);
        }
        removed
    }

    /// Records of one category.
    pub fn category(&self, category: Category) -> Option<&BTreeMap<String, Value>> {
        self.categories.get(&category)
    }

    /// Categories holding at least one record.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        self.categories.keys().copied()
    }

    /// Iterates `(category, key, value)` over every record.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &str, &Value)> {
        self.categories
            .iter()
            .flat_map(|(cat, records)| records.iter().map(move |(k, v)| (*cat, k.as_str(), v)))
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts to the wire form carried by export files.
    pub fn to_data(&self) -> SnapshotData {
        self.categories
            .iter()
            .map(|(cat, records)| (cat.as_str().to_string(), records.clone()))
            .collect()
    }
}

impl FromIterator<(Category, String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (Category, String, Value)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (cat, key, value) in iter {
            snapshot.insert(cat, key, value);
        }
        snapshot
    }
}
