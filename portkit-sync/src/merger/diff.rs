//! Read-only comparison of a live snapshot against an imported one.

use portkit_model::Category;
use portkit_types::RecordTimestamp;
use serde::Serialize;
use std::collections::BTreeMap;

/// How one key compares across the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffStatus {
    /// Only in the import.
    Added,
    /// Only in local storage.
    LocalOnly,
    /// Same content on both sides.
    Unchanged,
    /// Imported record has the later timestamp.
    Newer,
    /// Imported record has the earlier timestamp.
    Older,
    /// Same timestamp, different content.
    Conflict,
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub added: usize,
    pub local_only: usize,
    pub unchanged: usize,
    pub newer: usize,
    pub older: usize,
    pub conflict: usize,
}

impl DiffCounts {
    pub(crate) fn record(&mut self, status: DiffStatus) {
        match status {
            DiffStatus::Added => self.added += 1,
            DiffStatus::LocalOnly => self.local_only += 1,
            DiffStatus::Unchanged => self.unchanged += 1,
            DiffStatus::Newer => self.newer += 1,
            DiffStatus::Older => self.older += 1,
            DiffStatus::Conflict => self.conflict += 1,
        }
    }

    /// Number of keys classified.
    pub fn total(&self) -> usize {
        self.added + self.local_only + self.unchanged + self.newer + self.older + self.conflict
    }

    /// Keys whose import would differ from what is stored.
    pub fn changes(&self) -> usize {
        self.added + self.newer + self.older + self.conflict
    }
}

/// Classification of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffItem {
    pub category: Category,
    pub key: String,
    pub status: DiffStatus,
    pub local_timestamp: Option<RecordTimestamp>,
    pub import_timestamp: Option<RecordTimestamp>,
}

/// Every key of both snapshots, classified, with rollups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffReport {
    pub totals: DiffCounts,
    pub categories: BTreeMap<Category, DiffCounts>,
    pub items: Vec<DiffItem>,
}

impl DiffReport {
    pub(crate) fn push(&mut self, item: DiffItem) {
        self.totals.record(item.status);
        self.categories
            .entry(item.category)
            .or_default()
            .record(item.status);
        self.items.push(item);
    }

    /// Items with the given status.
    pub fn with_status(&self, status: DiffStatus) -> impl Iterator<Item = &DiffItem> {
        self.items.iter().filter(move |i| i.status == status)
    }

    /// Returns true if importing would change nothing.
    pub fn is_noop(&self) -> bool {
        self.totals.changes() == 0
    }
}
