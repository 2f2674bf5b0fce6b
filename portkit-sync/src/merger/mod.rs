//! Merger: pure reconciliation of a live snapshot with an imported one.
//!
//! Never touches storage: [`Merger::diff`] classifies keys for previews and
//! [`Merger::merge`] returns the merged snapshot for the importer to commit.
//!
//! Per key, a key present on one side only is copied through (import-only
//! keys count as added, local-only keys as skipped). A key present on both
//! sides is resolved by the [`MergeStrategy`]:
//!
//! | strategy | overlap |
//! |---|---|
//! | `Smart` | newer timestamp wins; tie with different content → imported |
//! | `KeepLocal` | local |
//! | `KeepImport` | imported (built-in personas kept) |
//! | `AddNew` | local, regardless of timestamps |
//!
//! Under `Smart`, conversation lists, persona maps and template lists are
//! reconciled entry by entry (see `structured`). Under `KeepImport`, persona
//! maps are replaced except for built-in presets. Identical values are
//! always left alone, which makes `Smart` idempotent.

mod diff;
mod structured;

pub use diff::{DiffCounts, DiffItem, DiffReport, DiffStatus};

use portkit_model::{Category, DataTypeRegistry, MergeStrategy, Record, RecordShape, Snapshot, item_timestamp};
use portkit_types::RecordTimestamp;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use tracing::debug;

/// Why an overlapping or local-only key kept its local value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Present locally only.
    LocalOnly,
    /// Same content on both sides.
    Identical,
    /// Local record is newer.
    LocalNewer,
    /// Strategy keeps local values on overlap.
    KeptLocal,
    /// Strategy only adds new keys.
    NotNew,
    /// The import only touched built-in presets.
    Protected,
}

/// What happened to one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum MergeOutcome {
    Added,
    Updated,
    Skipped(SkipReason),
}

/// Outcome of one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeDetail {
    pub category: Category,
    pub key: String,
    pub outcome: MergeOutcome,
    /// Equal timestamps with different content, for the record or one of
    /// its entries.
    pub conflict: bool,
}

/// Merge tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    pub conflicts: usize,
}

/// The merged snapshot plus per-key outcomes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeResult {
    pub merged: Snapshot,
    pub stats: MergeStats,
    pub details: Vec<MergeDetail>,
}

impl MergeResult {
    fn record(&mut self, category: Category, key: &str, outcome: MergeOutcome, conflict: bool) {
        match outcome {
            MergeOutcome::Added => self.stats.added += 1,
            MergeOutcome::Updated => self.stats.updated += 1,
            MergeOutcome::Skipped(_) => self.stats.skipped += 1,
        }
        if conflict {
            self.stats.conflicts += 1;
        }
        self.details.push(MergeDetail {
            category,
            key: key.to_string(),
            outcome,
            conflict,
        });
    }
}

/// Reconciles snapshots under one strategy.
pub struct Merger<'r> {
    registry: &'r DataTypeRegistry,
    strategy: MergeStrategy,
    now: RecordTimestamp,
}

impl<'r> Merger<'r> {
    pub fn new(registry: &'r DataTypeRegistry, strategy: MergeStrategy) -> Self {
        Self {
            registry,
            strategy,
            now: RecordTimestamp::now(),
        }
    }

    /// Fixes the clock used to suffix renamed template ids.
    #[must_use]
    pub fn with_clock(mut self, now: RecordTimestamp) -> Self {
        self.now = now;
        self
    }

    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    fn shape_of(&self, key: &str) -> RecordShape {
        self.registry
            .descriptor_for_key(key)
            .map(|d| d.shape)
            .unwrap_or_default()
    }

    fn timestamp_of(&self, key: &str, value: &Value) -> RecordTimestamp {
        match self.registry.descriptor_for_key(key) {
            Some(d) => Record::new(d.shape, value).timestamp(),
            None => item_timestamp(value),
        }
    }

    /// Classifies every key on both sides.
    pub fn diff(&self, local: &Snapshot, imported: &Snapshot) -> DiffReport {
        let mut report = DiffReport::default();
        for (category, key) in union_keys(local, imported) {
            let local_value = local.get(category, &key);
            let import_value = imported.get(category, &key);
            let local_ts = local_value.map(|v| self.timestamp_of(&key, v));
            let import_ts = import_value.map(|v| self.timestamp_of(&key, v));

            let status = match (local_value, import_value) {
                (None, Some(_)) => DiffStatus::Added,
                (Some(_), None) => DiffStatus::LocalOnly,
                (Some(l), Some(i)) if l == i => DiffStatus::Unchanged,
                (Some(_), Some(_)) => match import_ts.cmp(&local_ts) {
                    Ordering::Greater => DiffStatus::Newer,
                    Ordering::Less => DiffStatus::Older,
                    Ordering::Equal => DiffStatus::Conflict,
                },
                (None, None) => continue,
            };
            report.push(DiffItem {
                category,
                key,
                status,
                local_timestamp: local_ts,
                import_timestamp: import_ts,
            });
        }
        debug!(
            "diff: {} added, {} newer, {} older, {} conflicts, {} unchanged, {} local-only",
            report.totals.added,
            report.totals.newer,
            report.totals.older,
            report.totals.conflict,
            report.totals.unchanged,
            report.totals.local_only
        );
        report
    }

    /// Merges `imported` into `local`.
    pub fn merge(&self, local: &Snapshot, imported: &Snapshot) -> MergeResult {
        let mut result = MergeResult::default();

        for (category, key) in union_keys(local, imported) {
            match (local.get(category, &key), imported.get(category, &key)) {
                (Some(l), None) => {
                    result.merged.insert(category, key.clone(), l.clone());
                    result.record(category, &key, MergeOutcome::Skipped(SkipReason::LocalOnly), false);
                }
                (None, Some(i)) => {
                    result.merged.insert(category, key.clone(), i.clone());
                    result.record(category, &key, MergeOutcome::Added, false);
                }
                (Some(l), Some(i)) => {
                    let (value, outcome, conflict) = self.resolve(&key, l, i);
                    result.merged.insert(category, key.clone(), value);
                    result.record(category, &key, outcome, conflict);
                }
                (None, None) => {}
            }
        }

        debug!(
            "merge ({}): {} added, {} updated, {} skipped, {} conflicts",
            self.strategy,
            result.stats.added,
            result.stats.updated,
            result.stats.skipped,
            result.stats.conflicts
        );
        result
    }

    /// Resolves a key present on both sides.
    fn resolve(&self, key: &str, local: &Value, imported: &Value) -> (Value, MergeOutcome, bool) {
        if local == imported {
            return (local.clone(), MergeOutcome::Skipped(SkipReason::Identical), false);
        }
        match self.strategy {
            MergeStrategy::KeepLocal => {
                (local.clone(), MergeOutcome::Skipped(SkipReason::KeptLocal), false)
            }
            MergeStrategy::AddNew => (local.clone(), MergeOutcome::Skipped(SkipReason::NotNew), false),
            MergeStrategy::KeepImport => match structured::replace_structured(self.shape_of(key), local, imported) {
                Some((merged, tally)) => structured_outcome(local, merged, tally),
                None => (imported.clone(), MergeOutcome::Updated, false),
            },
            MergeStrategy::Smart => self.resolve_smart(key, local, imported),
        }
    }

    fn resolve_smart(&self, key: &str, local: &Value, imported: &Value) -> (Value, MergeOutcome, bool) {
        if let Some((merged, tally)) = structured::merge_structured(self.shape_of(key), local, imported, self.now) {
            return structured_outcome(local, merged, tally);
        }

        let local_ts = self.timestamp_of(key, local);
        let import_ts = self.timestamp_of(key, imported);
        match import_ts.cmp(&local_ts) {
            Ordering::Greater => (imported.clone(), MergeOutcome::Updated, false),
            Ordering::Less => (local.clone(), MergeOutcome::Skipped(SkipReason::LocalNewer), false),
            // Equal times, different content: the import wins. This bias is a
            // product convention pending confirmation.
            Ordering::Equal => (imported.clone(), MergeOutcome::Updated, true),
        }
    }
}

/// Outcome of an entry-level merge. A conflict is reported only when an
/// entry tie was actually resolved for the import.
fn structured_outcome(local: &Value, merged: Value, tally: structured::EntryTally) -> (Value, MergeOutcome, bool) {
    if &merged == local {
        let reason = if tally.protected > 0 {
            SkipReason::Protected
        } else if tally.local_newer > 0 {
            SkipReason::LocalNewer
        } else {
            SkipReason::Identical
        };
        return (merged, MergeOutcome::Skipped(reason), false);
    }
    (merged, MergeOutcome::Updated, tally.ties > 0)
}

/// Every `(category, key)` present on either side, sorted.
fn union_keys(local: &Snapshot, imported: &Snapshot) -> BTreeSet<(Category, String)> {
    local
        .iter()
        .chain(imported.iter())
        .map(|(cat, key, _)| (cat, key.to_string()))
        .collect()
}
