//! The export envelope.
//!
//! An export file is one JSON object: version, export time (ISO-8601 and
//! epoch ms of the same instant), the exporting account, a checksum, the
//! categorized data and some metadata. Only `data` is covered by the
//! checksum, so re-exporting unchanged data yields the same checksum no
//! matter when or by which app version it was written.

use portkit_model::SnapshotData;
use portkit_types::{Fingerprint, format_size};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::cache::CacheStats;
use crate::error::SyncResult;

/// Envelope version written by this crate.
pub const FORMAT_VERSION: &str = "1.0";

/// Per-category totals recorded in export metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryMetadata {
    pub items: usize,
    /// Human-readable size, e.g. `"1.5 KB"`. A bare byte count is
    /// formatted on read.
    #[serde(deserialize_with = "size_text")]
    pub size: String,
    pub size_bytes: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeField {
    Text(String),
    Bytes(u64),
}

fn size_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match SizeField::deserialize(deserializer)? {
        SizeField::Text(text) => text,
        SizeField::Bytes(bytes) => format_size(bytes),
    })
}

/// Metadata is descriptive only, so an unreadable block is replaced by
/// defaults instead of failing the whole envelope.
fn lenient_metadata<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ExportMetadata, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        warn!("ignoring unreadable export metadata: {}", e);
        ExportMetadata::default()
    }))
}

/// Descriptive metadata. Not covered by the checksum.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportMetadata {
    pub total_items: usize,
    /// Human-readable total size.
    pub total_size: String,
    pub total_size_bytes: u64,
    pub categories: BTreeMap<String, CategoryMetadata>,
    pub app_version: String,
}

impl ExportMetadata {
    /// Builds metadata from collection stats.
    pub fn from_stats(stats: &CacheStats, app_version: &str) -> Self {
        Self {
            total_items: stats.total_items,
            total_size: stats.size_display(),
            total_size_bytes: stats.total_size_bytes,
            categories: stats
                .categories
                .iter()
                .map(|(cat, s)| {
                    (
                        cat.as_str().to_string(),
                        CategoryMetadata {
                            items: s.items,
                            size: s.size_display(),
                            size_bytes: s.size_bytes,
                        },
                    )
                })
                .collect(),
            app_version: app_version.to_string(),
        }
    }
}

/// A versioned, checksummed export.
///
/// Missing fields deserialize to empty values so the importer can report
/// exactly which one is absent instead of a generic parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPackage {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub export_time: String,
    #[serde(default)]
    pub export_timestamp: i64,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub data: SnapshotData,
    #[serde(default, deserialize_with = "lenient_metadata")]
    pub metadata: ExportMetadata,
}

impl ExportPackage {
    /// Number of records carried.
    pub fn item_count(&self) -> usize {
        self.data.values().map(BTreeMap::len).sum()
    }

    /// Recomputes the checksum of `data`.
    pub fn compute_checksum(&self) -> SyncResult<String> {
        compute_checksum(&self.data)
    }

    /// Recomputes and stores the checksum.
    pub fn seal(&mut self) -> SyncResult<()> {
        self.checksum = Some(self.compute_checksum()?);
        Ok(())
    }

    /// Serializes the envelope for writing to a file.
    pub fn to_json_pretty(&self) -> SyncResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Checksum of an envelope's `data`: the rolling-hash fingerprint of its
/// compact JSON serialization.
pub fn compute_checksum(data: &SnapshotData) -> SyncResult<String> {
    Ok(Fingerprint::of_json(data)?.to_string())
}
