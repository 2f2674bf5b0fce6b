//! Exporter: snapshot to versioned, checksummed file.
//!
//! Building the package is pure (collect, wrap, checksum); writing the file
//! is the only side effect and lives in [`Exporter::export_to_dir`].

use chrono::{DateTime, Utc};
use portkit_model::{Category, DataTypeRegistry};
use portkit_types::OwnerId;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::cache::{CacheManager, DataScope};
use crate::config::PortabilityConfig;
use crate::error::SyncResult;
use crate::package::{ExportMetadata, ExportPackage};

/// Pre-built export scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportPreset {
    /// Every exportable data type.
    All,
    /// Everything except server-derived caches.
    ConfigOnly,
    /// Chat data only.
    ConversationsOnly,
    PatentCacheOnly,
    OcrCacheOnly,
}

impl std::str::FromStr for ExportPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "all" => Ok(ExportPreset::All),
            "config" | "config-only" => Ok(ExportPreset::ConfigOnly),
            "conversations" | "conversations-only" => Ok(ExportPreset::ConversationsOnly),
            "patent" | "patent-cache" | "patent-cache-only" => Ok(ExportPreset::PatentCacheOnly),
            "ocr" | "ocr-cache" | "ocr-cache-only" => Ok(ExportPreset::OcrCacheOnly),
            _ => Err(format!(
                "Invalid export preset '{s}'. Use all, config-only, conversations-only, patent-cache-only or ocr-cache-only"
            )),
        }
    }
}

/// What an export covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportScope {
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
    /// Leave out server-derived caches (OCR, crawl, patent).
    pub exclude_large_caches: bool,
}

impl ExportScope {
    /// Builds the include/exclude lists for a preset.
    pub fn preset(preset: ExportPreset, registry: &DataTypeRegistry) -> Self {
        match preset {
            ExportPreset::All => Self::default(),
            ExportPreset::ConfigOnly => Self {
                exclude_large_caches: true,
                ..Self::default()
            },
            ExportPreset::ConversationsOnly => Self {
                include: Some(registry.type_keys_in(&[Category::Chat])),
                ..Self::default()
            },
            ExportPreset::PatentCacheOnly => Self {
                include: Some(registry.type_keys_in(&[Category::PatentCache])),
                ..Self::default()
            },
            ExportPreset::OcrCacheOnly => Self {
                include: Some(registry.type_keys_in(&[Category::OcrCache])),
                ..Self::default()
            },
        }
    }

    /// Resolves the scope to the type-level filter used for collection.
    pub fn resolve(&self, registry: &DataTypeRegistry) -> DataScope {
        let mut exclude = self.exclude.clone();
        if self.exclude_large_caches {
            exclude.extend(
                registry
                    .exportable()
                    .filter(|d| d.category.is_server_cache())
                    .map(|d| d.key.clone()),
            );
        }
        DataScope {
            include: self.include.clone(),
            exclude,
        }
    }
}

/// Where an export was written and what it contained.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub checksum: String,
    pub total_items: usize,
    pub total_size: String,
}

/// Builds and writes export files.
pub struct Exporter<'a> {
    cache: &'a CacheManager,
    config: &'a PortabilityConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(cache: &'a CacheManager, config: &'a PortabilityConfig) -> Self {
        Self { cache, config }
    }

    /// Collects, wraps and checksums the data admitted by `scope`.
    pub fn build_package(&self, scope: &ExportScope) -> SyncResult<ExportPackage> {
        self.build_package_at(scope, Utc::now())
    }

    /// [`build_package`](Self::build_package) with an explicit export time.
    pub fn build_package_at(&self, scope: &ExportScope, now: DateTime<Utc>) -> SyncResult<ExportPackage> {
        let owner = self.cache.owner()?;
        let collected = self
            .cache
            .collect_all_data(&scope.resolve(self.cache.registry()))?;
        if !collected.skipped.is_empty() {
            warn!(
                "export skipped {} unreadable keys: {:?}",
                collected.skipped.len(),
                collected.skipped
            );
        }

        let mut package = ExportPackage {
            version: self.config.format_version.clone(),
            export_time: now.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            export_timestamp: now.timestamp_millis(),
            username: owner.to_string(),
            checksum: None,
            data: collected.snapshot.to_data(),
            metadata: ExportMetadata::from_stats(&collected.stats, &self.config.app_version),
        };
        package.seal()?;
        Ok(package)
    }

    /// The file name an export gets: `<prefix>_<owner>_<date>_<time>.json`.
    pub fn file_name(&self, owner: &OwnerId, at: DateTime<Utc>) -> String {
        format!(
            "{}_{}_{}.json",
            self.config.file_prefix,
            owner.file_safe(),
            at.format("%Y-%m-%d_%H-%M-%S")
        )
    }

    /// Builds a package and writes it into `dir`.
    pub fn export_to_dir(&self, scope: &ExportScope, dir: impl AsRef<Path>) -> SyncResult<ExportOutcome> {
        let now = Utc::now();
        let package = self.build_package_at(scope, now)?;
        let owner = self.cache.owner()?;
        let path = dir.as_ref().join(self.file_name(owner, now));
        std::fs::write(&path, package.to_json_pretty()?)?;

        let checksum = package.checksum.clone().unwrap_or_default();
        info!(
            "exported {} items ({}) to {} [checksum {}]",
            package.metadata.total_items,
            package.metadata.total_size,
            path.display(),
            checksum
        );
        Ok(ExportOutcome {
            path,
            checksum,
            total_items: package.metadata.total_items,
            total_size: package.metadata.total_size,
        })
    }
}
