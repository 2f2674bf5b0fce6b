//! Importer: validation, diff, merge and commit.
//!
//! Validation is fail-fast and happens before any storage access beyond
//! reading the live snapshot, so a rejected file never mutates anything.
//! Checksum and owner mismatches are soft: they surface as warnings on a
//! successful report.

use portkit_model::{Category, MergeStrategy, Snapshot, SnapshotData};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

use crate::cache::{CacheManager, CommitStats, DataScope};
use crate::config::PortabilityConfig;
use crate::error::{ImportError, ImportWarning, SyncResult};
use crate::merger::{DiffReport, MergeDetail, MergeStats, Merger};
use crate::package::ExportPackage;
use crate::progress::{ImportProgress, ImportStage, NoopProgress};

/// Caller choices for an import.
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub strategy: MergeStrategy,
    /// Types to consider, on both the live and the imported side.
    pub scope: DataScope,
}

impl ImportOptions {
    pub fn with_strategy(strategy: MergeStrategy) -> Self {
        Self {
            strategy,
            scope: DataScope::everything(),
        }
    }
}

/// Impact summary computed without writing anything.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub exported_by: String,
    pub export_time: String,
    pub version: String,
    pub item_count: usize,
    pub warnings: Vec<ImportWarning>,
    /// Imported keys that resolve to no registered type, or fall outside the scope.
    pub ignored_keys: Vec<String>,
    pub diff: DiffReport,
}

impl PreviewReport {
    pub fn owner_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ImportWarning::OwnerMismatch { .. }))
    }
}

/// Result of a committed import.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub strategy: MergeStrategy,
    pub exported_by: String,
    pub warnings: Vec<ImportWarning>,
    pub ignored_keys: Vec<String>,
    pub diff: DiffReport,
    pub merge: MergeStats,
    pub details: Vec<MergeDetail>,
    pub commit: CommitStats,
}

impl ImportReport {
    pub fn owner_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ImportWarning::OwnerMismatch { .. }))
    }

    pub fn checksum_valid(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|w| matches!(w, ImportWarning::ChecksumMismatch { .. }))
    }
}

/// A parsed, validated package narrowed to the registered types in scope.
struct Prepared {
    package: ExportPackage,
    warnings: Vec<ImportWarning>,
    imported: Snapshot,
    ignored_keys: Vec<String>,
    local: Snapshot,
}

/// Reads and applies export files.
pub struct Importer<'a> {
    cache: &'a CacheManager,
    config: &'a PortabilityConfig,
    progress: &'a dyn ImportProgress,
}

impl<'a> Importer<'a> {
    pub fn new(cache: &'a CacheManager, config: &'a PortabilityConfig) -> Self {
        Self {
            cache,
            config,
            progress: &NoopProgress,
        }
    }

    /// Reports stage transitions to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ImportProgress) -> Self {
        self.progress = progress;
        self
    }

    // ── Validation stages ────────────────────────────────────────

    /// File-level checks: extension and size ceiling.
    pub fn validate_file(&self, file_name: &str, size: u64) -> Result<(), ImportError> {
        if !self.config.accepts_extension(file_name) {
            return Err(ImportError::UnsupportedExtension {
                name: file_name.to_string(),
                expected: self
                    .config
                    .accepted_extensions
                    .iter()
                    .map(|e| format!(".{e}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
        if size > self.config.max_import_bytes {
            return Err(ImportError::FileTooLarge {
                size,
                limit: self.config.max_import_bytes,
            });
        }
        Ok(())
    }

    /// Parses the envelope.
    pub fn parse(&self, text: &str) -> Result<ExportPackage, ImportError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| ImportError::Malformed(e.to_string()))?;
        if !value.is_object() {
            return Err(ImportError::Malformed("top level is not an object".into()));
        }
        serde_json::from_value(value).map_err(|e| ImportError::Malformed(e.to_string()))
    }

    /// Format checks: version, owner, data.
    pub fn validate_format(&self, package: &ExportPackage) -> Result<(), ImportError> {
        if package.version.is_empty() {
            return Err(ImportError::MissingField("version"));
        }
        if !self.config.supported_versions.contains(&package.version) {
            return Err(ImportError::UnsupportedVersion(package.version.clone()));
        }
        if package.username.trim().is_empty() {
            return Err(ImportError::MissingField("username"));
        }
        if package.item_count() == 0 {
            return Err(ImportError::EmptyData);
        }
        Ok(())
    }

    /// Soft checks: checksum and owner. Never fails.
    pub fn soft_checks(&self, package: &ExportPackage, current_owner: &str) -> Vec<ImportWarning> {
        let mut warnings = Vec::new();
        match (&package.checksum, package.compute_checksum()) {
            (None, _) => {
                warn!("import file carries no checksum");
                warnings.push(ImportWarning::MissingChecksum);
            }
            (Some(expected), Ok(actual)) if *expected != actual => {
                warn!("checksum mismatch: file says {}, data hashes to {}", expected, actual);
                warnings.push(ImportWarning::ChecksumMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
            (Some(_), Ok(_)) => {}
            (Some(expected), Err(e)) => {
                warn!("could not recompute checksum: {}", e);
                warnings.push(ImportWarning::ChecksumMismatch {
                    expected: expected.clone(),
                    actual: String::new(),
                });
            }
        }
        if package.username != current_owner {
            warn!(
                "import file was exported by {}, importing into {}",
                package.username, current_owner
            );
            warnings.push(ImportWarning::OwnerMismatch {
                current: current_owner.to_string(),
                exported_by: package.username.clone(),
            });
        }
        warnings
    }

    /// Narrows imported data to registered, exportable types in scope,
    /// filing each key under its registered category.
    fn filter_imported(&self, data: &SnapshotData, scope: &DataScope) -> (Snapshot, Vec<String>) {
        let registry = self.cache.registry();
        let mut snapshot = Snapshot::new();
        let mut ignored = Vec::new();

        for (category_name, records) in data {
            for (key, value) in records {
                let descriptor = registry
                    .descriptor_for_key(key)
                    .filter(|d| d.exportable && scope.admits(&d.key));
                match descriptor {
                    Some(d) => {
                        if category_name.parse::<Category>().ok() != Some(d.category) {
                            warn!("re-filing {} from {} under {}", key, category_name, d.category);
                        }
                        snapshot.insert(d.category, key.clone(), value.clone());
                    }
                    None => ignored.push(key.clone()),
                }
            }
        }
        if !ignored.is_empty() {
            info!("ignoring {} imported keys outside the registry or scope", ignored.len());
        }
        (snapshot, ignored)
    }

    fn prepare(&self, text: &str, options: &ImportOptions) -> SyncResult<Prepared> {
        let owner = self.cache.owner()?.to_string();

        self.progress.on_stage(ImportStage::Parse);
        let package = self.parse(text)?;

        self.progress.on_stage(ImportStage::Validate);
        self.validate_format(&package)?;
        let warnings = self.soft_checks(&package, &owner);
        let (imported, ignored_keys) = self.filter_imported(&package.data, &options.scope);

        let local = self.cache.collect_all_data(&options.scope)?.snapshot;
        Ok(Prepared {
            package,
            warnings,
            imported,
            ignored_keys,
            local,
        })
    }

    // ── Entry points ─────────────────────────────────────────────

    /// Validates and diffs without writing anything.
    pub fn preview_str(&self, text: &str, options: &ImportOptions) -> SyncResult<PreviewReport> {
        let prepared = self.prepare(text, options)?;

        self.progress.on_stage(ImportStage::Diff);
        let merger = Merger::new(self.cache.registry(), options.strategy);
        let diff = merger.diff(&prepared.local, &prepared.imported);

        self.progress.on_stage(ImportStage::Done);
        Ok(PreviewReport {
            item_count: prepared.package.item_count(),
            exported_by: prepared.package.username,
            export_time: prepared.package.export_time,
            version: prepared.package.version,
            warnings: prepared.warnings,
            ignored_keys: prepared.ignored_keys,
            diff,
        })
    }

    /// Validates, merges and commits.
    pub fn import_str(&self, text: &str, options: &ImportOptions) -> SyncResult<ImportReport> {
        let prepared = self.prepare(text, options)?;
        let merger = Merger::new(self.cache.registry(), options.strategy);

        self.progress.on_stage(ImportStage::Diff);
        let diff = merger.diff(&prepared.local, &prepared.imported);

        self.progress.on_stage(ImportStage::Merge);
        let result = merger.merge(&prepared.local, &prepared.imported);

        self.progress.on_stage(ImportStage::Save);
        let commit = self.cache.commit_snapshot(&result.merged)?;

        self.progress.on_stage(ImportStage::Done);
        info!(
            "import ({}) from {}: {} added, {} updated, {} skipped, {} conflicts; {} saved, {} failed",
            options.strategy,
            prepared.package.username,
            result.stats.added,
            result.stats.updated,
            result.stats.skipped,
            result.stats.conflicts,
            commit.saved,
            commit.failed
        );
        Ok(ImportReport {
            strategy: options.strategy,
            exported_by: prepared.package.username,
            warnings: prepared.warnings,
            ignored_keys: prepared.ignored_keys,
            diff,
            merge: result.stats,
            details: result.details,
            commit,
        })
    }

    /// Reads a file after checking its extension and size.
    pub async fn read_file(&self, path: impl AsRef<Path>) -> SyncResult<String> {
        let path = path.as_ref();
        self.progress.on_stage(ImportStage::Read);

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ImportError::Unreadable(format!("{}: {e}", path.display())))?;
        self.validate_file(&file_name, metadata.len())?;

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ImportError::Unreadable(format!("{}: {e}", path.display())))?;
        Ok(text)
    }

    /// Reads a file and previews its import.
    pub async fn preview_file(&self, path: impl AsRef<Path>, options: &ImportOptions) -> SyncResult<PreviewReport> {
        self.cache.owner()?;
        let text = self.read_file(path).await?;
        self.preview_str(&text, options)
    }

    /// Reads a file and imports it.
    pub async fn import_file(&self, path: impl AsRef<Path>, options: &ImportOptions) -> SyncResult<ImportReport> {
        self.cache.owner()?;
        let text = self.read_file(path).await?;
        self.import_str(&text, options)
    }
}
