//! Export, import and merge engine for portkit.
//!
//! Lets a user move everything the workbench keeps in per-user storage
//! (conversations, personas, prompt templates, server-derived caches) into
//! one portable file, and restore that file elsewhere without silently
//! destroying newer local work.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Cache manager**: the only component issuing storage calls; collects
//!   registered data types into categorized snapshots and emits change events
//! - **Exporter**: wraps a snapshot into a versioned, checksummed envelope
//! - **Importer**: validates an incoming envelope, diffs it against live data
//!   and commits the merged result back through the cache manager
//! - **Merger**: pure reconciliation; never touches storage
//!
//! ## Import pipeline
//!
//! 1. **Read**: file extension and size ceiling are checked before reading
//! 2. **Parse**: the text must deserialize as an envelope
//! 3. **Validate**: supported version, owner present, non-empty data;
//!    checksum and owner mismatches become warnings, not failures
//! 4. **Diff**: every key on both sides is classified
//! 5. **Merge**: the selected [`MergeStrategy`] resolves overlapping keys
//! 6. **Save**: every merged leaf is written back, failures are tallied
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use portkit_model::DataTypeRegistry;
//! use portkit_storage::MemoryStorage;
//! use portkit_sync::{CacheManager, ExportPreset, ExportScope, Exporter, PortabilityConfig};
//! use portkit_types::OwnerId;
//!
//! let registry = Arc::new(DataTypeRegistry::builtin());
//! let mut cache = CacheManager::new(registry.clone(), Arc::new(MemoryStorage::new()));
//! cache.initialize(OwnerId::new("alice").unwrap());
//! cache.set("ui_theme", &serde_json::json!("dark")).unwrap();
//!
//! let config = PortabilityConfig::default();
//! let exporter = Exporter::new(&cache, &config);
//! let scope = ExportScope::preset(ExportPreset::All, &registry);
//! let package = exporter.build_package(&scope).unwrap();
//! assert_eq!(package.metadata.total_items, 1);
//! ```
//!
//! # Concurrency
//!
//! Everything but the file read runs synchronously. The cache manager holds
//! a commit lock while an import writes its merged snapshot, so two imports
//! into the same manager cannot interleave their writes. Separate managers
//! over the same account namespace are not coordinated.

mod cache;
mod config;
mod error;
mod events;
mod exporter;
mod importer;
pub mod merger;
mod package;
mod progress;

pub use cache::{CacheManager, CacheStats, CategoryStats, CollectedData, CommitStats, DataScope};
pub use config::PortabilityConfig;
pub use error::{ImportError, ImportWarning, SyncError, SyncResult};
pub use events::{CacheEvent, CacheEventHandler, ChangeAction, EventBus};
pub use exporter::{ExportOutcome, ExportPreset, ExportScope, Exporter};
pub use importer::{ImportOptions, ImportReport, Importer, PreviewReport};
pub use merger::{
    DiffCounts, DiffItem, DiffReport, DiffStatus, MergeDetail, MergeOutcome, MergeResult,
    MergeStats, Merger, SkipReason,
};
pub use package::{CategoryMetadata, ExportMetadata, ExportPackage, FORMAT_VERSION, compute_checksum};
pub use progress::{ImportProgress, ImportStage, NoopProgress, TracingProgress};

pub use portkit_model::MergeStrategy;
