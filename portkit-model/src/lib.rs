//! Data type registry and record model for portkit.
//!
//! Defines the types every portability subsystem depends on:
//! - [`DataTypeDescriptor`]: one logical data type, with its storage key or
//!   prefix, display name, [`Category`], exportability and [`RecordShape`]
//! - [`DataTypeRegistry`]: the read-only catalog of descriptors; keys that
//!   resolve to no descriptor are invisible to export and import
//! - [`Record`]: a stored value tagged by shape, with explicit timestamp extraction
//! - [`Snapshot`]: category → key → value, derived on demand from storage
//! - [`MergeStrategy`]: how overlapping keys are reconciled on import

mod record;
mod registry;
mod schema;
mod snapshot;

pub use record::{Record, item_timestamp};
pub use registry::DataTypeRegistry;
pub use schema::{Category, DataTypeDescriptor, MergeStrategy, RecordShape};
pub use snapshot::{Snapshot, SnapshotData};

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("duplicate data type key: {0}")]
    DuplicateKey(String),

    #[error("key {key} is shadowed by prefix family {prefix}")]
    Shadowed { key: String, prefix: String },

    #[error("unknown data type: {0}")]
    UnknownType(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("unknown merge strategy: {0}")]
    UnknownStrategy(String),
}
