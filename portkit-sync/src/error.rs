//! Error types for the portability layer.

use serde::Serialize;
use thiserror::Error;

/// Result type for portability operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in portability operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The cache manager has not been bound to an account.
    #[error("cache manager is not initialized for an account")]
    NotInitialized,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] portkit_storage::StorageError),

    /// Registry lookup error.
    #[error("registry error: {0}")]
    Model(#[from] portkit_model::ModelError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The import file was rejected.
    #[error("import rejected: {0}")]
    Import(#[from] ImportError),

    /// IO error (export file writing, config loading).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock was poisoned by a panicking holder.
    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<portkit_types::Error> for SyncError {
    fn from(err: portkit_types::Error) -> Self {
        match err {
            portkit_types::Error::Serialization(e) => SyncError::Serialization(e),
            other => SyncError::Config(other.to_string()),
        }
    }
}

/// Validation failures for an incoming export file.
///
/// Raised before anything is written, so a rejected file never mutates storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    #[error("unsupported file type: {name} (expected {expected})")]
    UnsupportedExtension { name: String, expected: String },

    #[error("file too large: {size} bytes (limit {limit})")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("could not read file: {0}")]
    Unreadable(String),

    #[error("malformed export file: {0}")]
    Malformed(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("unsupported export version: {0}")]
    UnsupportedVersion(String),

    #[error("export file contains no data")]
    EmptyData,
}

/// Non-fatal findings surfaced alongside a successful import or preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportWarning {
    /// The file has no checksum to verify.
    MissingChecksum,
    /// The recomputed checksum differs from the recorded one.
    ChecksumMismatch { expected: String, actual: String },
    /// The file was exported by a different account.
    OwnerMismatch { current: String, exported_by: String },
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportWarning::MissingChecksum => write!(f, "file carries no checksum"),
            ImportWarning::ChecksumMismatch { expected, actual } => {
                write!(f, "checksum mismatch: file says {expected}, data hashes to {actual}")
            }
            ImportWarning::OwnerMismatch { current, exported_by } => {
                write!(f, "file was exported by {exported_by}, importing into {current}")
            }
        }
    }
}
