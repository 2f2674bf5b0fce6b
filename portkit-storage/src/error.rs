//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored value is not valid JSON.
    #[error("corrupt value at {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The write would exceed the store's capacity.
    #[error("quota exceeded writing {key} ({needed} bytes, {available} available)")]
    QuotaExceeded {
        key: String,
        needed: u64,
        available: u64,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}
