//! Core type definitions for portkit.
//!
//! This crate defines the small, storage-agnostic types shared by the
//! registry, storage adapters and the portability engine:
//! - Account identifiers ([`OwnerId`])
//! - Record timestamps extracted from opaque JSON ([`RecordTimestamp`])
//! - The non-cryptographic export fingerprint ([`Fingerprint`])
//! - Human-readable size formatting

mod fingerprint;
mod ids;
mod size;
mod timestamp;

pub use fingerprint::{Fingerprint, fingerprint_str};
pub use ids::OwnerId;
pub use size::{format_size, utf16_size_estimate};
pub use timestamp::RecordTimestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid owner id: {0}")]
    InvalidOwner(String),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(String),
}
