//! Portability configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{SyncError, SyncResult};
use crate::package::FORMAT_VERSION;

/// Settings for export and import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortabilityConfig {
    /// Largest import file accepted, in bytes.
    pub max_import_bytes: u64,
    /// Envelope versions the importer accepts.
    pub supported_versions: Vec<String>,
    /// Version written into new exports.
    pub format_version: String,
    /// File name prefix for exports.
    pub file_prefix: String,
    /// Accepted import file extensions, without the dot.
    pub accepted_extensions: Vec<String>,
    /// Application version recorded in export metadata.
    pub app_version: String,
}

impl Default for PortabilityConfig {
    fn default() -> Self {
        Self {
            max_import_bytes: 50 * 1024 * 1024, // 50 MB
            supported_versions: vec![FORMAT_VERSION.to_string()],
            format_version: FORMAT_VERSION.to_string(),
            file_prefix: "workbench_backup".to_string(),
            accepted_extensions: vec!["json".to_string()],
            app_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl PortabilityConfig {
    /// Loads a JSON config file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings are usable.
    pub fn validate(&self) -> SyncResult<()> {
        if self.max_import_bytes == 0 {
            return Err(SyncError::Config("max_import_bytes must be positive".into()));
        }
        if self.accepted_extensions.is_empty() {
            return Err(SyncError::Config("accepted_extensions must not be empty".into()));
        }
        if !self.supported_versions.contains(&self.format_version) {
            return Err(SyncError::Config(format!(
                "format_version {} is not in supported_versions",
                self.format_version
            )));
        }
        if self.file_prefix.trim().is_empty() {
            return Err(SyncError::Config("file_prefix must not be empty".into()));
        }
        Ok(())
    }

    /// Returns true if `file_name` carries an accepted extension.
    pub fn accepts_extension(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.accepted_extensions
                    .iter()
                    .any(|a| a.eq_ignore_ascii_case(ext))
            })
    }
}
