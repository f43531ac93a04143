//! Configuration snapshots for result provenance.
//!
//! A snapshot captures the exact configuration a detector was built from,
//! so a set of scored points can be traced back to its parameters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::detector::DetectorConfig;
use crate::resolve::ConfigSource;

/// A frozen snapshot of configuration state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// When this snapshot was taken.
    pub timestamp: DateTime<Utc>,

    /// Schema version of the configuration.
    pub schema_version: String,

    /// Path the base config was loaded from.
    #[serde(default)]
    pub path: Option<String>,

    /// Source of the base config.
    pub source: String,

    /// SHA-256 of the config file content.
    #[serde(default)]
    pub file_hash: Option<String>,

    /// SHA-256 of the effective config serialized as JSON; differs from
    /// `file_hash` whenever CLI overrides were applied.
    pub effective_hash: String,

    /// The effective configuration.
    pub effective: DetectorConfig,
}

impl ConfigSnapshot {
    pub fn new(
        effective: &DetectorConfig,
        path: Option<&Path>,
        source: ConfigSource,
        content: Option<&str>,
    ) -> Self {
        let effective_json = serde_json::to_string(effective).unwrap_or_default();
        ConfigSnapshot {
            timestamp: Utc::now(),
            schema_version: effective.schema_version.clone(),
            path: path.map(|p| p.display().to_string()),
            source: source.to_string(),
            file_hash: content.map(hash_content),
            effective_hash: hash_content(&effective_json),
            effective: effective.clone(),
        }
    }

    /// Whether two snapshots describe the same effective configuration.
    pub fn same_effective(&self, other: &ConfigSnapshot) -> bool {
        self.effective_hash == other.effective_hash
    }
}

/// Hex-encoded SHA-256 of a string.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
