//! Loading detector configuration files.
//!
//! Files are JSON or TOML, chosen by extension. Missing fields take their
//! defaults, so a file only needs the values it changes.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::detector::DetectorConfig;
use crate::resolve::{resolve_config_path, ConfigSource};
use crate::snapshot::ConfigSnapshot;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Invalid config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Unsupported config file extension: {path} (expected .json or .toml)")]
    UnsupportedFormat { path: PathBuf },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for ta_common::Error {
    fn from(err: ConfigError) -> Self {
        ta_common::Error::Config(err.to_string())
    }
}

/// A configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: DetectorConfig,
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
    /// Raw file content, kept for provenance hashing.
    pub content: Option<String>,
}

impl LoadedConfig {
    /// Built-in defaults with no backing file.
    pub fn builtin() -> Self {
        Self {
            config: DetectorConfig::default(),
            path: None,
            source: ConfigSource::BuiltinDefault,
            content: None,
        }
    }

    /// Snapshot the effective configuration (after any overrides).
    pub fn snapshot(&self, effective: &DetectorConfig) -> ConfigSnapshot {
        ConfigSnapshot::new(
            effective,
            self.path.as_deref(),
            self.source,
            self.content.as_deref(),
        )
    }
}

/// Parse configuration text according to the file extension.
pub fn parse_config(path: &Path, content: &str) -> Result<DetectorConfig, ConfigError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("json") => serde_json::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Some("toml") => toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        _ => Err(ConfigError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<(DetectorConfig, String), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(path, &content)?;
    Ok((config, content))
}

/// Resolve and load the detector config, falling back to defaults.
pub fn load_resolved(cli_path: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let (path, source) = resolve_config_path(cli_path);
    let Some(path) = path else {
        return Ok(LoadedConfig::builtin());
    };
    let (config, content) = load_config_file(&path)?;
    Ok(LoadedConfig {
        config,
        path: Some(path),
        source,
        content: Some(content),
    })
}
