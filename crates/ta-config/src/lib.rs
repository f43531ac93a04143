//! Traffic anomaly detector configuration loading and validation.
//!
//! This crate provides:
//! - The typed `DetectorConfig` (strategy selection plus every tuning knob)
//! - Config resolution (CLI → env → XDG → defaults)
//! - Semantic validation with typical-range warnings
//! - Named presets
//! - Config snapshots for result provenance

pub mod detector;
pub mod load;
pub mod preset;
pub mod resolve;
pub mod snapshot;
pub mod validate;

pub use detector::{DetectorConfig, NormalizationMode, StrategyKind};
pub use load::{load_config_file, load_resolved, parse_config, ConfigError, LoadedConfig};
pub use preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use resolve::{resolve_config_path, ConfigSource};
pub use snapshot::ConfigSnapshot;
pub use validate::{validate_detector_config, ValidationError, ValidationReport, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
