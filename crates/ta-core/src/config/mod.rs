//! Configuration loading for ta-core.
//!
//! This module handles:
//! - Loading the detector config file (CLI > env > XDG > system > defaults)
//! - Applying a named preset and then per-flag overrides
//! - Semantic validation (ranges, schema version)
//! - Snapshotting the effective config for result provenance

pub use ta_config::preset::{get_preset, list_presets, PresetError, PresetInfo, PresetName};
pub use ta_config::{
    ConfigError, ConfigSnapshot, ConfigSource, DetectorConfig, NormalizationMode, StrategyKind,
    ValidationError, ValidationReport, CONFIG_SCHEMA_VERSION,
};

use std::path::PathBuf;
use ta_config::{load_resolved, validate_detector_config};

/// Per-run overrides, applied after the file and preset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub strategy: Option<StrategyKind>,
    pub window_days: Option<u32>,
    pub threshold: Option<f64>,
    pub contamination: Option<f64>,
    pub normalization: Option<NormalizationMode>,
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ConfigOverrides::default()
    }

    pub fn apply(&self, config: &mut DetectorConfig) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(window_days) = self.window_days {
            config.window_days = window_days;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(contamination) = self.contamination {
            config.contamination = contamination;
        }
        if let Some(normalization) = self.normalization {
            config.normalization = normalization;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
    }
}

/// Where to look for configuration and what to layer on top.
#[derive(Debug, Clone, Default)]
pub struct ConfigOptions {
    /// Explicit config file (highest priority).
    pub config_path: Option<PathBuf>,
    /// Preset whose headline values replace the file's.
    pub preset: Option<PresetName>,
    pub overrides: ConfigOverrides,
}

/// The effective configuration with provenance.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: DetectorConfig,
    pub path: Option<PathBuf>,
    pub source: ConfigSource,
    pub snapshot: ConfigSnapshot,
    /// Values accepted but outside their typical range.
    pub warnings: Vec<String>,
}

/// Copy a preset's headline values onto `config`.
pub fn apply_preset(config: &mut DetectorConfig, preset: PresetName) {
    let values = get_preset(preset);
    config.window_days = values.window_days;
    config.threshold = values.threshold;
    config.contamination = values.contamination;
}

/// Resolve, layer and validate the detector configuration.
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ta_common::Error> {
    let loaded = load_resolved(options.config_path.as_deref())?;

    let mut config = loaded.config.clone();
    if let Some(preset) = options.preset {
        apply_preset(&mut config, preset);
    }
    options.overrides.apply(&mut config);

    let report = validate_detector_config(&config)?;
    let snapshot = loaded.snapshot(&config);

    Ok(ResolvedConfig {
        config,
        path: loaded.path,
        source: loaded.source,
        snapshot,
        warnings: report.warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(content: &str, suffix: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn layering_order_is_file_then_preset_then_flags() {
        let file = file_with("threshold = 4.0\nseed = 7\nwindow_days = 14\n", ".toml");
        let options = ConfigOptions {
            config_path: Some(file.path().to_path_buf()),
            preset: Some(PresetName::Sensitive),
            overrides: ConfigOverrides {
                window_days: Some(21),
                ..ConfigOverrides::default()
            },
        };
        let resolved = load_config(&options).unwrap();
        // preset replaced the file's threshold, the flag replaced window_days
        assert_eq!(resolved.config.threshold, 2.5);
        assert_eq!(resolved.config.window_days, 21);
        // fields the preset does not cover keep the file value
        assert_eq!(resolved.config.seed, 7);
        assert_eq!(resolved.source, ConfigSource::CliArgument);
        assert!(resolved.snapshot.file_hash.is_some());
    }

    #[test]
    fn invalid_override_is_rejected() {
        let file = file_with("{}", ".json");
        let options = ConfigOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                contamination: Some(0.7),
                ..ConfigOverrides::default()
            },
            ..ConfigOptions::default()
        };
        let err = load_config(&options).unwrap_err();
        assert_eq!(err.code(), 11);
    }

    #[test]
    fn out_of_range_values_warn() {
        let file = file_with("{}", ".json");
        let options = ConfigOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                threshold: Some(8.0),
                ..ConfigOverrides::default()
            },
            ..ConfigOptions::default()
        };
        let resolved = load_config(&options).unwrap();
        assert_eq!(resolved.warnings.len(), 1);
        assert!(resolved.warnings[0].contains("threshold"));
    }

    #[test]
    fn overrides_apply_every_field() {
        let overrides = ConfigOverrides {
            strategy: Some(StrategyKind::Ensemble),
            window_days: Some(7),
            threshold: Some(2.0),
            contamination: Some(0.05),
            normalization: Some(NormalizationMode::Reference),
            seed: Some(1),
        };
        assert!(!overrides.is_empty());
        let mut config = DetectorConfig::default();
        overrides.apply(&mut config);
        assert_eq!(config.strategy, StrategyKind::Ensemble);
        assert_eq!(config.window_days, 7);
        assert_eq!(config.normalization, NormalizationMode::Reference);
        assert_eq!(config.seed, 1);
        assert!(ConfigOverrides::default().is_empty());
    }
}
