//! Configuration presets for common sensor conditions.
//!
//! Provides pre-built configurations for:
//! - Sensitive: lower threshold, higher expected contamination
//! - Balanced: the built-in defaults
//! - Conservative: wide window, high threshold, rare anomalies only

use crate::detector::DetectorConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Available configuration presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresetName {
    /// Flags smaller deviations; suited to clean, stable sensors
    Sensitive,
    /// Built-in defaults
    Balanced,
    /// Flags only large deviations; suited to noisy sensors
    Conservative,
}

impl PresetName {
    /// All available preset names.
    pub const ALL: &'static [PresetName] = &[
        PresetName::Sensitive,
        PresetName::Balanced,
        PresetName::Conservative,
    ];

    /// Get preset name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::Sensitive => "sensitive",
            PresetName::Balanced => "balanced",
            PresetName::Conservative => "conservative",
        }
    }

    /// Parse preset name from string.
    pub fn parse(s: &str) -> Option<PresetName> {
        match s.to_lowercase().as_str() {
            "sensitive" | "strict" => Some(PresetName::Sensitive),
            "balanced" | "default" => Some(PresetName::Balanced),
            "conservative" | "noisy" | "relaxed" => Some(PresetName::Conservative),
            _ => None,
        }
    }

    /// Get a description of the preset.
    pub fn description(&self) -> &'static str {
        match self {
            PresetName::Sensitive => "Threshold 2.5 spreads, contamination 0.05",
            PresetName::Balanced => "Built-in defaults: 30-day window, threshold 3.5, contamination 0.01",
            PresetName::Conservative => {
                "90-day window, threshold 5.0, contamination 0.001; for noisy sensors"
            }
        }
    }
}

impl fmt::Display for PresetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PresetName {
    type Err = PresetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PresetName::parse(s).ok_or_else(|| PresetError::UnknownPreset(s.to_string()))
    }
}

/// Errors related to preset operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetError {
    /// Unknown preset name.
    UnknownPreset(String),
}

impl fmt::Display for PresetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresetError::UnknownPreset(name) => {
                write!(
                    f,
                    "Unknown preset '{}'. Available: {}",
                    name,
                    PresetName::ALL
                        .iter()
                        .map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

impl std::error::Error for PresetError {}

impl From<PresetError> for ta_common::Error {
    fn from(err: PresetError) -> Self {
        match err {
            PresetError::UnknownPreset(name) => ta_common::Error::UnknownPreset(name),
        }
    }
}

/// Get the configuration for a preset.
pub fn get_preset(name: PresetName) -> DetectorConfig {
    match name {
        PresetName::Sensitive => DetectorConfig {
            threshold: 2.5,
            contamination: 0.05,
            ..DetectorConfig::default()
        },
        PresetName::Balanced => DetectorConfig::default(),
        PresetName::Conservative => DetectorConfig {
            window_days: 90,
            threshold: 5.0,
            contamination: 0.001,
            ..DetectorConfig::default()
        },
    }
}

/// Summary of a preset for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresetInfo {
    pub name: PresetName,
    pub description: String,
    pub window_days: u32,
    pub threshold: f64,
    pub contamination: f64,
}

/// List all presets with their headline values.
pub fn list_presets() -> Vec<PresetInfo> {
    PresetName::ALL
        .iter()
        .map(|&name| {
            let config = get_preset(name);
            PresetInfo {
                name,
                description: name.description().to_string(),
                window_days: config.window_days,
                threshold: config.threshold,
                contamination: config.contamination,
            }
        })
        .collect()
}
