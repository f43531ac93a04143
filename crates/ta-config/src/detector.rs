//! Detector configuration.
//!
//! One `DetectorConfig` fully determines a detector instance. Changing any
//! field means building a new detector; there is no in-place update path.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which scoring strategy a detector uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Median / MAD baseline over a trailing window, O(1) per point.
    #[default]
    Robust,
    /// Isolation forest fitted over the whole history.
    Ensemble,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Robust => "robust",
            StrategyKind::Ensemble => "ensemble",
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "robust" | "mad" | "statistical" => Ok(StrategyKind::Robust),
            "ensemble" | "iforest" | "isolation-forest" | "isolation_forest" => {
                Ok(StrategyKind::Ensemble)
            }
            _ => Err(format!("unknown strategy: {}", s)),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How ensemble rarity scores are rescaled into `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum NormalizationMode {
    /// Min–max over the batch currently being scored. Scores are not
    /// comparable across calls.
    #[default]
    Batch,
    /// Min–max over the raw scores of the training set, clamped.
    Reference,
}

impl std::str::FromStr for NormalizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "batch" => Ok(NormalizationMode::Batch),
            "reference" | "training" => Ok(NormalizationMode::Reference),
            _ => Err(format!("unknown normalization mode: {}", s)),
        }
    }
}

impl std::fmt::Display for NormalizationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NormalizationMode::Batch => write!(f, "batch"),
            NormalizationMode::Reference => write!(f, "reference"),
        }
    }
}

/// Full detector configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DetectorConfig {
    /// Configuration schema version.
    pub schema_version: String,

    /// Scoring strategy.
    pub strategy: StrategyKind,

    /// Days of trailing history used to fit the robust baseline.
    pub window_days: u32,

    /// Multiples of spread beyond which a point is anomalous (strict).
    pub threshold: f64,

    /// Expected anomaly proportion for the ensemble strategy, in (0, 0.5).
    pub contamination: f64,

    /// Seed for the ensemble's random partitioning.
    pub seed: u64,

    /// Number of isolation trees.
    pub n_estimators: usize,

    /// Subsample size per tree (capped at the history length).
    pub max_samples: usize,

    /// Ensemble score rescaling mode.
    pub normalization: NormalizationMode,

    /// Minimum points the trailing window must hold before it is used
    /// instead of the full history.
    pub min_window_points: usize,

    /// Minimum history-buffer length for a retrain to proceed.
    pub retrain_min_points: usize,

    /// Samples per day, used to size the history buffer.
    pub minutes_per_day: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            strategy: StrategyKind::Robust,
            window_days: 30,
            threshold: 3.5,
            contamination: 0.01,
            seed: 42,
            n_estimators: 100,
            max_samples: 256,
            normalization: NormalizationMode::Batch,
            min_window_points: 100,
            retrain_min_points: 1000,
            minutes_per_day: 1440,
        }
    }
}

impl DetectorConfig {
    /// Capacity of the bounded history buffer: `window_days × minutes_per_day`.
    pub fn history_capacity(&self) -> usize {
        (self.window_days as usize).saturating_mul(self.minutes_per_day)
    }

    pub fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_window_days(mut self, window_days: u32) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }
}
