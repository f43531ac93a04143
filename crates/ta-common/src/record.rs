//! Input samples, scored result records, and detector statistics.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One traffic-intensity measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Sample {
    /// Measurement instant.
    pub timestamp: DateTime<Utc>,
    /// Measured intensity; must be finite and non-negative.
    pub intensity: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, intensity: f64) -> Self {
        Self {
            timestamp,
            intensity,
        }
    }

    /// Check the intensity invariant, returning a reason when it fails.
    pub fn validate(&self) -> Result<(), String> {
        if !self.intensity.is_finite() {
            return Err(format!("intensity must be finite, got {}", self.intensity));
        }
        if self.intensity < 0.0 {
            return Err(format!(
                "intensity must be non-negative, got {}",
                self.intensity
            ));
        }
        Ok(())
    }
}

/// Verdict for one sample, produced once per input point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoredPoint {
    pub timestamp: DateTime<Utc>,
    pub intensity: f64,
    /// Baseline value the point was compared against (robust strategy only).
    pub expected: Option<f64>,
    /// Deviation score, always non-negative.
    pub score: f64,
    pub is_anomaly: bool,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Summary snapshot returned by `get_statistics`.
///
/// Fields that do not apply to a strategy are `None` rather than zero so
/// callers can tell "not applicable" apart from "zero deviation".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetectorStatistics {
    pub total_anomalies: usize,
    pub points_processed: usize,
    pub baseline_median: Option<f64>,
    pub baseline_spread: Option<f64>,
    pub buffer_size: usize,
    pub baseline_age_hours: Option<f64>,
    pub last_anomaly_timestamp: Option<DateTime<Utc>>,
}
