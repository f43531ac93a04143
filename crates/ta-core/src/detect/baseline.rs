//! Robust baseline estimation (median and spread).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ta_common::Sample;
use ta_math::{median_and_spread, SpreadSource};

/// Location/spread pair a robust detector scores against.
///
/// Replaced wholesale on reload or retrain, never mutated field by field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub median: f64,
    /// MAD of the window, or its population standard deviation when the MAD
    /// is zero. Zero only for perfectly constant data.
    pub spread: f64,
    pub spread_source: SpreadSource,
    /// Newest timestamp covered by the fit.
    pub computed_at: DateTime<Utc>,
    pub sample_count: usize,
}

impl Baseline {
    /// Whether the spread can be used as a divisor.
    pub fn is_usable(&self) -> bool {
        self.spread > 0.0 && self.spread.is_finite()
    }

    /// `median ± threshold × spread`.
    pub fn bands(&self, threshold: f64) -> (f64, f64) {
        let half = threshold * self.spread;
        (self.median - half, self.median + half)
    }

    /// Hours between `computed_at` and `now`.
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        (now - self.computed_at).num_milliseconds() as f64 / 3_600_000.0
    }
}

/// Fit a baseline over a window of samples.
///
/// Returns `None` for an empty window: having no data is a valid state the
/// caller checks for, not a failure.
pub fn estimate_baseline(window: &[Sample]) -> Option<Baseline> {
    let computed_at = window.iter().map(|s| s.timestamp).max()?;
    let values: Vec<f64> = window.iter().map(|s| s.intensity).collect();
    estimate_from_values(&values, computed_at)
}

/// Fit a baseline over raw intensities, stamping it with `computed_at`.
pub fn estimate_from_values(values: &[f64], computed_at: DateTime<Utc>) -> Option<Baseline> {
    let (median, spread) = median_and_spread(values)?;
    if spread.source == SpreadSource::StdDev {
        tracing::debug!(
            event = crate::logging::event_names::SPREAD_FALLBACK,
            stage = "fit",
            std_dev = spread.value,
            sample_count = values.len() as u64,
            "MAD is zero; using population standard deviation"
        );
    }
    Some(Baseline {
        median,
        spread: spread.value,
        spread_source: spread.source,
        computed_at,
        sample_count: values.len(),
    })
}
