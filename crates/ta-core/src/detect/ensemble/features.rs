//! Feature extraction for the ensemble.
//!
//! Intensity is the only channel by default. Calendar channels let the
//! forest separate a quiet rush hour from a quiet night.

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};
use ta_common::Sample;

/// One column of the feature matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Intensity,
    /// Fractional hour of day in `[0, 24)`.
    HourOfDay,
    /// Day of week, Monday = 0.
    DayOfWeek,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Intensity => "intensity",
            Feature::HourOfDay => "hour_of_day",
            Feature::DayOfWeek => "day_of_week",
        }
    }

    pub fn extract(&self, sample: &Sample) -> f64 {
        match self {
            Feature::Intensity => sample.intensity,
            Feature::HourOfDay => {
                f64::from(sample.timestamp.hour()) + f64::from(sample.timestamp.minute()) / 60.0
            }
            Feature::DayOfWeek => f64::from(sample.timestamp.weekday().num_days_from_monday()),
        }
    }
}

/// Ordered set of feature columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            features: vec![Feature::Intensity],
        }
    }
}

impl FeatureSet {
    /// A feature set with the given columns; an empty list falls back to
    /// intensity alone.
    pub fn new(features: Vec<Feature>) -> Self {
        if features.is_empty() {
            return Self::default();
        }
        Self { features }
    }

    pub fn with(mut self, feature: Feature) -> Self {
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(|f| f.as_str().to_string()).collect()
    }

    pub fn row(&self, sample: &Sample) -> Vec<f64> {
        self.features.iter().map(|f| f.extract(sample)).collect()
    }

    /// One row per sample, columns in feature order.
    pub fn matrix(&self, samples: &[Sample]) -> Vec<Vec<f64>> {
        samples.iter().map(|s| self.row(s)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn default_is_intensity_only() {
        let set = FeatureSet::default();
        let sample = Sample::new(Utc.with_ymd_and_hms(2024, 1, 1, 8, 30, 0).unwrap(), 42.0);
        assert_eq!(set.row(&sample), vec![42.0]);
        assert_eq!(set.names(), vec!["intensity"]);
    }

    #[test]
    fn calendar_channels() {
        // 2024-01-03 is a Wednesday.
        let sample = Sample::new(Utc.with_ymd_and_hms(2024, 1, 3, 17, 45, 0).unwrap(), 5.0);
        let set = FeatureSet::default()
            .with(Feature::HourOfDay)
            .with(Feature::DayOfWeek)
            .with(Feature::HourOfDay);
        assert_eq!(set.len(), 3);
        assert_eq!(set.row(&sample), vec![5.0, 17.75, 2.0]);
    }

    #[test]
    fn empty_list_falls_back_to_default() {
        assert_eq!(FeatureSet::new(Vec::new()), FeatureSet::default());
    }
}
