//! Isolation-forest strategy.
//!
//! The forest is fitted over the whole history. Labels come from the
//! forest itself; the reported score is a rarity in `[0, 1]` rescaled from
//! the raw forest score.

pub mod features;
pub mod forest;

pub use features::{Feature, FeatureSet};
pub use forest::{ForestParams, IsolationForest, IsolationTree};

use chrono::{DateTime, Utc};
use ta_common::{DetectorStatistics, Sample, ScoredPoint};
use ta_config::{DetectorConfig, NormalizationMode, StrategyKind};
use ta_math::{rarity_in_range, rarity_min_max};

use super::error::{validate_samples, DetectError};
use super::facade::{
    AnomalyDetector, DetectorState, EnsembleReport, FitSummary, LoadOutcome, ScoreLog,
};
use crate::logging::event_names;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleParams {
    pub forest: ForestParams,
    pub normalization: NormalizationMode,
}

impl From<&DetectorConfig> for EnsembleParams {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            forest: ForestParams {
                n_estimators: config.n_estimators,
                max_samples: config.max_samples,
                contamination: config.contamination,
                seed: config.seed,
            },
            normalization: config.normalization,
        }
    }
}

impl Default for EnsembleParams {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

/// Ensemble detector.
#[derive(Debug, Clone)]
pub struct EnsembleDetector {
    params: EnsembleParams,
    features: FeatureSet,
    model: Option<IsolationForest>,
    log: ScoreLog,
}

impl EnsembleDetector {
    pub fn new(params: EnsembleParams) -> Self {
        Self {
            params,
            features: FeatureSet::default(),
            model: None,
            log: ScoreLog::default(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(EnsembleParams::from(config))
    }

    /// Replace the feature columns. Takes effect on the next `load_history`.
    pub fn with_features(mut self, features: FeatureSet) -> Self {
        self.features = features;
        self
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn model(&self) -> Option<&IsolationForest> {
        self.model.as_ref()
    }

    fn point(sample: &Sample, rarity: f64, is_anomaly: bool) -> ScoredPoint {
        ScoredPoint {
            timestamp: sample.timestamp,
            intensity: sample.intensity,
            expected: None,
            score: rarity,
            is_anomaly,
            confidence: rarity,
        }
    }
}

impl AnomalyDetector for EnsembleDetector {
    fn strategy(&self) -> StrategyKind {
        StrategyKind::Ensemble
    }

    fn state(&self) -> DetectorState {
        match self.model {
            Some(_) => DetectorState::Ready,
            None => DetectorState::Uninitialized,
        }
    }

    /// Fit on the full history. Empty history is an error, and leaves the
    /// detector uninitialized.
    fn load_history(&mut self, samples: &[Sample]) -> Result<LoadOutcome, DetectError> {
        validate_samples(samples)?;
        self.model = None;
        self.log.clear();

        let mut sorted = samples.to_vec();
        sorted.sort_by_key(|s| s.timestamp);
        let matrix = self.features.matrix(&sorted);
        let forest = IsolationForest::fit(&matrix, &self.params.forest)?;

        tracing::info!(
            event = event_names::ENSEMBLE_FITTED,
            stage = "fit",
            sample_count = matrix.len() as u64,
            n_estimators = forest.n_estimators() as u64,
            subsample_size = forest.subsample_size() as u64,
            offset = forest.offset(),
            "isolation forest fitted"
        );

        let report = EnsembleReport {
            sample_count: matrix.len(),
            n_estimators: forest.n_estimators(),
            subsample_size: forest.subsample_size(),
            offset: forest.offset(),
            features: self.features.names(),
        };
        self.model = Some(forest);
        Ok(LoadOutcome::Ready {
            summary: FitSummary::Ensemble(report),
        })
    }

    /// Score one sample against the training range; a single point has no
    /// batch range of its own.
    fn process_point(&mut self, sample: &Sample, _threshold: Option<f64>) -> Option<ScoredPoint> {
        sample.validate().ok()?;
        let model = self.model.as_ref()?;
        let raw = model.score_row(&self.features.row(sample));
        let (lo, hi) = model.reference_range();
        let point = Self::point(sample, rarity_in_range(raw, lo, hi), model.is_outlier(raw));
        self.log.record(&point);
        Some(point)
    }

    /// Score a batch in the order given. The threshold is ignored: labels
    /// come from the forest.
    fn process_batch(&mut self, samples: &[Sample], _threshold: Option<f64>) -> Vec<ScoredPoint> {
        let Some(model) = self.model.as_ref() else {
            return Vec::new();
        };
        let samples: Vec<Sample> = samples
            .iter()
            .filter(|s| s.validate().is_ok())
            .cloned()
            .collect();

        let raw = model.score_samples(&self.features.matrix(&samples));
        let rarity = match self.params.normalization {
            NormalizationMode::Batch => rarity_min_max(&raw),
            NormalizationMode::Reference => {
                let (lo, hi) = model.reference_range();
                raw.iter().map(|&r| rarity_in_range(r, lo, hi)).collect()
            }
        };

        let points: Vec<ScoredPoint> = samples
            .iter()
            .zip(raw.iter().zip(rarity))
            .map(|(sample, (&r, rarity))| Self::point(sample, rarity, model.is_outlier(r)))
            .collect();
        for point in &points {
            self.log.record(point);
        }

        tracing::debug!(
            event = event_names::BATCH_SCORED,
            stage = "score",
            points = points.len() as u64,
            anomalies = points.iter().filter(|p| p.is_anomaly).count() as u64,
            "ensemble batch scored"
        );
        points
    }

    fn score_log(&self) -> &ScoreLog {
        &self.log
    }

    fn statistics_at(&self, _now: DateTime<Utc>) -> DetectorStatistics {
        DetectorStatistics {
            total_anomalies: self.log.anomalies().len(),
            points_processed: self.log.history().len(),
            baseline_median: None,
            baseline_spread: None,
            buffer_size: self.log.history().len(),
            baseline_age_hours: None,
            last_anomaly_timestamp: self.log.last_anomaly_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn series(values: &[f64]) -> Vec<Sample> {
        let t0 = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(t0 + Duration::minutes(i as i64), v))
            .collect()
    }

    fn history() -> Vec<Sample> {
        let mut values: Vec<f64> = (0..300).map(|i| 50.0 + (i % 7) as f64).collect();
        values.push(400.0);
        series(&values)
    }

    fn quick() -> EnsembleParams {
        EnsembleParams {
            forest: ForestParams {
                n_estimators: 30,
                ..ForestParams::default()
            },
            normalization: NormalizationMode::Batch,
        }
    }

    #[test]
    fn empty_history_fails_and_stays_uninitialized() {
        let mut detector = EnsembleDetector::new(quick());
        assert_eq!(detector.load_history(&[]), Err(DetectError::EmptyFeatureSet));
        assert_eq!(detector.state(), DetectorState::Uninitialized);
    }

    #[test]
    fn scoring_before_fit_is_empty() {
        let mut detector = EnsembleDetector::new(quick());
        assert!(detector.process_batch(&history(), None).is_empty());
        assert!(detector.process_point(&history()[0], None).is_none());
    }

    #[test]
    fn invalid_samples_are_not_scored() {
        let mut detector = EnsembleDetector::new(quick());
        let data = history();
        detector.load_history(&data).unwrap();

        let t = data[0].timestamp;
        assert!(detector.process_point(&Sample::new(t, f64::NAN), None).is_none());
        let batch = [Sample::new(t, 51.0), Sample::new(t, -3.0), Sample::new(t, 52.0)];
        let points = detector.process_batch(&batch, None);
        assert_eq!(points.len(), 2);
        assert!(points.iter().all(|p| p.score.is_finite() && p.score >= 0.0));
        assert_eq!(detector.history().len(), 2);
    }

    #[test]
    fn batch_scores_span_unit_interval() {
        let mut detector = EnsembleDetector::new(quick());
        let data = history();
        detector.load_history(&data).unwrap();
        let points = detector.process_batch(&data, None);

        assert_eq!(points.len(), data.len());
        assert!(points.iter().all(|p| (0.0..=1.0).contains(&p.score)));
        assert_eq!(points[300].score, 1.0);
        assert!(points.iter().any(|p| p.score == 0.0));
        assert!(points[300].is_anomaly);
        assert!(points.iter().all(|p| p.expected.is_none() && p.confidence == p.score));
    }

    #[test]
    fn labels_come_from_forest_not_normalized_score() {
        let mut detector = EnsembleDetector::new(quick());
        let data = history();
        detector.load_history(&data).unwrap();
        let model = detector.model().unwrap().clone();
        let raw = model.score_samples(&detector.features().matrix(&data));
        let points = detector.process_batch(&data, Some(0.0));
        for (point, r) in points.iter().zip(raw) {
            assert_eq!(point.is_anomaly, r < model.offset());
        }
    }

    #[test]
    fn reference_normalization_is_stable_across_batches() {
        let params = EnsembleParams {
            normalization: NormalizationMode::Reference,
            ..quick()
        };
        let mut detector = EnsembleDetector::new(params);
        let data = history();
        detector.load_history(&data).unwrap();

        let alone = detector.process_batch(&data[..1], None)[0].score;
        let in_context = detector.process_batch(&data, None)[0].score;
        assert_eq!(alone, in_context);
        let single = detector.process_point(&data[0], None).unwrap().score;
        assert_eq!(single, alone);
    }

    #[test]
    fn statistics_leave_baseline_fields_undefined() {
        let mut detector = EnsembleDetector::new(quick());
        let data = history();
        detector.load_history(&data).unwrap();
        detector.process_batch(&data, None);

        let stats = detector.get_statistics();
        assert_eq!(stats.baseline_median, None);
        assert_eq!(stats.baseline_spread, None);
        assert_eq!(stats.baseline_age_hours, None);
        assert_eq!(stats.points_processed, data.len());
        assert_eq!(stats.buffer_size, data.len());
        assert!(stats.total_anomalies >= 1);
        assert_eq!(stats.last_anomaly_timestamp, Some(data[300].timestamp));
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let data = history();
        let mut a = EnsembleDetector::new(quick());
        let mut b = EnsembleDetector::new(quick());
        a.load_history(&data).unwrap();
        b.load_history(&data).unwrap();
        assert_eq!(a.process_batch(&data, None), b.process_batch(&data, None));
    }

    #[test]
    fn extra_feature_columns_are_reported() {
        let mut detector = EnsembleDetector::new(quick())
            .with_features(FeatureSet::default().with(Feature::HourOfDay));
        let LoadOutcome::Ready {
            summary: FitSummary::Ensemble(report),
        } = detector.load_history(&history()).unwrap()
        else {
            panic!("expected ensemble fit");
        };
        assert_eq!(report.features, vec!["intensity", "hour_of_day"]);
        assert_eq!(report.subsample_size, 256);
    }
}
