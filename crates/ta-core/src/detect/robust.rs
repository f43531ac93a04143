//! Median/MAD strategy: trailing-window baseline, O(1) per-point scoring.

use chrono::{DateTime, Utc};
use ta_common::{DetectorStatistics, Sample, ScoredPoint};
use ta_config::{DetectorConfig, StrategyKind};

use super::baseline::{estimate_baseline, estimate_from_values, Baseline};
use super::error::{validate_samples, DetectError};
use super::facade::{
    AnomalyDetector, BaselineReport, DetectorState, FitSummary, LoadOutcome, RetrainOutcome,
    ScoreLog,
};
use super::history::HistoryBuffer;
use super::window::WindowSelector;
use crate::logging::event_names;

/// Parameters fixed for the lifetime of a robust detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RobustParams {
    pub window_days: u32,
    pub threshold: f64,
    pub min_window_points: usize,
    pub retrain_min_points: usize,
    pub history_capacity: usize,
}

impl From<&DetectorConfig> for RobustParams {
    fn from(config: &DetectorConfig) -> Self {
        Self {
            window_days: config.window_days,
            threshold: config.threshold,
            min_window_points: config.min_window_points,
            retrain_min_points: config.retrain_min_points,
            history_capacity: config.history_capacity(),
        }
    }
}

impl Default for RobustParams {
    fn default() -> Self {
        Self::from(&DetectorConfig::default())
    }
}

/// Score, verdict and confidence for one intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub score: f64,
    pub is_anomaly: bool,
    pub confidence: f64,
}

/// Score `intensity` against `baseline`.
///
/// Returns `None` when the spread cannot be used as a divisor. A point is
/// anomalous only when its score strictly exceeds `threshold`.
pub fn score_against(baseline: &Baseline, intensity: f64, threshold: f64) -> Option<Verdict> {
    if !baseline.is_usable() {
        return None;
    }
    let score = (intensity - baseline.median).abs() / baseline.spread;
    let confidence = if threshold > 0.0 {
        (score / threshold).min(1.0)
    } else {
        0.0
    };
    Some(Verdict {
        score,
        is_anomaly: score > threshold,
        confidence,
    })
}

/// Robust-statistics detector.
#[derive(Debug, Clone)]
pub struct RobustDetector {
    params: RobustParams,
    baseline: Option<Baseline>,
    buffer: HistoryBuffer,
    log: ScoreLog,
    /// Timestamp of the newest scored point, stamped onto retrained baselines.
    last_seen: Option<DateTime<Utc>>,
}

impl RobustDetector {
    pub fn new(params: RobustParams) -> Self {
        Self {
            buffer: HistoryBuffer::new(params.history_capacity),
            params,
            baseline: None,
            log: ScoreLog::default(),
            last_seen: None,
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Self {
        Self::new(RobustParams::from(config))
    }

    pub fn params(&self) -> &RobustParams {
        &self.params
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }

    pub fn buffer(&self) -> &HistoryBuffer {
        &self.buffer
    }

    /// `median ± threshold × spread` around the current baseline, using the
    /// configured threshold when none is given.
    pub fn bands(&self, threshold: Option<f64>) -> Option<(f64, f64)> {
        let threshold = threshold.unwrap_or(self.params.threshold);
        self.baseline.map(|b| b.bands(threshold))
    }

    fn reset(&mut self) {
        self.baseline = None;
        self.buffer = HistoryBuffer::new(self.params.history_capacity);
        self.log.clear();
        self.last_seen = None;
    }
}

impl AnomalyDetector for RobustDetector {
    fn strategy(&self) -> StrategyKind {
        StrategyKind::Robust
    }

    fn state(&self) -> DetectorState {
        match self.baseline {
            Some(_) => DetectorState::Ready,
            None => DetectorState::Uninitialized,
        }
    }

    fn load_history(&mut self, samples: &[Sample]) -> Result<LoadOutcome, DetectError> {
        validate_samples(samples)?;
        self.reset();

        let window = WindowSelector::new(self.params.window_days)
            .with_min_points(self.params.min_window_points)
            .select(samples);
        if window.widened {
            tracing::debug!(
                event = event_names::WINDOW_WIDENED,
                stage = "load",
                window_days = u64::from(self.params.window_days),
                total_points = window.len() as u64,
                "trailing window too small; using full history"
            );
        }

        let Some(baseline) = estimate_baseline(&window.samples) else {
            tracing::info!(
                event = event_names::HISTORY_EMPTY,
                stage = "load",
                "no history to fit; detector stays uninitialized"
            );
            return Ok(LoadOutcome::Uninitialized { sample_count: 0 });
        };

        self.buffer = HistoryBuffer::from_values(self.params.history_capacity, &window.intensities());
        self.baseline = Some(baseline);
        self.last_seen = Some(baseline.computed_at);

        tracing::info!(
            event = event_names::HISTORY_LOADED,
            stage = "fit",
            median = baseline.median,
            spread = baseline.spread,
            spread_source = %baseline.spread_source,
            sample_count = baseline.sample_count as u64,
            buffer_size = self.buffer.len() as u64,
            "baseline fitted"
        );

        Ok(LoadOutcome::Ready {
            summary: FitSummary::Robust(BaselineReport::new(&baseline, window.widened)),
        })
    }

    fn process_point(&mut self, sample: &Sample, threshold: Option<f64>) -> Option<ScoredPoint> {
        sample.validate().ok()?;
        let baseline = self.baseline.as_ref()?;
        let threshold = threshold.unwrap_or(self.params.threshold);
        let verdict = score_against(baseline, sample.intensity, threshold)?;

        let point = ScoredPoint {
            timestamp: sample.timestamp,
            intensity: sample.intensity,
            expected: Some(baseline.median),
            score: verdict.score,
            is_anomaly: verdict.is_anomaly,
            confidence: verdict.confidence,
        };

        self.buffer.push(sample.intensity);
        self.log.record(&point);
        self.last_seen = Some(sample.timestamp);
        Some(point)
    }

    fn retrain(&mut self) -> RetrainOutcome {
        let required = self.params.retrain_min_points;
        let available = self.buffer.len();
        if available < required {
            tracing::debug!(
                event = event_names::RETRAIN_SKIPPED,
                stage = "retrain",
                available = available as u64,
                required = required as u64,
                "history buffer too short to retrain"
            );
            return RetrainOutcome::NotEnoughData {
                available,
                required,
            };
        }

        let computed_at = self
            .last_seen
            .or(self.baseline.map(|b| b.computed_at))
            .unwrap_or_else(Utc::now);
        let Some(baseline) = estimate_from_values(&self.buffer.to_vec(), computed_at) else {
            return RetrainOutcome::NotEnoughData {
                available,
                required,
            };
        };

        tracing::info!(
            event = event_names::RETRAINED,
            stage = "retrain",
            median = baseline.median,
            spread = baseline.spread,
            sample_count = baseline.sample_count as u64,
            "baseline replaced from history buffer"
        );
        self.baseline = Some(baseline);
        RetrainOutcome::Retrained { baseline }
    }

    fn score_log(&self) -> &ScoreLog {
        &self.log
    }

    fn statistics_at(&self, now: DateTime<Utc>) -> DetectorStatistics {
        DetectorStatistics {
            total_anomalies: self.log.anomalies().len(),
            points_processed: self.log.history().len(),
            baseline_median: self.baseline.map(|b| b.median),
            baseline_spread: self.baseline.map(|b| b.spread),
            buffer_size: self.buffer.len(),
            baseline_age_hours: self.baseline.map(|b| b.age_hours(now)),
            last_anomaly_timestamp: self.log.last_anomaly_timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn series(values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Sample::new(t0() + Duration::minutes(i as i64), v))
            .collect()
    }

    fn baseline(median: f64, spread: f64) -> Baseline {
        Baseline {
            median,
            spread,
            spread_source: ta_math::SpreadSource::Mad,
            computed_at: t0(),
            sample_count: 10,
        }
    }

    #[test]
    fn score_is_strict_against_threshold() {
        let b = baseline(100.0, 5.0);
        let at = score_against(&b, 115.0, 3.0).unwrap();
        assert_eq!(at.score, 3.0);
        assert!(!at.is_anomaly);
        assert_eq!(at.confidence, 1.0);

        let above = score_against(&b, 80.0, 3.0).unwrap();
        assert_eq!(above.score, 4.0);
        assert!(above.is_anomaly);
    }

    #[test]
    fn zero_threshold_gives_zero_confidence() {
        let v = score_against(&baseline(10.0, 2.0), 12.0, 0.0).unwrap();
        assert_eq!(v.confidence, 0.0);
        assert!(v.is_anomaly);
    }

    #[test]
    fn zero_spread_is_not_ready() {
        assert!(score_against(&baseline(10.0, 0.0), 10.0, 3.0).is_none());
    }

    #[test]
    fn not_ready_before_load() {
        let mut detector = RobustDetector::new(RobustParams::default());
        assert_eq!(detector.state(), DetectorState::Uninitialized);
        assert!(detector.process_point(&Sample::new(t0(), 5.0), None).is_none());
        assert!(detector.history().is_empty());
        assert_eq!(detector.get_statistics().baseline_median, None);
    }

    #[test]
    fn load_then_score_updates_buffer_and_logs() {
        let mut detector = RobustDetector::new(RobustParams::default());
        let outcome = detector
            .load_history(&series(&[1.0, 2.0, 3.0, 4.0, 100.0]))
            .unwrap();
        assert!(outcome.is_ready());
        assert_eq!(outcome.median(), Some(3.0));
        assert_eq!(outcome.spread(), Some(1.0));
        assert_eq!(detector.buffer().len(), 5);

        let late = t0() + Duration::hours(1);
        let normal = detector.process_point(&Sample::new(late, 4.0), Some(3.5)).unwrap();
        assert!(!normal.is_anomaly);
        assert_eq!(normal.expected, Some(3.0));

        let spike = detector
            .process_point(&Sample::new(late + Duration::minutes(1), 9.0), Some(3.5))
            .unwrap();
        assert!(spike.is_anomaly);

        let stats = detector.statistics_at(t0() + Duration::hours(2));
        assert_eq!(stats.total_anomalies, 1);
        assert_eq!(stats.points_processed, 2);
        assert_eq!(stats.buffer_size, 7);
        assert_eq!(stats.last_anomaly_timestamp, Some(spike.timestamp));
        // computed_at is the newest history timestamp (minute 4).
        let expected_age = (120.0 - 4.0) / 60.0;
        assert!((stats.baseline_age_hours.unwrap() - expected_age).abs() < 1e-9);
    }

    #[test]
    fn reload_discards_previous_state() {
        let mut detector = RobustDetector::new(RobustParams::default());
        detector.load_history(&series(&[1.0, 2.0, 3.0])).unwrap();
        detector.process_point(&Sample::new(t0(), 50.0), None);
        assert_eq!(detector.anomalies().len(), 1);

        let outcome = detector.load_history(&[]).unwrap();
        assert_eq!(outcome, LoadOutcome::Uninitialized { sample_count: 0 });
        assert_eq!(detector.state(), DetectorState::Uninitialized);
        assert!(detector.anomalies().is_empty());
        assert_eq!(detector.buffer().len(), 0);
    }

    #[test]
    fn malformed_history_is_rejected() {
        let mut detector = RobustDetector::new(RobustParams::default());
        let err = detector
            .load_history(&series(&[1.0, f64::NAN]))
            .unwrap_err();
        assert!(matches!(err, DetectError::MalformedSample { index: 1, .. }));
    }

    #[test]
    fn retrain_requires_enough_points() {
        let params = RobustParams {
            retrain_min_points: 10,
            ..RobustParams::default()
        };
        let mut detector = RobustDetector::new(params);
        detector.load_history(&series(&[10.0, 11.0, 12.0])).unwrap();
        assert_eq!(
            detector.retrain(),
            RetrainOutcome::NotEnoughData {
                available: 3,
                required: 10
            }
        );
    }

    #[test]
    fn retrain_replaces_baseline_from_buffer() {
        let params = RobustParams {
            retrain_min_points: 5,
            history_capacity: 5,
            ..RobustParams::default()
        };
        let mut detector = RobustDetector::new(params);
        detector
            .load_history(&series(&[10.0, 11.0, 12.0, 13.0, 14.0]))
            .unwrap();
        assert_eq!(detector.baseline().unwrap().median, 12.0);

        // Drift upward; the buffer now holds 13, 14, 20, 21, 22.
        let later = t0() + Duration::days(1);
        for (i, v) in [20.0, 21.0, 22.0].into_iter().enumerate() {
            detector.process_point(&Sample::new(later + Duration::minutes(i as i64), v), Some(100.0));
        }
        let RetrainOutcome::Retrained { baseline } = detector.retrain() else {
            panic!("expected retrain");
        };
        assert_eq!(baseline.median, 20.0);
        assert_eq!(baseline.sample_count, 5);
        assert_eq!(baseline.computed_at, later + Duration::minutes(2));
        assert_eq!(detector.baseline().unwrap().median, 20.0);
    }

    #[test]
    fn invalid_streamed_samples_are_skipped() {
        let mut detector = RobustDetector::new(RobustParams::default());
        detector.load_history(&series(&[90.0, 100.0, 110.0])).unwrap();
        let late = t0() + Duration::hours(1);
        assert!(detector.process_point(&Sample::new(late, f64::NAN), None).is_none());
        assert!(detector.process_point(&Sample::new(late, -1.0), None).is_none());

        let batch = [Sample::new(late, f64::INFINITY), Sample::new(late, 100.0)];
        let points = detector.process_batch(&batch, None);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].score, 0.0);
        assert_eq!(detector.history().len(), 1);
        assert_eq!(detector.buffer().len(), 4);
    }

    #[test]
    fn huge_window_loads_whole_history() {
        let config = DetectorConfig::default().with_window_days(200_000_000);
        let mut detector = RobustDetector::from_config(&config);
        let outcome = detector.load_history(&series(&[1.0, 2.0, 3.0])).unwrap();
        assert!(outcome.is_ready());
        assert_eq!(outcome.median(), Some(2.0));
    }

    #[test]
    fn bands_follow_baseline() {
        let mut detector = RobustDetector::new(RobustParams::default());
        assert_eq!(detector.bands(None), None);
        detector.load_history(&series(&[90.0, 100.0, 110.0])).unwrap();
        assert_eq!(detector.bands(Some(2.0)), Some((80.0, 120.0)));
    }
}
