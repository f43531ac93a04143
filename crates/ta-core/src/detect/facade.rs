//! The strategy-agnostic detector contract and its shared result types.
//!
//! A host picks a strategy once, through [`build_detector`], and from then
//! on only talks to `dyn AnomalyDetector`. Changing configuration means
//! building a new detector; nothing here mutates parameters in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ta_common::{DetectorStatistics, Sample, ScoredPoint};
use ta_config::{DetectorConfig, StrategyKind};
use ta_math::SpreadSource;

use super::baseline::Baseline;
use super::ensemble::EnsembleDetector;
use super::error::DetectError;
use super::robust::RobustDetector;
use crate::logging::event_names;

/// Lifecycle of one detector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorState {
    /// No usable model; scoring yields nothing.
    Uninitialized,
    /// A baseline or ensemble is loaded.
    Ready,
}

/// What a robust `load_history` fitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineReport {
    pub median: f64,
    pub spread: f64,
    pub spread_source: SpreadSource,
    pub computed_at: DateTime<Utc>,
    pub sample_count: usize,
    /// The trailing window was too thin and the full history was used.
    pub window_widened: bool,
}

impl BaselineReport {
    pub fn new(baseline: &Baseline, window_widened: bool) -> Self {
        Self {
            median: baseline.median,
            spread: baseline.spread,
            spread_source: baseline.spread_source,
            computed_at: baseline.computed_at,
            sample_count: baseline.sample_count,
            window_widened,
        }
    }
}

/// What an ensemble `load_history` fitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleReport {
    pub sample_count: usize,
    pub n_estimators: usize,
    pub subsample_size: usize,
    /// Raw-score cut below which a point is labelled anomalous.
    pub offset: f64,
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FitSummary {
    Robust(BaselineReport),
    Ensemble(EnsembleReport),
}

/// Result of `load_history`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadOutcome {
    Ready { summary: FitSummary },
    /// No data to fit; the baseline is undefined.
    Uninitialized { sample_count: usize },
}

impl LoadOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, LoadOutcome::Ready { .. })
    }

    pub fn sample_count(&self) -> usize {
        match self {
            LoadOutcome::Ready {
                summary: FitSummary::Robust(report),
            } => report.sample_count,
            LoadOutcome::Ready {
                summary: FitSummary::Ensemble(report),
            } => report.sample_count,
            LoadOutcome::Uninitialized { sample_count } => *sample_count,
        }
    }

    /// Baseline median, for the robust strategy only.
    pub fn median(&self) -> Option<f64> {
        match self {
            LoadOutcome::Ready {
                summary: FitSummary::Robust(report),
            } => Some(report.median),
            _ => None,
        }
    }

    /// Baseline spread, for the robust strategy only.
    pub fn spread(&self) -> Option<f64> {
        match self {
            LoadOutcome::Ready {
                summary: FitSummary::Robust(report),
            } => Some(report.spread),
            _ => None,
        }
    }
}

/// Result of `retrain`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetrainOutcome {
    Retrained { baseline: Baseline },
    NotEnoughData { available: usize, required: usize },
    /// The strategy has no incremental re-baselining.
    Unsupported,
}

/// Append-only record of every scored point and the anomalous subset.
#[derive(Debug, Clone, Default)]
pub struct ScoreLog {
    history: Vec<ScoredPoint>,
    anomalies: Vec<ScoredPoint>,
}

impl ScoreLog {
    pub fn record(&mut self, point: &ScoredPoint) {
        self.history.push(point.clone());
        if point.is_anomaly {
            tracing::trace!(
                event = event_names::SCORE_ANOMALY,
                stage = "score",
                timestamp = %point.timestamp,
                intensity = point.intensity,
                score = point.score,
            );
            self.anomalies.push(point.clone());
        }
    }

    pub fn history(&self) -> &[ScoredPoint] {
        &self.history
    }

    pub fn anomalies(&self) -> &[ScoredPoint] {
        &self.anomalies
    }

    pub fn last_anomaly_timestamp(&self) -> Option<DateTime<Utc>> {
        self.anomalies.last().map(|p| p.timestamp)
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.anomalies.clear();
    }
}

/// The contract both scoring strategies implement.
///
/// One instance has one owner; callers feeding it from several producers
/// must serialize access themselves.
pub trait AnomalyDetector: Send {
    fn strategy(&self) -> StrategyKind;

    fn state(&self) -> DetectorState;

    /// Discard all prior state and fit on `samples`.
    fn load_history(&mut self, samples: &[Sample]) -> Result<LoadOutcome, DetectError>;

    /// Score one sample. `None` means the detector is not ready or the
    /// sample fails [`Sample::validate`]; invalid samples leave no trace.
    ///
    /// `threshold` overrides the configured one for this call; strategies
    /// that label points themselves ignore it.
    fn process_point(&mut self, sample: &Sample, threshold: Option<f64>) -> Option<ScoredPoint>;

    /// Score samples in the order given, dropping not-ready results.
    fn process_batch(&mut self, samples: &[Sample], threshold: Option<f64>) -> Vec<ScoredPoint> {
        samples
            .iter()
            .filter_map(|sample| self.process_point(sample, threshold))
            .collect()
    }

    fn retrain(&mut self) -> RetrainOutcome {
        RetrainOutcome::Unsupported
    }

    fn score_log(&self) -> &ScoreLog;

    fn history(&self) -> &[ScoredPoint] {
        self.score_log().history()
    }

    fn anomalies(&self) -> &[ScoredPoint] {
        self.score_log().anomalies()
    }

    /// Summary statistics, with baseline age measured against `now`.
    fn statistics_at(&self, now: DateTime<Utc>) -> DetectorStatistics;

    fn get_statistics(&self) -> DetectorStatistics {
        self.statistics_at(Utc::now())
    }
}

/// Build the detector a configuration selects.
pub fn build_detector(config: &DetectorConfig) -> Box<dyn AnomalyDetector> {
    match config.strategy {
        StrategyKind::Robust => Box::new(RobustDetector::from_config(config)),
        StrategyKind::Ensemble => Box::new(EnsembleDetector::from_config(config)),
    }
}
