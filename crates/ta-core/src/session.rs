//! Explicit detection context owned by the host.
//!
//! A [`DetectionSession`] holds the loaded dataset, the active config, the
//! detector built from it and the latest batch results. Hosts construct one
//! and pass it around; the engine keeps no process-wide state.
//!
//! Every config change goes through [`DetectionSession::reconfigure`], which
//! builds a fresh detector and replays the load flow. An existing detector
//! is never mutated to match new parameters.

use chrono::{DateTime, Utc};
use ta_common::{DetectorStatistics, Sample, ScoredPoint};
use ta_config::{validate_detector_config, DetectorConfig, StrategyKind};

use crate::detect::{
    build_detector, validate_samples, AnomalyDetector, DetectorState, LoadOutcome, RetrainOutcome,
};
use crate::logging::event_names;

/// One fitted detector plus the results of scoring its own history.
struct Fitted {
    detector: Box<dyn AnomalyDetector>,
    outcome: LoadOutcome,
    results: Vec<ScoredPoint>,
}

fn fit(config: &DetectorConfig, samples: &[Sample]) -> Result<Fitted, ta_common::Error> {
    let mut detector = build_detector(config);
    let outcome = detector.load_history(samples)?;
    let results = detector.process_batch(samples, None);
    tracing::info!(
        event = event_names::BATCH_SCORED,
        stage = "score",
        strategy = %config.strategy,
        points = results.len() as u64,
        anomalies = results.iter().filter(|p| p.is_anomaly).count() as u64,
        "history scored"
    );
    Ok(Fitted {
        detector,
        outcome,
        results,
    })
}

pub struct DetectionSession {
    config: DetectorConfig,
    warnings: Vec<String>,
    dataset: Vec<Sample>,
    detector: Box<dyn AnomalyDetector>,
    results: Vec<ScoredPoint>,
    last_load: Option<LoadOutcome>,
}

impl DetectionSession {
    /// Validate `config` and start with an unloaded detector.
    pub fn new(config: DetectorConfig) -> Result<Self, ta_common::Error> {
        let report = validate_detector_config(&config)?;
        Ok(Self {
            detector: build_detector(&config),
            config,
            warnings: report.warnings,
            dataset: Vec::new(),
            results: Vec::new(),
            last_load: None,
        })
    }

    /// Replace the dataset, fit a new detector on it and score it.
    ///
    /// Samples are stably sorted by timestamp first. On error the session
    /// keeps its previous dataset, detector and results.
    pub fn load_dataset(&mut self, mut samples: Vec<Sample>) -> Result<LoadOutcome, ta_common::Error> {
        samples.sort_by_key(|s| s.timestamp);
        let fitted = fit(&self.config, &samples)?;
        self.dataset = samples;
        Ok(self.commit(fitted))
    }

    /// Switch to `config`, rebuilding the detector and replaying the load
    /// flow over the current dataset.
    ///
    /// Returns `None` when no dataset has been loaded yet.
    pub fn reconfigure(
        &mut self,
        config: DetectorConfig,
    ) -> Result<Option<LoadOutcome>, ta_common::Error> {
        let report = validate_detector_config(&config)?;
        if self.last_load.is_none() {
            self.detector = build_detector(&config);
            self.config = config;
            self.warnings = report.warnings;
            return Ok(None);
        }

        let fitted = fit(&config, &self.dataset)?;
        self.config = config;
        self.warnings = report.warnings;
        Ok(Some(self.commit(fitted)))
    }

    /// Score one streamed sample against the current detector.
    ///
    /// The sample is not added to the dataset, so a later `reconfigure`
    /// replays only what was loaded.
    pub fn process_point(&mut self, sample: &Sample) -> Result<Option<ScoredPoint>, ta_common::Error> {
        validate_samples(std::slice::from_ref(sample))?;
        let point = self.detector.process_point(sample, None);
        if let Some(point) = &point {
            self.results.push(point.clone());
        }
        Ok(point)
    }

    pub fn retrain(&mut self) -> RetrainOutcome {
        self.detector.retrain()
    }

    fn commit(&mut self, fitted: Fitted) -> LoadOutcome {
        self.detector = fitted.detector;
        self.results = fitted.results;
        self.last_load = Some(fitted.outcome.clone());
        fitted.outcome
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Values accepted by validation but outside their typical range.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn strategy(&self) -> StrategyKind {
        self.detector.strategy()
    }

    pub fn state(&self) -> DetectorState {
        self.detector.state()
    }

    pub fn dataset(&self) -> &[Sample] {
        &self.dataset
    }

    pub fn detector(&self) -> &dyn AnomalyDetector {
        self.detector.as_ref()
    }

    /// Results of the last load plus any streamed points since.
    pub fn results(&self) -> &[ScoredPoint] {
        &self.results
    }

    pub fn anomalies(&self) -> impl Iterator<Item = &ScoredPoint> {
        self.results.iter().filter(|p| p.is_anomaly)
    }

    pub fn last_load(&self) -> Option<&LoadOutcome> {
        self.last_load.as_ref()
    }

    pub fn statistics(&self) -> DetectorStatistics {
        self.detector.get_statistics()
    }

    pub fn statistics_at(&self, now: DateTime<Utc>) -> DetectorStatistics {
        self.detector.statistics_at(now)
    }
}

impl std::fmt::Debug for DetectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionSession")
            .field("strategy", &self.detector.strategy())
            .field("state", &self.detector.state())
            .field("dataset_len", &self.dataset.len())
            .field("results_len", &self.results.len())
            .finish()
    }
}
