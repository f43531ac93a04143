//! Anomaly scoring engine.
//!
//! Two interchangeable strategies behind one trait:
//! - [`RobustDetector`]: median/MAD baseline over a trailing window, O(1)
//!   per point, optional re-baselining from a bounded history buffer
//! - [`EnsembleDetector`]: isolation forest fitted over the whole history
//!
//! Expected operating states (not ready, degenerate spread, widened
//! window, short retrain buffer) are return values. Only malformed samples
//! and an empty ensemble fit are errors.

pub mod baseline;
pub mod ensemble;
pub mod error;
pub mod facade;
pub mod history;
pub mod robust;
pub mod window;

pub use baseline::{estimate_baseline, estimate_from_values, Baseline};
pub use ensemble::{EnsembleDetector, EnsembleParams, Feature, FeatureSet, ForestParams, IsolationForest};
pub use error::{validate_samples, DetectError};
pub use facade::{
    build_detector, AnomalyDetector, BaselineReport, DetectorState, EnsembleReport, FitSummary,
    LoadOutcome, RetrainOutcome, ScoreLog,
};
pub use history::HistoryBuffer;
pub use robust::{score_against, RobustDetector, RobustParams, Verdict};
pub use window::{Window, WindowSelector, DEFAULT_MIN_WINDOW_POINTS};
