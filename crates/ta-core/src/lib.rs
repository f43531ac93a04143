//! Traffic Anomaly Core Library
//!
//! This library provides the scoring engine and its host-side plumbing:
//! - Robust (median/MAD) and ensemble (isolation forest) detectors behind
//!   one trait
//! - An explicit detection session owned by the host
//! - Configuration loading with presets and per-run overrides
//! - Sample input parsing (CSV, JSON, JSON lines)
//! - Structured logging and exit codes for CLI operations
//!
//! The binary entry point is in `main.rs`.

pub mod config;
pub mod detect;
pub mod exit_codes;
pub mod input;
pub mod logging;
pub mod output;
pub mod session;

pub use detect::{build_detector, AnomalyDetector, DetectorState, LoadOutcome, RetrainOutcome};
pub use session::DetectionSession;
