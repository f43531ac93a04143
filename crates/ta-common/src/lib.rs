//! Traffic anomaly common types and errors.
//!
//! This crate provides the records shared between the scoring engine and
//! whatever host drives it:
//! - Input samples and scored result records
//! - Detector statistics snapshots
//! - The unified error type with stable codes
//! - Output format specifications

pub mod error;
pub mod output;
pub mod record;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use output::OutputFormat;
pub use record::{DetectorStatistics, Sample, ScoredPoint};

/// Schema version for serialized result records.
pub const SCHEMA_VERSION: &str = "1.0.0";
