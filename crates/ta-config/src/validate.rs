//! Configuration validation errors and semantic validation.

use crate::detector::DetectorConfig;
use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::InvalidValue { .. } => 11,
            ValidationError::VersionMismatch { .. } => 13,
        }
    }

    fn invalid(field: &str, message: String) -> Self {
        ValidationError::InvalidValue {
            field: field.to_string(),
            message,
        }
    }
}

impl From<ValidationError> for ta_common::Error {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InvalidValue { field, message } => {
                ta_common::Error::InvalidConfig { field, message }
            }
            other => ta_common::Error::Config(other.to_string()),
        }
    }
}

/// Outcome of a successful validation: values outside their typical
/// operating range are accepted but reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    fn warn_outside(&mut self, field: &str, value: f64, lo: f64, hi: f64) {
        if value < lo || value > hi {
            self.warnings.push(format!(
                "{} = {} is outside the typical range [{}, {}]",
                field, value, lo, hi
            ));
        }
    }
}

/// Validate a detector configuration semantically.
pub fn validate_detector_config(config: &DetectorConfig) -> ValidationResult<ValidationReport> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.window_days == 0 {
        return Err(ValidationError::invalid(
            "window_days",
            "Must be a positive number of days, got 0".to_string(),
        ));
    }

    if !config.threshold.is_finite() || config.threshold <= 0.0 {
        return Err(ValidationError::invalid(
            "threshold",
            format!("Must be a positive finite number, got {}", config.threshold),
        ));
    }

    // Strictly inside (0, 0.5): an expected proportion of zero or one half
    // leaves the ensemble's decision offset undefined.
    if !(config.contamination > 0.0 && config.contamination < 0.5) {
        return Err(ValidationError::invalid(
            "contamination",
            format!("Must be in (0, 0.5), got {}", config.contamination),
        ));
    }

    if config.n_estimators == 0 {
        return Err(ValidationError::invalid(
            "n_estimators",
            "Must be at least 1".to_string(),
        ));
    }

    if config.max_samples < 2 {
        return Err(ValidationError::invalid(
            "max_samples",
            format!("Must be at least 2, got {}", config.max_samples),
        ));
    }

    if config.minutes_per_day == 0 {
        return Err(ValidationError::invalid(
            "minutes_per_day",
            "Must be at least 1".to_string(),
        ));
    }

    let mut report = ValidationReport::default();
    report.warn_outside("window_days", config.window_days as f64, 7.0, 90.0);
    report.warn_outside("threshold", config.threshold, 1.5, 5.0);
    report.warn_outside("contamination", config.contamination, 0.001, 0.1);
    Ok(report)
}
