//! Error types for traffic anomaly detection.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! Only faults live here. Expected operating states (no baseline yet, a
//! degenerate spread, a widened window) are reported through return values
//! and statistics, never through this type.
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Malformed Input
//!   Reason: malformed input at line 14: unparsable timestamp "2024-13-01"
//!   Fix: Check that every row has a timestamp and a non-negative intensity.
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for traffic anomaly operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file or parameter errors.
    Config,
    /// Sample input errors (missing fields, bad timestamps).
    Input,
    /// Model fitting errors.
    Detection,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Detection => write!(f, "detection"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for traffic anomaly detection.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    // Input errors (20-29)
    #[error("malformed input at {location}: {reason}")]
    MalformedInput { location: String, reason: String },

    #[error("unsupported input format: {0}")]
    UnsupportedInput(String),

    // Detection errors (30-39)
    #[error("empty feature set: the ensemble needs at least one sample to fit")]
    EmptyFeatureSet,

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the error code for this error type.
    ///
    /// Error codes are stable and grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Input errors
    /// - 30-39: Detection errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig { .. } => 11,
            Error::UnknownPreset(_) => 12,
            Error::MalformedInput { .. } => 20,
            Error::UnsupportedInput(_) => 21,
            Error::EmptyFeatureSet => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig { .. } | Error::UnknownPreset(_) => {
                ErrorCategory::Config
            }
            Error::MalformedInput { .. } | Error::UnsupportedInput(_) => ErrorCategory::Input,
            Error::EmptyFeatureSet => ErrorCategory::Detection,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller
    /// (fixing the input or configuration and retrying).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) => true,
            Error::InvalidConfig { .. } => true,
            Error::UnknownPreset(_) => true,

            // Bad rows have no safe default; the data has to be fixed.
            Error::MalformedInput { .. } => false,
            Error::UnsupportedInput(_) => true,

            Error::EmptyFeatureSet => false,

            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => {
                "Run 'ta-core config validate <file>' to check syntax and values."
            }
            Error::InvalidConfig { .. } => {
                "Adjust the reported field. 'ta-core config show' prints the effective configuration."
            }
            Error::UnknownPreset(_) => "List available presets with 'ta-core config presets'.",
            Error::MalformedInput { .. } => {
                "Check that every row has a timestamp and a non-negative intensity."
            }
            Error::UnsupportedInput(_) => {
                "Provide a .csv (timestamp,intensity), .json (array) or .jsonl file."
            }
            Error::EmptyFeatureSet => {
                "The ensemble strategy needs history to fit. Load a non-empty dataset first."
            }
            Error::Io(_) => "Check that the file exists and is readable.",
            Error::Json(_) => "Invalid JSON. Check syntax with 'jq . <file>'.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig { .. } => "Invalid Configuration Value",
            Error::UnknownPreset(_) => "Unknown Preset",
            Error::MalformedInput { .. } => "Malformed Input",
            Error::UnsupportedInput(_) => "Unsupported Input Format",
            Error::EmptyFeatureSet => "Empty Feature Set",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Parse Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., field, line).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidConfig { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            Error::MalformedInput { location, .. } => {
                context.insert("location".to_string(), serde_json::json!(location));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        red = red,
        cyan = cyan,
        reset = reset,
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed() -> Error {
        Error::MalformedInput {
            location: "line 14".to_string(),
            reason: "unparsable timestamp \"2024-13-01\"".to_string(),
        }
    }

    #[test]
    fn test_error_code() {
        assert_eq!(Error::Config("bad".into()).code(), 10);
        assert_eq!(malformed().code(), 20);
        assert_eq!(Error::EmptyFeatureSet.code(), 30);
    }

    #[test]
    fn test_error_category() {
        assert_eq!(Error::UnknownPreset("x".into()).category(), ErrorCategory::Config);
        assert_eq!(malformed().category(), ErrorCategory::Input);
        assert_eq!(Error::EmptyFeatureSet.category(), ErrorCategory::Detection);
    }

    #[test]
    fn test_error_recoverable() {
        assert!(Error::Config("bad".into()).is_recoverable());
        assert!(!malformed().is_recoverable());
        assert!(!Error::EmptyFeatureSet.is_recoverable());
    }

    #[test]
    fn test_structured_error_carries_location() {
        let structured = StructuredError::from(&malformed());
        assert_eq!(structured.code, 20);
        assert_eq!(structured.category, ErrorCategory::Input);
        assert_eq!(
            structured.context.get("location"),
            Some(&serde_json::json!("line 14"))
        );
        let json = structured.to_json();
        assert!(json.contains(r#""category":"input""#));
        assert!(json.contains(r#""recoverable":false"#));
    }

    #[test]
    fn test_format_error_human() {
        let formatted = format_error_human(&malformed(), false);
        assert!(formatted.contains("Malformed Input"));
        assert!(formatted.contains("line 14"));
        assert!(formatted.contains("non-negative intensity"));
    }

    #[test]
    fn test_error_category_display() {
        assert_eq!(ErrorCategory::Config.to_string(), "config");
        assert_eq!(ErrorCategory::Detection.to_string(), "detection");
    }
}
