//! Reading samples from CSV, JSON and JSON-lines files.
//!
//! CSV needs a header naming `timestamp` and `intensity` columns; any other
//! columns are ignored. Naive timestamps are taken as UTC. Every rejected
//! row is reported with its 1-based line number.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use ta_common::Sample;

/// Naive timestamp layouts accepted besides RFC 3339.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("cannot infer input format of {path} (expected .csv, .json or .jsonl)")]
    UnsupportedFormat { path: PathBuf },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<InputError> for ta_common::Error {
    fn from(err: InputError) -> Self {
        match err {
            InputError::Io { source, .. } => ta_common::Error::Io(source),
            InputError::Malformed { line, reason } => ta_common::Error::MalformedInput {
                location: format!("line {line}"),
                reason,
            },
            InputError::UnsupportedFormat { path } => {
                ta_common::Error::UnsupportedInput(path.display().to_string())
            }
            InputError::Json(e) => ta_common::Error::MalformedInput {
                location: format!("line {}", e.line()),
                reason: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    Csv,
    Json,
    Jsonl,
}

impl InputFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(InputFormat::Csv),
            "json" => Some(InputFormat::Json),
            "jsonl" | "ndjson" => Some(InputFormat::Jsonl),
            _ => None,
        }
    }
}

/// Parse a timestamp in any accepted layout.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn sample_at(line: usize, timestamp: &str, intensity: f64) -> Result<Sample, InputError> {
    let timestamp = parse_timestamp(timestamp).ok_or_else(|| InputError::Malformed {
        line,
        reason: format!("unparsable timestamp {:?}", timestamp.trim()),
    })?;
    let sample = Sample::new(timestamp, intensity);
    sample
        .validate()
        .map_err(|reason| InputError::Malformed { line, reason })?;
    Ok(sample)
}

fn line_of(position: Option<&csv::Position>) -> usize {
    position.map_or(1, |p| p.line() as usize)
}

fn csv_error(err: csv::Error) -> InputError {
    InputError::Malformed {
        line: line_of(err.position()),
        reason: err.to_string(),
    }
}

/// Parse CSV text with a header row.
pub fn parse_csv(text: &str) -> Result<Vec<Sample>, InputError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers().map_err(csv_error)?.clone();
    let header_line = line_of(header.position());
    let find = |name: &str| {
        header
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .ok_or_else(|| InputError::Malformed {
                line: header_line,
                reason: format!("missing column {name:?} in header"),
            })
    };
    let ts_col = find("timestamp")?;
    let value_col = find("intensity")?;

    reader
        .records()
        .map(|record| {
            let record = record.map_err(csv_error)?;
            let line = line_of(record.position());
            let field = |col: usize, name: &str| {
                record
                    .get(col)
                    .filter(|f| !f.is_empty())
                    .ok_or_else(|| InputError::Malformed {
                        line,
                        reason: format!("missing {name}"),
                    })
            };
            let ts = field(ts_col, "timestamp")?;
            let raw = field(value_col, "intensity")?;
            let intensity = raw.parse::<f64>().map_err(|_| InputError::Malformed {
                line,
                reason: format!("intensity {raw:?} is not a number"),
            })?;
            sample_at(line, ts, intensity)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RawSample {
    timestamp: Option<String>,
    intensity: Option<f64>,
}

fn from_raw(line: usize, raw: RawSample) -> Result<Sample, InputError> {
    let timestamp = raw.timestamp.ok_or_else(|| InputError::Malformed {
        line,
        reason: "missing timestamp".to_string(),
    })?;
    let intensity = raw.intensity.ok_or_else(|| InputError::Malformed {
        line,
        reason: "missing intensity".to_string(),
    })?;
    sample_at(line, &timestamp, intensity)
}

/// Parse a JSON array of `{timestamp, intensity}` objects.
///
/// Errors in an element report the element's 1-based position.
pub fn parse_json(text: &str) -> Result<Vec<Sample>, InputError> {
    let records: Vec<RawSample> = serde_json::from_str(text)?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, raw)| from_raw(i + 1, raw))
        .collect()
}

/// Parse one JSON object per line; blank lines are skipped.
pub fn parse_jsonl(text: &str) -> Result<Vec<Sample>, InputError> {
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| {
            let line = i + 1;
            let raw: RawSample = serde_json::from_str(l).map_err(|e| InputError::Malformed {
                line,
                reason: e.to_string(),
            })?;
            from_raw(line, raw)
        })
        .collect()
}

pub fn parse_samples(text: &str, format: InputFormat) -> Result<Vec<Sample>, InputError> {
    match format {
        InputFormat::Csv => parse_csv(text),
        InputFormat::Json => parse_json(text),
        InputFormat::Jsonl => parse_jsonl(text),
    }
}

/// Read samples from a file, inferring the format from its extension when
/// none is given.
pub fn read_samples(path: &Path, format: Option<InputFormat>) -> Result<Vec<Sample>, InputError> {
    let format = format
        .or_else(|| InputFormat::from_path(path))
        .ok_or_else(|| InputError::UnsupportedFormat {
            path: path.to_path_buf(),
        })?;
    let text = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_samples(&text, format)
}
