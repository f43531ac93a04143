//! Rendering detection results for the CLI.
//!
//! Formats:
//! - `json`: one document with the fit outcome, statistics, config snapshot
//!   and scored points
//! - `jsonl`: one `point` record per line, then a closing `statistics` record
//! - `summary`: a single status line

use chrono::{DateTime, Utc};
use serde::Serialize;
use ta_common::{DetectorStatistics, OutputFormat, ScoredPoint, SCHEMA_VERSION};
use ta_config::{ConfigSnapshot, StrategyKind};

use crate::detect::{FitSummary, LoadOutcome, RetrainOutcome};

/// Everything one `detect` run reports.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionReport {
    pub schema_version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub strategy: StrategyKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    pub load: LoadOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub retrains: Vec<RetrainOutcome>,
    pub statistics: DetectorStatistics,
    pub config: ConfigSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Whether `results` was filtered to anomalies.
    pub anomalies_only: bool,
    pub results: Vec<ScoredPoint>,
}

impl DetectionReport {
    pub fn anomaly_count(&self) -> usize {
        self.statistics.total_anomalies
    }

    /// Drop normal points from `results`.
    pub fn retain_anomalies(&mut self) {
        self.results.retain(|p| p.is_anomaly);
        self.anomalies_only = true;
    }
}

/// Builder-style constructor used by the CLI.
pub struct ReportInput<'a> {
    pub run_id: &'a str,
    pub input: Option<String>,
    pub strategy: StrategyKind,
    pub load: LoadOutcome,
    pub retrains: Vec<RetrainOutcome>,
    pub statistics: DetectorStatistics,
    pub config: ConfigSnapshot,
    pub warnings: Vec<String>,
    pub results: Vec<ScoredPoint>,
}

impl From<ReportInput<'_>> for DetectionReport {
    fn from(input: ReportInput<'_>) -> Self {
        DetectionReport {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: input.run_id.to_string(),
            generated_at: Utc::now(),
            strategy: input.strategy,
            input: input.input,
            load: input.load,
            retrains: input.retrains,
            statistics: input.statistics,
            config: input.config,
            warnings: input.warnings,
            anomalies_only: false,
            results: input.results,
        }
    }
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum JsonlRecord<'a> {
    Point(&'a ScoredPoint),
    Statistics {
        run_id: &'a str,
        strategy: StrategyKind,
        statistics: &'a DetectorStatistics,
    },
}

/// Render `report` in `format`. The returned text has no trailing newline.
pub fn render(report: &DetectionReport, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Jsonl => render_jsonl(report),
        OutputFormat::Summary => Ok(render_summary(report)),
    }
}

fn render_jsonl(report: &DetectionReport) -> Result<String, serde_json::Error> {
    let mut lines = report
        .results
        .iter()
        .map(|p| serde_json::to_string(&JsonlRecord::Point(p)))
        .collect::<Result<Vec<_>, _>>()?;
    lines.push(serde_json::to_string(&JsonlRecord::Statistics {
        run_id: &report.run_id,
        strategy: report.strategy,
        statistics: &report.statistics,
    })?);
    Ok(lines.join("\n"))
}

/// One-line status, e.g.
/// `[run-1a2b3c4d5e6f] robust: 1440 points, 3 anomalies (median=812.00 spread=41.20)`.
pub fn render_summary(report: &DetectionReport) -> String {
    let stats = &report.statistics;
    let detail = match &report.load {
        LoadOutcome::Uninitialized { .. } => " (not ready: no history)".to_string(),
        LoadOutcome::Ready {
            summary: FitSummary::Robust(baseline),
        } => {
            let widened = if baseline.window_widened {
                ", window widened"
            } else {
                ""
            };
            format!(
                " (median={:.2} spread={:.2}{})",
                stats.baseline_median.unwrap_or(baseline.median),
                stats.baseline_spread.unwrap_or(baseline.spread),
                widened
            )
        }
        LoadOutcome::Ready {
            summary: FitSummary::Ensemble(ensemble),
        } => format!(
            " ({} trees, subsample {})",
            ensemble.n_estimators, ensemble.subsample_size
        ),
    };
    format!(
        "[{}] {}: {} points, {} anomalies{}",
        report.run_id, report.strategy, stats.points_processed, stats.total_anomalies, detail
    )
}
