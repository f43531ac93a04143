//! Traffic Anomaly Core - scoring engine CLI
//!
//! The main entry point for ta-core, handling:
//! - Loading a traffic-intensity history and scoring every point
//! - Optional streaming of further samples with periodic re-baselining
//! - Configuration inspection and validation

use clap::{Args, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use ta_common::error::format_error_human;
use ta_common::{OutputFormat, StructuredError, SCHEMA_VERSION};
use ta_core::config::{
    list_presets, load_config, ConfigOptions, ConfigOverrides, DetectorConfig, NormalizationMode,
    PresetName, StrategyKind, CONFIG_SCHEMA_VERSION,
};
use ta_core::exit_codes::ExitCode;
use ta_core::input::{read_samples, InputFormat};
use ta_core::log_event;
use ta_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};
use ta_core::output::{render, DetectionReport, ReportInput};
use ta_core::DetectionSession;

/// Traffic Anomaly Core - flag unusual traffic intensity against a learned baseline
#[derive(Parser)]
#[command(name = "ta-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Detector config file (.json or .toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Named preset applied on top of the config file
    #[arg(long, global = true)]
    preset: Option<PresetName>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit on a history file and score every point in it
    Detect(DetectArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct DetectArgs {
    /// History file (.csv, .json or .jsonl)
    input: PathBuf,

    /// Input format; inferred from the extension when omitted
    #[arg(long)]
    input_format: Option<InputFormat>,

    /// Scoring strategy (robust or ensemble)
    #[arg(long)]
    strategy: Option<StrategyKind>,

    /// Trailing window length in days
    #[arg(long)]
    window_days: Option<u32>,

    /// Anomaly threshold in spreads
    #[arg(long)]
    threshold: Option<f64>,

    /// Expected anomaly proportion for the ensemble
    #[arg(long)]
    contamination: Option<f64>,

    /// Ensemble score rescaling (batch or reference)
    #[arg(long)]
    normalization: Option<NormalizationMode>,

    /// Seed for the ensemble
    #[arg(long)]
    seed: Option<u64>,

    /// Only print anomalous points (statistics still cover every point)
    #[arg(long)]
    anomalies_only: bool,

    /// Re-baseline from the history buffer once scoring is done
    #[arg(long)]
    retrain: bool,

    /// Further samples to stream through the fitted detector one at a time
    #[arg(long)]
    score: Option<PathBuf>,

    /// While streaming, re-baseline after every N points
    #[arg(long, requires = "score", value_parser = clap::value_parser!(u64).range(1..))]
    retrain_every: Option<u64>,
}

impl DetectArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            strategy: self.strategy,
            window_days: self.window_days,
            threshold: self.threshold,
            contamination: self.contamination,
            normalization: self.normalization,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,

    /// Validate a config file
    Validate {
        /// Config file to check
        path: PathBuf,
    },

    /// List the named presets
    Presets,

    /// Print the JSON schema of the config file
    Schema,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            std::process::exit(ExitCode::ArgsError.as_i32());
        }
        Err(err) => err.exit(),
    };

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    let log_config = LogConfig::from_env(cli_level, cli.global.log_format);
    init_logging(&log_config);

    let exit_code = match &cli.command {
        Commands::Detect(args) => run_detect(&cli.global, args),
        Commands::Config(args) => run_config(&cli.global, args),
        Commands::Version => print_version(&cli.global),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// detect
// ============================================================================

fn run_detect(global: &GlobalOpts, args: &DetectArgs) -> ExitCode {
    let ctx = LogContext::new(generate_run_id()).with_source(args.input.display().to_string());
    log_event!(ctx, INFO, event_names::RUN_STARTED, Stage::Init, "detection run started");

    let mut report = match detect(global, args, &ctx) {
        Ok(report) => report,
        Err(err) => return output_error(global, &ctx, &err),
    };

    let exit_code = if report.anomaly_count() > 0 {
        ExitCode::AnomaliesFound
    } else {
        ExitCode::Clean
    };
    if args.anomalies_only {
        report.retain_anomalies();
    }

    let text = match render(&report, global.format) {
        Ok(text) => text,
        Err(err) => return output_error(global, &ctx, &ta_common::Error::from(err)),
    };
    println!("{}", text);

    log_event!(
        ctx,
        INFO,
        event_names::RUN_FINISHED,
        Stage::Report,
        "detection run finished",
        points = report.statistics.points_processed as u64,
        anomalies = report.statistics.total_anomalies as u64,
        exit_code = exit_code.as_i32()
    );
    exit_code
}

fn detect(
    global: &GlobalOpts,
    args: &DetectArgs,
    ctx: &LogContext,
) -> Result<DetectionReport, ta_common::Error> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        preset: global.preset,
        overrides: args.overrides(),
    };
    let resolved = load_config(&options)?;
    let config_source = resolved.source.to_string();
    log_event!(
        ctx,
        INFO,
        event_names::CONFIG_LOADED,
        Stage::Init,
        "configuration resolved",
        config_source = config_source.as_str(),
        strategy = resolved.config.strategy.as_str()
    );
    for warning in &resolved.warnings {
        log_event!(ctx, WARN, event_names::CONFIG_WARNING, Stage::Init, warning.as_str());
    }

    let samples = read_samples(&args.input, args.input_format)?;
    log_event!(
        ctx,
        INFO,
        event_names::SAMPLES_READ,
        Stage::Load,
        "history read",
        samples = samples.len() as u64
    );

    let mut session = DetectionSession::new(resolved.config.clone())?;
    let load = session.load_dataset(samples)?;
    let mut retrains = Vec::new();

    if let Some(path) = &args.score {
        let stream = read_samples(path, args.input_format)?;
        log_event!(
            ctx,
            INFO,
            event_names::SAMPLES_READ,
            Stage::Score,
            "stream read",
            samples = stream.len() as u64
        );
        for (i, sample) in stream.iter().enumerate() {
            session.process_point(sample)?;
            if let Some(every) = args.retrain_every {
                if (i as u64 + 1) % every == 0 {
                    retrains.push(session.retrain());
                }
            }
        }
    }

    if args.retrain {
        retrains.push(session.retrain());
    }

    Ok(ReportInput {
        run_id: &ctx.run_id,
        input: Some(args.input.display().to_string()),
        strategy: session.strategy(),
        load,
        retrains,
        statistics: session.statistics(),
        config: resolved.snapshot,
        warnings: resolved.warnings,
        results: session.results().to_vec(),
    }
    .into())
}

// ============================================================================
// config
// ============================================================================

fn run_config(global: &GlobalOpts, args: &ConfigArgs) -> ExitCode {
    let ctx = LogContext::new(generate_run_id());
    match &args.command {
        ConfigCommands::Show => run_config_show(global, &ctx),
        ConfigCommands::Validate { path } => run_config_validate(global, &ctx, path),
        ConfigCommands::Presets => run_config_presets(global),
        ConfigCommands::Schema => {
            let schema = schemars::schema_for!(DetectorConfig);
            print_json(&schema)
        }
    }
}

/// Display the effective configuration (defaults if no file is found).
fn run_config_show(global: &GlobalOpts, ctx: &LogContext) -> ExitCode {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        preset: global.preset,
        overrides: ConfigOverrides::default(),
    };
    let resolved = match load_config(&options) {
        Ok(resolved) => resolved,
        Err(err) => return output_error(global, ctx, &err),
    };

    match global.format {
        OutputFormat::Summary => {
            let config = &resolved.config;
            println!(
                "config: source={} strategy={} window_days={} threshold={} contamination={}",
                resolved.source,
                config.strategy,
                config.window_days,
                config.threshold,
                config.contamination
            );
            ExitCode::Clean
        }
        _ => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "source": resolved.source.to_string(),
            "path": resolved.path.as_ref().map(|p| p.display().to_string()),
            "preset": global.preset,
            "file_hash": resolved.snapshot.file_hash,
            "effective_hash": resolved.snapshot.effective_hash,
            "warnings": resolved.warnings,
            "config": resolved.config,
        })),
    }
}

fn run_config_validate(global: &GlobalOpts, ctx: &LogContext, path: &std::path::Path) -> ExitCode {
    let options = ConfigOptions {
        config_path: Some(path.to_path_buf()),
        ..ConfigOptions::default()
    };
    let resolved = match load_config(&options) {
        Ok(resolved) => resolved,
        Err(err) => return output_error(global, ctx, &err),
    };

    match global.format {
        OutputFormat::Summary => {
            println!(
                "config validate: OK ({} warnings) {}",
                resolved.warnings.len(),
                path.display()
            );
            ExitCode::Clean
        }
        _ => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "status": "valid",
            "path": path.display().to_string(),
            "file_hash": resolved.snapshot.file_hash,
            "warnings": resolved.warnings,
        })),
    }
}

fn run_config_presets(global: &GlobalOpts) -> ExitCode {
    let presets = list_presets();
    match global.format {
        OutputFormat::Summary => {
            for preset in &presets {
                println!("{}: {}", preset.name, preset.description);
            }
            ExitCode::Clean
        }
        _ => print_json(&presets),
    }
}

fn print_version(global: &GlobalOpts) -> ExitCode {
    match global.format {
        OutputFormat::Summary => {
            println!("ta-core {}", env!("CARGO_PKG_VERSION"));
            ExitCode::Clean
        }
        _ => print_json(&serde_json::json!({
            "schema_version": SCHEMA_VERSION,
            "config_schema_version": CONFIG_SCHEMA_VERSION,
            "ta_core_version": env!("CARGO_PKG_VERSION"),
        })),
    }
}

// ============================================================================
// helpers
// ============================================================================

fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Clean
        }
        Err(err) => {
            eprintln!("failed to serialize output: {}", err);
            ExitCode::InternalError
        }
    }
}

/// Report an error on stderr in the appropriate format.
fn output_error(global: &GlobalOpts, ctx: &LogContext, error: &ta_common::Error) -> ExitCode {
    let exit_code = ExitCode::for_error(error);
    log_event!(
        ctx,
        ERROR,
        event_names::INTERNAL_ERROR,
        Stage::Report,
        "run failed",
        code = error.code(),
        exit_code = exit_code.as_i32()
    );

    match global.format {
        OutputFormat::Summary => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(error, use_color));
        }
        _ => {
            let response = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "run_id": ctx.run_id,
                "status": "error",
                "exit_code": exit_code.code_name(),
                "error": StructuredError::from(error),
            });
            eprintln!("{}", response);
        }
    }

    exit_code
}
