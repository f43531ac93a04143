//! Logging configuration.
//!
//! Sources, lowest precedence first: `RUST_LOG` (passed through as a raw
//! filter directive), `TA_LOG` / `TA_LOG_FORMAT`, then `-v`, `-q` and
//! `--log-format`.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

/// Log output format on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    #[value(alias = "json")]
    Jsonl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    #[value(alias = "warning")]
    Warn,
    Error,
    Off,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

/// Raw values read from the environment.
#[derive(Debug, Clone, Default)]
pub struct EnvSources {
    pub ta_log: Option<String>,
    pub ta_log_format: Option<String>,
    pub rust_log: Option<String>,
}

impl EnvSources {
    pub fn read() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            ta_log: var("TA_LOG"),
            ta_log_format: var("TA_LOG_FORMAT"),
            rust_log: var("RUST_LOG"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LogLevel,
    /// Full `EnvFilter` directive from `RUST_LOG`; replaces the per-crate
    /// level filter while set.
    pub directive: Option<String>,
    /// Timestamps on human output.
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            format: LogFormat::Human,
            level: LogLevel::Info,
            directive: None,
            timestamps: true,
        }
    }
}

impl LogConfig {
    /// Resolve from the process environment plus CLI values.
    pub fn from_env(cli_level: Option<LogLevel>, cli_format: Option<LogFormat>) -> Self {
        Self::resolve(&EnvSources::read(), cli_level, cli_format)
    }

    /// Unparsable `TA_LOG` or `TA_LOG_FORMAT` values are ignored.
    pub fn resolve(
        env: &EnvSources,
        cli_level: Option<LogLevel>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let mut config = LogConfig {
            directive: env.rust_log.clone(),
            ..LogConfig::default()
        };

        let env_level = env
            .ta_log
            .as_deref()
            .and_then(|v| LogLevel::from_str(v.trim(), true).ok());
        if let Some(level) = cli_level.or(env_level) {
            config = config.with_level(level);
        }

        let env_format = env
            .ta_log_format
            .as_deref()
            .and_then(|v| LogFormat::from_str(v.trim(), true).ok());
        if let Some(format) = cli_format.or(env_format) {
            config.format = format;
        }
        config
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set an explicit level; drops any `RUST_LOG` directive.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self.directive = None;
        self
    }

    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.timestamps = enabled;
        self
    }

    /// `EnvFilter` directive for the workspace crates.
    pub fn filter_directive(&self) -> String {
        match &self.directive {
            Some(directive) => directive.clone(),
            None => format!(
                "ta_core={level},ta_config={level},ta_common={level}",
                level = self.level
            ),
        }
    }
}
