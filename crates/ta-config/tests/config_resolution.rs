//! Configuration loading, resolution and validation against real files.
//!
//! Covers:
//! - JSON and TOML config files with partial fields
//! - Resolution order (CLI > TA_CONFIG > TA_CONFIG_DIR)
//! - Preset determinism and snapshot provenance

use std::env;
use std::fs;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use ta_config::preset::{get_preset, PresetName};
use ta_config::{
    load_resolved, validate_detector_config, ConfigError, ConfigSource, NormalizationMode,
    StrategyKind, ValidationError,
};
use tempfile::TempDir;

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

struct EnvGuard {
    keys: Vec<String>,
    saved: Vec<Option<String>>,
}

impl EnvGuard {
    fn new(keys: &[&str]) -> Self {
        let saved = keys.iter().map(|k| env::var(k).ok()).collect();
        for key in keys {
            env::remove_var(key);
        }
        Self {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            saved,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (idx, key) in self.keys.iter().enumerate() {
            match self.saved.get(idx).and_then(|v| v.as_ref()) {
                Some(val) => env::set_var(key, val),
                None => env::remove_var(key),
            }
        }
    }
}

fn with_env_lock<T>(f: impl FnOnce() -> T) -> T {
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .expect("env lock poisoned");
    f()
}

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, content).expect("write config");
}

#[test]
fn test_cli_path_over_env() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["TA_CONFIG", "TA_CONFIG_DIR"]);
        let tmp = TempDir::new().unwrap();
        let cli = tmp.path().join("cli.toml");
        let envf = tmp.path().join("env.json");
        write(&cli, "threshold = 2.0\n");
        write(&envf, r#"{"threshold": 4.0}"#);
        env::set_var("TA_CONFIG", &envf);

        let loaded = load_resolved(Some(cli.as_path())).expect("load cli config");
        assert_eq!(loaded.source, ConfigSource::CliArgument);
        assert_eq!(loaded.config.threshold, 2.0);
    });
}

#[test]
fn test_env_path_then_config_dir() {
    with_env_lock(|| {
        let _guard = EnvGuard::new(&["TA_CONFIG", "TA_CONFIG_DIR"]);
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("conf");
        write(
            &dir.join("detector.json"),
            r#"{"strategy": "ensemble", "normalization": "reference"}"#,
        );
        env::set_var("TA_CONFIG_DIR", &dir);

        let loaded = load_resolved(None).expect("load from config dir");
        assert_eq!(loaded.source, ConfigSource::Environment);
        assert_eq!(loaded.config.strategy, StrategyKind::Ensemble);
        assert_eq!(loaded.config.normalization, NormalizationMode::Reference);

        let direct = tmp.path().join("direct.json");
        write(&direct, r#"{"window_days": 14}"#);
        env::set_var("TA_CONFIG", &direct);
        let loaded = load_resolved(None).expect("load from TA_CONFIG");
        assert_eq!(loaded.config.window_days, 14);
        assert_eq!(loaded.config.strategy, StrategyKind::Robust);
    });
}

#[test]
fn test_invalid_values_survive_parsing_and_fail_validation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("detector.toml");
    write(&path, "contamination = 0.6\n");
    let loaded = load_resolved(Some(path.as_path())).expect("parse");
    let err = validate_detector_config(&loaded.config).expect_err("0.6 is out of range");
    assert!(matches!(err, ValidationError::InvalidValue { ref field, .. } if field == "contamination"));
}

#[test]
fn test_type_errors_are_parse_errors() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("detector.json");
    write(&path, r#"{"window_days": "thirty"}"#);
    let err = load_resolved(Some(path.as_path())).expect_err("string window should not parse");
    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn test_snapshot_hashes_file_and_effective_config() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("detector.json");
    write(&path, r#"{"threshold": 3.0}"#);
    let loaded = load_resolved(Some(path.as_path())).expect("load");

    let same = loaded.snapshot(&loaded.config);
    let tuned = loaded.snapshot(&loaded.config.clone().with_threshold(2.0));
    assert_eq!(same.file_hash, tuned.file_hash);
    assert!(!same.same_effective(&tuned));
    assert_eq!(same.source, "CLI argument");
}

#[test]
fn test_presets_are_deterministic() {
    for &name in PresetName::ALL {
        assert_eq!(get_preset(name), get_preset(name));
    }
}
