//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`Settings::default()`]
//! 2. If `~/.rulestore/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use rulestore_store::{DEFAULT_BUSY_TIMEOUT, DEFAULT_TABLE};
use rulestore_telemetry::{parse_level, TelemetryConfig};

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid (e.g., unknown log level).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub database: DatabaseSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSettings {
    /// SQLite file; a leading `~/` expands to `$HOME`.
    pub path: String,
    pub table_name: String,
    pub busy_timeout_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                path: "~/.rulestore/rules.db".to_string(),
                table_name: DEFAULT_TABLE.to_string(),
                busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                json: false,
            },
        }
    }
}

impl DatabaseSettings {
    pub fn path(&self) -> PathBuf {
        match self.path.strip_prefix("~/") {
            Some(rest) => home_dir().join(rest),
            None => PathBuf::from(&self.path),
        }
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl LoggingSettings {
    pub fn telemetry(&self) -> Result<TelemetryConfig> {
        let log_level = parse_level(&self.level)
            .ok_or_else(|| SettingsError::InvalidValue(format!("log level {:?}", self.level)))?;
        Ok(TelemetryConfig {
            log_level,
            json: self.json,
            ..TelemetryConfig::default()
        })
    }
}

/// Resolve the path to the settings file (`~/.rulestore/settings.json`).
pub fn settings_path() -> PathBuf {
    home_dir().join(".rulestore").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<Settings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<Settings> {
    let mut settings = read_settings_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<Settings> {
    let defaults = serde_json::to_value(Settings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
/// Invalid values are ignored with a warning.
pub fn apply_env_overrides(settings: &mut Settings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

fn apply_overrides(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("RULESTORE_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read("RULESTORE_TABLE") {
        settings.database.table_name = v;
    }
    if let Some(v) = read("RULESTORE_BUSY_TIMEOUT_MS") {
        match parse_u64_range(&v, 0, 600_000) {
            Some(ms) => settings.database.busy_timeout_ms = ms,
            None => tracing::warn!(key = "RULESTORE_BUSY_TIMEOUT_MS", value = %v, "invalid u64 env var, ignoring"),
        }
    }
    if let Some(v) = read("RULESTORE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("RULESTORE_LOG_JSON") {
        match parse_bool(&v) {
            Some(json) => settings.logging.json = json,
            None => tracing::warn!(key = "RULESTORE_LOG_JSON", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
