//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`CharlaSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `CHARLA_*` environment overrides (highest priority)
//! 4. Validate cross-field constraints

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::CharlaSettings;

/// Resolve the path to the settings file (`~/.charla/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".charla").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<CharlaSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<CharlaSettings> {
    load_with_env(path, |name| std::env::var(name).ok())
}

/// Load settings from `path`, resolving overrides through `env`.
pub fn load_with_env<F>(path: &Path, env: F) -> Result<CharlaSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = serde_json::to_value(CharlaSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: CharlaSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, env);
    settings.validate()?;
    Ok(settings)
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
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment overrides read through `env`.
///
/// Numbers must parse and fall within range; invalid values are ignored
/// with a warning.
pub fn apply_env_overrides<F>(settings: &mut CharlaSettings, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| env(name).filter(|v| !v.is_empty());
    let number = |name: &str, min: u64, max: u64| {
        let val = env(name)?;
        let parsed = parse_u64_range(&val, min, max);
        if parsed.is_none() {
            tracing::warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        parsed
    };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = string("CHARLA_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = number("CHARLA_PORT", 0, u64::from(u16::MAX)) {
        settings.server.port = u16::try_from(v).unwrap_or(settings.server.port);
    }
    if let Some(v) = number("CHARLA_MIN_DELAY_MS", 0, 60_000) {
        settings.server.min_delay_ms = v;
    }
    if let Some(v) = number("CHARLA_MAX_DELAY_MS", 0, 60_000) {
        settings.server.max_delay_ms = v;
    }

    // ── Client ──────────────────────────────────────────────────────
    if let Some(v) = string("CHARLA_SERVER_URL") {
        settings.client.server_url = v;
    }
    if let Some(v) = number("CHARLA_REPLY_TIMEOUT_MS", 1, 600_000) {
        settings.client.reply_timeout_ms = v;
    }
    if let Some(v) = number("CHARLA_CONNECT_TIMEOUT_MS", 1, 600_000) {
        settings.client.connect_timeout_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = string("CHARLA_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}
