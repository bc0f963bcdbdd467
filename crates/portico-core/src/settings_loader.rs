//! Settings loading from configuration files.
//!
//! Provides functions to load [`Settings`] from TOML or JSON files and to apply
//! environment variable overrides.
//!
//! ## Loading Order
//!
//! 1. Start with default settings.
//! 2. Load from a TOML or JSON file (deep-merged over the defaults).
//! 3. Apply environment variable overrides (highest priority).
//!
//! ## Environment Variable Mapping
//!
//! | Env Var | Setting |
//! |---|---|
//! | `PORTICO_DEBUG` | `debug` |
//! | `PORTICO_LOG_LEVEL` | `log_level` |
//! | `PORTICO_APPLICATION_NAME` | `application_name` |
//! | `PORTICO_BASE_URL` | `base_url` |
//! | `PORTICO_DISABLED` | `disabled` |
//! | `PORTICO_ROUTING_EXTENSION` | `routing.extension` (empty disables) |
//! | `PORTICO_ALLOW_QUERY_STRING` | `routing.allow_query_string` |
//! | `PORTICO_ROUTES_FILE` | `routing.routes_file` |
//! | `PORTICO_CACHE_DIR` | `routing.cache_dir` |
//! | `PORTICO_TEMPLATE_DIRS` | `views.template_dirs` (comma-separated) |
//!
//! ## Examples
//!
//! ```rust,no_run
//! use portico_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/frontend.toml").unwrap();
//! ```

use std::path::{Path, PathBuf};

use crate::error::PorticoError;
use crate::settings::Settings;

/// Loads settings from a TOML string.
///
/// Any fields not present in the TOML keep their default values, including
/// fields nested inside the `[routing]` and `[views]` tables.
///
/// # Errors
///
/// Returns an error if the TOML is malformed or cannot be deserialized.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, PorticoError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| PorticoError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_over_defaults(toml_to_json(toml_value), "TOML")
}

/// Loads settings from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, PorticoError> {
    from_toml_str(&read_config(path.as_ref(), "TOML")?)
}

/// Loads settings from a TOML file and then applies environment variable overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the TOML is malformed.
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, PorticoError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Loads settings from a JSON string.
///
/// # Errors
///
/// Returns an error if the JSON is malformed or cannot be deserialized.
pub fn from_json_str(json_str: &str) -> Result<Settings, PorticoError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| PorticoError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_over_defaults(json_value, "JSON")
}

/// Loads settings from a JSON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the JSON is malformed.
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, PorticoError> {
    from_json_str(&read_config(path.as_ref(), "JSON")?)
}

/// Loads settings from just environment variables (starting from defaults).
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `PORTICO_*` environment variable overrides to a settings struct.
///
/// Boolean values accept "true", "1" and "yes" (case-insensitive); anything
/// else reads as false.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("PORTICO_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("PORTICO_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("PORTICO_APPLICATION_NAME") {
        settings.application_name = val;
    }

    if let Ok(val) = std::env::var("PORTICO_BASE_URL") {
        settings.base_url = val;
    }

    if let Ok(val) = std::env::var("PORTICO_DISABLED") {
        settings.disabled = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("PORTICO_ROUTING_EXTENSION") {
        let val = val.trim().trim_start_matches('.').to_string();
        settings.routing.extension = (!val.is_empty()).then_some(val);
    }

    if let Ok(val) = std::env::var("PORTICO_ALLOW_QUERY_STRING") {
        settings.routing.allow_query_string = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("PORTICO_ROUTES_FILE") {
        settings.routing.routes_file = Some(PathBuf::from(val));
    }

    if let Ok(val) = std::env::var("PORTICO_CACHE_DIR") {
        settings.routing.cache_dir = Some(PathBuf::from(val));
    }

    if let Ok(val) = std::env::var("PORTICO_TEMPLATE_DIRS") {
        settings.views.template_dirs = val
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .collect();
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path, format: &str) -> Result<String, PorticoError> {
    std::fs::read_to_string(path).map_err(|e| {
        PorticoError::ConfigurationError(format!(
            "Failed to read {format} file '{}': {e}",
            path.display()
        ))
    })
}

fn merge_over_defaults(value: serde_json::Value, format: &str) -> Result<Settings, PorticoError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        PorticoError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        PorticoError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

/// Converts a TOML value to a `serde_json::Value`.
pub fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => serde_json::Value::Object(
            table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect(),
        ),
    }
}

/// Deep-merges two JSON values. The `override_val` takes precedence.
fn merge_json(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, override_v) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(base_v) => merge_json(base_v, override_v),
                    None => override_v,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
