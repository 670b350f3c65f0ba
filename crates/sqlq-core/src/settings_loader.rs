//! Reading [`Settings`] from TOML/JSON documents and `SQLQ_*` variables.
//!
//! A document only needs the keys it changes: it is deep-merged onto
//! [`Settings::default`], and environment variables win over both.
//!
//! | Variable | Field |
//! |---|---|
//! | `SQLQ_DEBUG` | `debug` |
//! | `SQLQ_LOG_LEVEL` | `log_level` |
//! | `SQLQ_BIND_PARAMS` | `bind_params` |
//! | `SQLQ_DATABASE_ENGINE` | `databases.default.engine` |
//! | `SQLQ_DATABASE_NAME` | `databases.default.name` |
//!
//! ```rust,no_run
//! use sqlq_core::settings_loader;
//!
//! let settings = settings_loader::from_toml_file_with_env("config/sqlq.toml").unwrap();
//! ```

use std::path::Path;

use crate::error::QueryError;
use crate::settings::Settings;

/// Parses a TOML document; missing keys keep their defaults.
///
/// # Errors
///
/// Returns [`QueryError::ConfigurationError`] for invalid TOML or values of
/// the wrong type.
pub fn from_toml_str(toml_str: &str) -> Result<Settings, QueryError> {
    let toml_value: toml::Value = toml::from_str(toml_str)
        .map_err(|e| QueryError::ConfigurationError(format!("Failed to parse TOML: {e}")))?;

    merge_onto_defaults(toml_to_json(toml_value), "TOML")
}

/// Reads and parses a TOML file.
///
/// # Errors
///
/// See [`from_toml_str`]; an unreadable file is a configuration error too.
pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Settings, QueryError> {
    let content = read_config(path.as_ref())?;
    from_toml_str(&content)
}

/// [`from_toml_file`] followed by [`apply_env_overrides`].
///
/// # Errors
///
/// See [`from_toml_file`].
pub fn from_toml_file_with_env(path: impl AsRef<Path>) -> Result<Settings, QueryError> {
    let mut settings = from_toml_file(path)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Parses a JSON document; missing keys keep their defaults.
///
/// # Errors
///
/// Returns [`QueryError::ConfigurationError`] for invalid JSON or values of
/// the wrong type.
pub fn from_json_str(json_str: &str) -> Result<Settings, QueryError> {
    let json_value: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| QueryError::ConfigurationError(format!("Failed to parse JSON: {e}")))?;

    merge_onto_defaults(json_value, "JSON")
}

/// Reads and parses a JSON file.
///
/// # Errors
///
/// See [`from_json_str`].
pub fn from_json_file(path: impl AsRef<Path>) -> Result<Settings, QueryError> {
    let content = read_config(path.as_ref())?;
    from_json_str(&content)
}

/// Defaults with `SQLQ_*` overrides applied.
pub fn from_env() -> Settings {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings);
    settings
}

/// Applies `SQLQ_*` environment variable overrides to a settings struct.
///
/// Boolean variables accept "true", "1" or "yes"; anything else is false.
/// Database overrides target the `default` alias and create it if missing.
pub fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(val) = std::env::var("SQLQ_DEBUG") {
        settings.debug = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("SQLQ_LOG_LEVEL") {
        settings.log_level = val;
    }

    if let Ok(val) = std::env::var("SQLQ_BIND_PARAMS") {
        settings.bind_params = parse_flag(&val);
    }

    if let Ok(val) = std::env::var("SQLQ_DATABASE_ENGINE") {
        settings
            .databases
            .entry("default".to_string())
            .or_default()
            .engine = val;
    }

    if let Ok(val) = std::env::var("SQLQ_DATABASE_NAME") {
        settings
            .databases
            .entry("default".to_string())
            .or_default()
            .name = val;
    }
}

// ============================================================
// Helpers
// ============================================================

fn parse_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn read_config(path: &Path) -> Result<String, QueryError> {
    std::fs::read_to_string(path).map_err(|e| {
        QueryError::ConfigurationError(format!(
            "Failed to read config file '{}': {e}",
            path.display()
        ))
    })
}

/// Deep-merges a parsed document onto the serialized defaults and
/// deserializes the result.
fn merge_onto_defaults(value: serde_json::Value, format: &str) -> Result<Settings, QueryError> {
    let default_json = serde_json::to_value(Settings::default()).map_err(|e| {
        QueryError::ConfigurationError(format!("Failed to serialize default settings: {e}"))
    })?;

    let merged = merge_json(default_json, value);
    serde_json::from_value(merged).map_err(|e| {
        QueryError::ConfigurationError(format!("Failed to deserialize settings from {format}: {e}"))
    })
}

fn toml_to_json(value: toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_to_json).collect())
        }
        toml::Value::Table(table) => {
            let map: serde_json::Map<String, serde_json::Value> = table
                .into_iter()
                .map(|(k, v)| (k, toml_to_json(v)))
                .collect();
            serde_json::Value::Object(map)
        }
    }
}

/// Objects merge key by key; any other value in `over` replaces `base`.
///
/// Database entries that are new in the override are merged onto a default
/// [`DatabaseSettings`](crate::settings::DatabaseSettings) so partial tables
/// still deserialize.
fn merge_json(base: serde_json::Value, over: serde_json::Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match (base, over) {
        (Json::Object(mut target), Json::Object(patch)) => {
            for (key, value) in patch {
                let value = match target.remove(&key) {
                    Some(current) if key == "databases" => merge_databases(current, value),
                    Some(current) => merge_json(current, value),
                    None => value,
                };
                target.insert(key, value);
            }
            Json::Object(target)
        }
        (_, over) => over,
    }
}

fn merge_databases(base: serde_json::Value, override_val: serde_json::Value) -> serde_json::Value {
    let template = serde_json::to_value(crate::settings::DatabaseSettings::default())
        .unwrap_or(serde_json::Value::Null);
    match (base, override_val) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (alias, entry) in override_map {
                let start = base_map.remove(&alias).unwrap_or_else(|| template.clone());
                base_map.insert(alias, merge_json(start, entry));
            }
            serde_json::Value::Object(base_map)
        }
        (_, override_val) => override_val,
    }
}
