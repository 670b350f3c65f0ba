//! Settings for sqlq.
//!
//! [`Settings`] holds the logging configuration, the rendering mode, and one
//! [`DatabaseSettings`] entry per connection alias. The engine name of a
//! database entry selects the SQL dialect adapter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine: `mysql`, `postgresql`, or `sqlite`.
    pub engine: String,
    /// The database name (or file path for `SQLite`).
    pub name: String,
    /// The database user.
    pub user: String,
    /// The database password.
    pub password: String,
    /// The database host.
    pub host: String,
    /// The database port.
    pub port: u16,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            name: ":memory:".to_string(),
            user: String::new(),
            password: String::new(),
            host: String::new(),
            port: 0,
            options: HashMap::new(),
        }
    }
}

/// The complete set of sqlq settings.
///
/// # Examples
///
/// ```
/// use sqlq_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(!settings.debug);
/// assert_eq!(settings.default_database().unwrap().engine, "sqlite");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty log output).
    pub debug: bool,
    /// The log level filter (e.g. "info", "sqlq_db=debug").
    pub log_level: String,
    /// Whether statements are rendered with bound parameters instead of
    /// inlined literals when a caller asks for the configured mode.
    pub bind_params: bool,
    /// Database configurations, keyed by alias (e.g. "default").
    pub databases: HashMap<String, DatabaseSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert("default".to_string(), DatabaseSettings::default());

        Self {
            debug: false,
            log_level: "info".to_string(),
            bind_params: true,
            databases,
        }
    }
}

impl Settings {
    /// Returns the database settings for the given alias.
    pub fn database(&self, alias: &str) -> Option<&DatabaseSettings> {
        self.databases.get(alias)
    }

    /// Returns the `default` database settings.
    pub fn default_database(&self) -> Option<&DatabaseSettings> {
        self.database("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(!settings.debug);
        assert!(settings.bind_params);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.databases.len(), 1);
    }

    #[test]
    fn test_database_lookup() {
        let mut settings = Settings::default();
        settings.databases.insert(
            "replica".to_string(),
            DatabaseSettings {
                engine: "postgresql".to_string(),
                ..DatabaseSettings::default()
            },
        );
        assert_eq!(settings.database("replica").unwrap().engine, "postgresql");
        assert!(settings.database("missing").is_none());
    }

    #[test]
    fn test_settings_serde_roundtrip() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.log_level, settings.log_level);
        assert_eq!(back.default_database().unwrap().name, ":memory:");
    }
}
