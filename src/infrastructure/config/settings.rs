//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings. Every
//! section is optional; an empty file yields the defaults.
//!
//! # Example
//!
//! ```no_run
//! use rapport::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::service::{CacheConfig, DatabaseConfig, FriendsConfig, GroupsConfig, RepairConfig};
use crate::application::graph::GraphSettings;
use crate::error::{ConfigError, Result};

/// Environment variable that replaces `database.path`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub groups: GroupsConfig,

    #[serde(default)]
    pub friends: FriendsConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Repair queue capacity and retry policy.
    #[serde(default)]
    pub repair: RepairConfig,
}

impl Config {
    /// Parse and validate configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        let mut config = Self::parse_toml(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Replace settings that have an environment override.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            if !url.is_empty() {
                self.database.path = url;
            }
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.is_empty() {
            return Err(ConfigError::MissingField {
                field: "database.path",
            }
            .into());
        }
        if self.database.pool_size == 0 {
            return Err(invalid("database.pool_size", "must be greater than 0"));
        }
        if self.database.busy_timeout_ms == 0 {
            return Err(invalid("database.busy_timeout_ms", "must be greater than 0"));
        }
        if self.groups.default_max_members < 1 {
            return Err(invalid("groups.default_max_members", "must be at least 1"));
        }
        if self.friends.max_friends < 1 {
            return Err(invalid("friends.max_friends", "must be at least 1"));
        }
        if self.cache.op_timeout_ms == 0 {
            return Err(invalid("cache.op_timeout_ms", "must be greater than 0"));
        }
        if self.repair.queue_capacity == 0 {
            return Err(invalid("repair.queue_capacity", "must be greater than 0"));
        }
        if self.repair.max_attempts == 0 {
            return Err(invalid("repair.max_attempts", "must be greater than 0"));
        }
        Ok(())
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Service tunables derived from this configuration.
    #[must_use]
    pub fn graph_settings(&self) -> GraphSettings {
        GraphSettings {
            max_friends: self.friends.max_friends,
            default_max_members: self.groups.default_max_members,
            cache_op_timeout: self.cache.op_timeout(),
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::infrastructure::config::logging::LogFormat;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse_toml("").unwrap();

        assert_eq!(config.database.path, "rapport.db");
        assert_eq!(config.groups.default_max_members, 500);
        assert_eq!(config.friends.max_friends, 2000);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.repair.max_attempts, 5);
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::parse_toml(
            r#"
            [database]
            path = "/tmp/social.db"
            pool_size = 12

            [logging]
            level = "debug"
            format = "json"

            [groups]
            default_max_members = 50

            [cache]
            op_timeout_ms = 75
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, "/tmp/social.db");
        assert_eq!(config.database.pool_options().max_size, 12);
        assert_eq!(config.database.busy_timeout_ms, 5000);
        assert_eq!(config.logging.format, LogFormat::Json);

        let settings = config.graph_settings();
        assert_eq!(settings.default_max_members, 50);
        assert_eq!(settings.cache_op_timeout.as_millis(), 75);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let err = Config::parse_toml("[repair]\nqueue_capacity = 0\n").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "repair.queue_capacity",
                ..
            })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = Config::parse_toml("[database\npath = 1").unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Parse(_))));
    }
}
