//! Configuration system for guildkey.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `GUILDKEY_SERVER_HOST` - Server bind address
//! - `GUILDKEY_SERVER_PORT` - Server port
//! - `GUILDKEY_DATABASE_TYPE` - `sqlite` or `postgres`
//! - `GUILDKEY_DATABASE_URL` - Database connection URL (routed by scheme)
//! - `GUILDKEY_DATABASE_MAX_CONNECTIONS` - Pool size
//! - `GUILDKEY_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `GUILDKEY_LOG_FORMAT` - Log output format (pretty, json)
//! - `GUILDKEY_KEY_ATTEMPTS` - Token generation attempts on collision

use config::{Config, ConfigBuilder};
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};

/// Global configuration singleton. Read-only once loaded.
static CONFIG: OnceLock<GuildkeyConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GuildkeyConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub license: LicenseConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
    /// Upper bound on pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://keys.db".to_string(),
            postgres_url: "postgres://localhost/guildkey".to_string(),
            max_connections: 5,
        }
    }
}

impl DatabaseConfig {
    /// In-memory SQLite with a single connection, so every caller sees the same data.
    pub fn sqlite_in_memory() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Self::default()
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Output format: pretty or json
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// License key issuing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// How many fresh tokens `create` tries before giving up on collisions
    pub key_attempts: u32,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self { key_attempts: 10 }
    }
}

fn config_err(e: config::ConfigError) -> LicenseError {
    LicenseError::ConfigError(e.to_string())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl GuildkeyConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources are applied in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> LicenseResult<Self> {
        let builder = Self::with_defaults(Config::builder())?
            .add_source(config::File::with_name("config").required(false));

        let builder = Self::with_env_overrides(builder)?;

        let settings = builder
            .build()
            .map_err(|e| LicenseError::ConfigError(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| LicenseError::ConfigError(format!("failed to deserialize config: {e}")))
    }

    fn with_defaults(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> LicenseResult<ConfigBuilder<config::builder::DefaultState>> {
        let defaults = Self::default();
        builder
            .set_default("server.host", defaults.server.host)
            .map_err(config_err)?
            .set_default("server.port", i64::from(defaults.server.port))
            .map_err(config_err)?
            .set_default("database.db_type", defaults.database.db_type)
            .map_err(config_err)?
            .set_default("database.sqlite_url", defaults.database.sqlite_url)
            .map_err(config_err)?
            .set_default("database.postgres_url", defaults.database.postgres_url)
            .map_err(config_err)?
            .set_default(
                "database.max_connections",
                i64::from(defaults.database.max_connections),
            )
            .map_err(config_err)?
            .set_default("logging.level", defaults.logging.level)
            .map_err(config_err)?
            .set_default("logging.format", defaults.logging.format)
            .map_err(config_err)?
            .set_default(
                "license.key_attempts",
                i64::from(defaults.license.key_attempts),
            )
            .map_err(config_err)
    }

    fn with_env_overrides(
        builder: ConfigBuilder<config::builder::DefaultState>,
    ) -> LicenseResult<ConfigBuilder<config::builder::DefaultState>> {
        builder
            .set_override_option("server.host", env::var("GUILDKEY_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option("server.port", env_parsed::<i64>("GUILDKEY_SERVER_PORT"))
            .map_err(config_err)?
            .set_override_option("database.db_type", env::var("GUILDKEY_DATABASE_TYPE").ok())
            .map_err(config_err)?
            .set_override_option(
                "database.sqlite_url",
                env::var("GUILDKEY_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.postgres_url",
                env::var("GUILDKEY_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(config_err)?
            .set_override_option(
                "database.max_connections",
                env_parsed::<i64>("GUILDKEY_DATABASE_MAX_CONNECTIONS"),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("GUILDKEY_LOG_LEVEL").ok())
            .map_err(config_err)?
            .set_override_option("logging.format", env::var("GUILDKEY_LOG_FORMAT").ok())
            .map_err(config_err)?
            .set_override_option(
                "license.key_attempts",
                env_parsed::<i64>("GUILDKEY_KEY_ATTEMPTS"),
            )
            .map_err(config_err)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.server.port == 0 {
            return Err(LicenseError::ConfigError(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        if self.database.max_connections == 0 {
            return Err(LicenseError::ConfigError(
                "database.max_connections must be greater than 0".to_string(),
            ));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(LicenseError::ConfigError(format!(
                    "logging.format must be 'pretty' or 'json', got '{other}'"
                )));
            }
        }

        if self.license.key_attempts == 0 {
            return Err(LicenseError::ConfigError(
                "license.key_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// `host:port` string suitable for a TCP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the global configuration.
///
/// Loads and validates on first access, then caches.
pub fn get_config() -> LicenseResult<&'static GuildkeyConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = GuildkeyConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is equivalent.
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GuildkeyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.bind_address(), "127.0.0.1:5000");
    }

    #[test]
    fn rejects_unknown_db_type() {
        let mut config = GuildkeyConfig::default();
        config.database.db_type = "mysql".to_string();
        assert!(matches!(
            config.validate(),
            Err(LicenseError::ConfigError(msg)) if msg.contains("mysql")
        ));
    }

    #[test]
    fn rejects_zero_port_and_pool() {
        let mut config = GuildkeyConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = GuildkeyConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_logging_settings() {
        let mut config = GuildkeyConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        let mut config = GuildkeyConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());

        let mut config = GuildkeyConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn in_memory_database_uses_single_connection() {
        let db = DatabaseConfig::sqlite_in_memory();
        assert_eq!(db.max_connections, 1);
        assert_eq!(db.sqlite_url, "sqlite::memory:");
    }
}
