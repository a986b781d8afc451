//! # Database Configuration
//!
//! `DbConfig` is built in code (builder methods) or loaded from the
//! environment with fallback to defaults.
//!
//! ## Environment
//! ```text
//! ┌────────────────────────────┬───────────────────────────────────────────┐
//! │ Variable                   │ Default                                   │
//! ├────────────────────────────┼───────────────────────────────────────────┤
//! │ STOCKROOM_DB_PATH          │ <platform data dir>/stockroom.db          │
//! │ STOCKROOM_MAX_CONNECTIONS  │ 5                                         │
//! │ STOCKROOM_INVOICE_RETRIES  │ 3                                         │
//! │ STOCKROOM_AUDIT_ENABLED    │ true                                      │
//! └────────────────────────────┴───────────────────────────────────────────┘
//! ```

use directories::ProjectDirs;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use stockroom_core::DEFAULT_INVOICE_RETRY_ATTEMPTS;

pub const ENV_DB_PATH: &str = "STOCKROOM_DB_PATH";
pub const ENV_MAX_CONNECTIONS: &str = "STOCKROOM_MAX_CONNECTIONS";
pub const ENV_INVOICE_RETRIES: &str = "STOCKROOM_INVOICE_RETRIES";
pub const ENV_AUDIT_ENABLED: &str = "STOCKROOM_AUDIT_ENABLED";

/// File name used inside the platform data directory.
pub const DEFAULT_DB_FILE: &str = "stockroom.db";

/// Path that marks an in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/path/to/stockroom.db")
///     .max_connections(5)
///     .invoice_retry_attempts(5)
///     .audit_enabled(false);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// Connection acquire timeout.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,

    /// Attempts at creating a sale when the invoice number collides.
    /// Default: 3
    pub invoice_retry_attempts: u32,

    /// Whether ledger operations write audit_log entries.
    /// Default: true
    pub audit_enabled: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    ///
    /// ## Arguments
    /// * `path` - Path to the SQLite database file. Will be created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
            invoice_retry_attempts: DEFAULT_INVOICE_RETRY_ATTEMPTS,
            audit_enabled: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Sets how many times sale creation is attempted on an invoice
    /// number collision. Values below 1 are treated as 1.
    pub fn invoice_retry_attempts(mut self, attempts: u32) -> Self {
        self.invoice_retry_attempts = attempts.max(1);
        self
    }

    /// Turns the audit trail on or off.
    pub fn audit_enabled(mut self, enabled: bool) -> Self {
        self.audit_enabled = enabled;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// // Database is isolated, perfect for tests
    /// ```
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(IN_MEMORY_PATH),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            ..DbConfig::new(IN_MEMORY_PATH)
        }
    }

    /// Whether this configuration points at an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_PATH
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which returns the value of
    /// a variable if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup(ENV_DB_PATH) {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
            _ => default_database_path()?,
        };

        let mut config = DbConfig::new(database_path);

        if let Some(value) = lookup(ENV_MAX_CONNECTIONS) {
            let max: u32 = parse_number(ENV_MAX_CONNECTIONS, &value)?;
            if max == 0 {
                return Err(ConfigError::InvalidValue(ENV_MAX_CONNECTIONS.to_string()));
            }
            let min = config.min_connections.min(max);
            config = config.max_connections(max).min_connections(min);
        }

        if let Some(value) = lookup(ENV_INVOICE_RETRIES) {
            config = config.invoice_retry_attempts(parse_number(ENV_INVOICE_RETRIES, &value)?);
        }

        if let Some(value) = lookup(ENV_AUDIT_ENABLED) {
            config = config.audit_enabled(parse_flag(ENV_AUDIT_ENABLED, &value)?);
        }

        Ok(config)
    }
}

/// `<platform data dir>/stockroom.db`, e.g.
/// `~/.local/share/stockroom/stockroom.db` on Linux.
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    let dirs = ProjectDirs::from("com", "stockroom", "stockroom").ok_or(ConfigError::NoDataDirectory)?;
    Ok(dirs.data_dir().join(DEFAULT_DB_FILE))
}

fn parse_number(key: &str, value: &str) -> Result<u32, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(key.to_string())),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Could not determine a data directory; set STOCKROOM_DB_PATH")]
    NoDataDirectory,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/test.db")
            .max_connections(10)
            .min_connections(2)
            .invoice_retry_attempts(0)
            .audit_enabled(false);

        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.invoice_retry_attempts, 1);
        assert!(!config.audit_enabled);
    }

    #[test]
    fn test_in_memory_defaults() {
        let config = DbConfig::in_memory();
        assert!(config.is_in_memory());
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.invoice_retry_attempts, DEFAULT_INVOICE_RETRY_ATTEMPTS);
        assert!(config.audit_enabled);
    }

    #[test]
    fn test_from_lookup_reads_variables() {
        let config = DbConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/var/lib/stockroom/shop.db"),
            (ENV_MAX_CONNECTIONS, "8"),
            (ENV_INVOICE_RETRIES, "5"),
            (ENV_AUDIT_ENABLED, "off"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/var/lib/stockroom/shop.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.invoice_retry_attempts, 5);
        assert!(!config.audit_enabled);
    }

    #[test]
    fn test_from_lookup_rejects_bad_values() {
        let err = DbConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_MAX_CONNECTIONS, "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == ENV_MAX_CONNECTIONS));

        let err = DbConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_AUDIT_ENABLED, "maybe"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(key) if key == ENV_AUDIT_ENABLED));

        assert!(DbConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/x.db"),
            (ENV_MAX_CONNECTIONS, "0"),
        ]))
        .is_err());
    }
}
