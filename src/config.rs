use crate::core::{DbError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DbConfig,
}

/// Connection settings. Fixed for the lifetime of a `ConnectionManager`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Database name; for SQLite this is the file path or `:memory:`.
    pub database: String,
    pub charset: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            host: "localhost".to_string(),
            username: "username".to_string(),
            password: "password".to_string(),
            database: "database_name".to_string(),
            charset: "utf8mb4".to_string(),
        }
    }
}

// Keeps the password out of logs and panic messages.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("charset", &self.charset)
            .finish()
    }
}

impl DbConfig {
    /// Shorthand for a config pointing at `database` with default everything else.
    pub fn for_database(database: impl Into<String>) -> Self {
        DbConfig {
            database: database.into(),
            ..DbConfig::default()
        }
    }

    /// Defaults overridden by `DB_HOST`, `DB_USERNAME`, `DB_PASSWORD`,
    /// `DB_DATABASE` and `DB_CHARSET`.
    pub fn from_env() -> Self {
        DbConfig::default().with_env_overrides()
    }

    /// Applies the `DB_*` environment variables on top of `self`.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut String); 5] = [
            ("DB_HOST", &mut self.host),
            ("DB_USERNAME", &mut self.username),
            ("DB_PASSWORD", &mut self.password),
            ("DB_DATABASE", &mut self.database),
            ("DB_CHARSET", &mut self.charset),
        ];
        for (key, field) in fields {
            if let Some(value) = lookup(key) {
                *field = value;
            }
        }
        self
    }
}

/// Default location of the configuration file, `<config dir>/dbfacade/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbfacade").join("config.toml"))
}

/// Loads configuration from a TOML file at the given path.
///
/// # Arguments
///
/// * `path` - The file path to the TOML configuration file.
///
/// # Example
///
/// ```no_run
/// let config = dbfacade::config::load_config("config.toml").expect("Failed to load config");
/// println!("{:?}", config.database);
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses configuration from TOML text.
pub fn parse_config(content: &str) -> Result<Config> {
    toml::from_str(content).map_err(|e| DbError::Config(e.to_string()))
}
