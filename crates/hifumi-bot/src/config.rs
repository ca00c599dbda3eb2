//! Bot configuration loading from file and environment variables.

use serde::Deserialize;
use thiserror::Error;

use hifumi_store::DbRuntimeSettings;
use hifumi_types::{Locale, Prefix, ValidationError, DEFAULT_LOCALE, DEFAULT_PREFIX};

/// Top-level bot configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Command and localization defaults.
    #[serde(default)]
    pub bot: BotConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults applied when a guild has no stored setting, or outside a guild.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub default_prefix: String,

    #[serde(default = "default_locale")]
    pub default_locale: String,

    /// Directory holding one `<locale>.json` file per language.
    #[serde(default = "default_language_dir")]
    pub language_dir: String,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// Deadline for a single store operation, in milliseconds.
    #[serde(default = "default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "hifumi_store=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn default_language_dir() -> String {
    "data/language".to_string()
}

fn default_db_path() -> String {
    "hifumi.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_op_timeout_ms() -> u64 {
    2_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            default_prefix: default_prefix(),
            default_locale: default_locale(),
            language_dir: default_language_dir(),
        }
    }
}

impl BotConfig {
    /// Checks the defaults. An empty prefix would turn every message into a
    /// command.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first invalid default.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Prefix::new(self.default_prefix.as_str())?;
        Locale::new(self.default_locale.as_str())?;
        Ok(())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            op_timeout_ms: default_op_timeout_ms(),
        }
    }
}

impl DatabaseConfig {
    /// Pool tunables derived from this section.
    pub fn runtime_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.busy_timeout_ms,
            pool_max_size: self.pool_max_size,
            ..DbRuntimeSettings::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A default prefix or locale breaks the rules stored values follow.
    #[error("invalid bot default: {0}")]
    Invalid(#[from] ValidationError),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `HIFUMI_DEFAULT_PREFIX` overrides `bot.default_prefix`
/// - `HIFUMI_DEFAULT_LOCALE` overrides `bot.default_locale`
/// - `HIFUMI_LANGUAGE_DIR` overrides `bot.language_dir`
/// - `HIFUMI_DB_PATH` overrides `database.path`
/// - `HIFUMI_LOG_LEVEL` overrides `logging.level`
/// - `HIFUMI_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// The resulting `bot.default_prefix` and `bot.default_locale` are checked
/// with the same rules as per-guild values.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed, or
/// if either default is invalid.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.bot.validate()?;
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(prefix) = var("HIFUMI_DEFAULT_PREFIX") {
        config.bot.default_prefix = prefix;
    }
    if let Some(locale) = var("HIFUMI_DEFAULT_LOCALE") {
        config.bot.default_locale = locale;
    }
    if let Some(dir) = var("HIFUMI_LANGUAGE_DIR") {
        config.bot.language_dir = dir;
    }
    if let Some(db_path) = var("HIFUMI_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = var("HIFUMI_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = var("HIFUMI_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}
