//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`MINDRATE_DATABASE`, `MINDRATE_BIND`, `MINDRATE_LOG_LEVEL`)
//! 3. TOML config file
//! 4. OS-dependent compiled defaults (fallback)
//!
//! A missing TOML file is not an error. A TOML file that exists but cannot
//! be parsed is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const ENV_DATABASE: &str = "MINDRATE_DATABASE";
pub const ENV_BIND: &str = "MINDRATE_BIND";
pub const ENV_LOG_LEVEL: &str = "MINDRATE_LOG_LEVEL";

/// Configuration file contents; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// HTTP listen address, e.g. `0.0.0.0:8000`
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default)]
    pub level: Option<String>,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl TomlConfig {
    /// Parse a TOML file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
    }

    /// Load the explicit file if given, else the default location if present
    pub fn load_optional(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// `<config_dir>/mindrate/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("mindrate").join("config.toml"))
}

/// Built-in fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let data_dir = dirs::data_local_dir()
            .map(|d| d.join("mindrate"))
            .unwrap_or_else(|| PathBuf::from("./mindrate_data"));

        Self {
            database_path: data_dir.join("mindrate.db"),
            bind_address: "127.0.0.1:5730".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub log_level: Option<String>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl ServiceConfig {
    /// Merge command line, environment, TOML and defaults
    pub fn resolve(cli: ConfigOverrides, toml: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let database_path = cli
            .database_path
            .or_else(|| env_value(ENV_DATABASE).map(PathBuf::from))
            .or(toml.database_path)
            .unwrap_or(defaults.database_path);

        let bind_address = cli
            .bind_address
            .or_else(|| env_value(ENV_BIND))
            .or(toml.bind_address)
            .unwrap_or(defaults.bind_address);

        let log_level = cli
            .log_level
            .or_else(|| env_value(ENV_LOG_LEVEL))
            .or(toml.logging.level)
            .unwrap_or(defaults.log_level);

        Self {
            database_path,
            bind_address,
            log_level,
            log_file: toml.logging.file,
        }
    }
}

/// Non-empty environment variable
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
