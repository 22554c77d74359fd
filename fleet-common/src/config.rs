//! Bootstrap configuration and path resolution
//!
//! Configuration is read from an optional TOML file. A missing file is not an
//! error: the tooling logs a warning and runs on compiled defaults.
//!
//! # Resolution priority
//!
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the TOML config file
pub const CONFIG_ENV_VAR: &str = "FLEET_INGEST_CONFIG";

/// Environment variable naming the SQLite registry database
pub const DATABASE_ENV_VAR: &str = "FLEET_INGEST_DB";

const APP_DIR: &str = "fleet-ingest";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to the SQLite registry database (optional)
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Matching thresholds and commit options (optional)
    #[serde(default)]
    pub import: ImportSettings,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Import tuning knobs
///
/// Defaults reproduce the built-in reconciliation rules; override only when
/// auditing a registry with unusual pricing or paperwork lag.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportSettings {
    /// Relative purchase-price difference still treated as the same asset
    #[serde(default = "default_price_tolerance")]
    pub price_tolerance: f64,

    /// Max purchase-date distance (days) for a registry potential match
    #[serde(default = "default_registry_date_window")]
    pub registry_date_window_days: i64,

    /// Max purchase-date distance (days) for two fragments of one batch
    #[serde(default = "default_fragment_date_window")]
    pub fragment_date_window_days: i64,

    /// Upload source documents after assets and attachments are written
    #[serde(default = "default_true")]
    pub attach_documents: bool,

    /// Merge every suggested fragment group before a non-interactive commit
    #[serde(default)]
    pub auto_merge_fragments: bool,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            price_tolerance: default_price_tolerance(),
            registry_date_window_days: default_registry_date_window(),
            fragment_date_window_days: default_fragment_date_window(),
            attach_documents: true,
            auto_merge_fragments: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_price_tolerance() -> f64 {
    0.10
}

fn default_registry_date_window() -> i64 {
    30
}

fn default_fragment_date_window() -> i64 {
    60
}

fn default_true() -> bool {
    true
}

/// Locate the TOML config file
///
/// Returns `None` when no file is configured and the OS default does not exist.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: OS default location, only if present
    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .filter(|p| p.exists())
}

/// Load TOML config, falling back to defaults when the file is absent
///
/// A file that exists but does not parse is a configuration error.
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        debug!("No config file configured, using compiled defaults");
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        warn!(
            "Config file {} not found, using compiled defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;

    validate_import_settings(&config.import)?;
    debug!(path = %path.display(), "Loaded config file");
    Ok(config)
}

fn validate_import_settings(settings: &ImportSettings) -> Result<()> {
    if !(0.0..=1.0).contains(&settings.price_tolerance) {
        return Err(Error::Config(format!(
            "import.price_tolerance must be within 0.0..=1.0, got {}",
            settings.price_tolerance
        )));
    }
    if settings.registry_date_window_days < 0 || settings.fragment_date_window_days < 0 {
        return Err(Error::Config(
            "import date windows must not be negative".to_string(),
        ));
    }
    Ok(())
}

/// Resolve the registry database path
pub fn resolve_database_path(cli_arg: Option<&Path>, toml_config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATABASE_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &toml_config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR).join("fleet.db"))
        .unwrap_or_else(|| PathBuf::from("./fleet_data/fleet.db"))
}
