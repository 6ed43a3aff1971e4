//! Configuration loading and validation for actguard.
//!
//! Loads domain policy parameters and dependency overrides from
//! `~/.actguard/config.toml` (or the file named by `ACTGUARD_CONFIG`).
//! Validates all settings at load time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "ACTGUARD_CONFIG";

/// The root configuration structure.
///
/// Maps directly to `~/.actguard/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Bank domain settings
    #[serde(default)]
    pub bank: BankConfig,

    /// Hotel domain settings
    #[serde(default)]
    pub hotel: HotelConfig,
}

/// Bank policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Largest total loan balance a user may owe
    #[serde(default = "default_maximum_owed_balance")]
    pub maximum_owed_balance: f64,

    /// Currency units transfers and deposits may use
    #[serde(default = "default_accepted_units")]
    pub accepted_units: Vec<String>,

    /// Customizable dependency overrides, action → constraint text.
    /// An empty string removes the precondition.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

fn default_maximum_owed_balance() -> f64 {
    500.0
}
fn default_accepted_units() -> Vec<String> {
    vec!["dollars".into()]
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            maximum_owed_balance: default_maximum_owed_balance(),
            accepted_units: default_accepted_units(),
            dependencies: BTreeMap::new(),
        }
    }
}

/// Hotel policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelConfig {
    #[serde(default = "default_max_room_service_orders_per_day")]
    pub max_room_service_orders_per_day: u32,

    /// Customizable dependency overrides, action → constraint text.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

fn default_max_room_service_orders_per_day() -> u32 {
    3
}

impl Default for HotelConfig {
    fn default() -> Self {
        Self {
            max_room_service_orders_per_day: default_max_room_service_orders_per_day(),
            dependencies: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `ACTGUARD_CONFIG` if set, otherwise from
    /// `~/.actguard/config.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var(CONFIG_ENV) {
            Ok(path) => PathBuf::from(path),
            Err(_) => Self::config_dir().join("config.toml"),
        };
        Self::load_from(&path)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".actguard")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.bank.maximum_owed_balance.is_finite() || self.bank.maximum_owed_balance < 0.0 {
            return Err(ConfigError::ValidationError(
                "bank.maximum_owed_balance must be a non-negative number".into(),
            ));
        }

        if self.bank.accepted_units.is_empty() {
            return Err(ConfigError::ValidationError(
                "bank.accepted_units must name at least one unit".into(),
            ));
        }

        if self.bank.accepted_units.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "bank.accepted_units must not contain blank entries".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for actguard_core::Error {
    fn from(e: ConfigError) -> Self {
        actguard_core::Error::Config {
            message: e.to_string(),
        }
    }
}
