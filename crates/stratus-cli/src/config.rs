use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stratus_core::{Dimension, ScoreWeights, HOURS_PER_MONTH};
use stratus_utils::PollPolicy;
use thiserror::Error;

/// Environment variable overriding the configuration directory
pub const HOME_ENV: &str = "STRATUS_HOME";

/// Configuration-specific errors that can occur during config operations
///
/// # Variants
/// * `UnknownKey` - The dotted key does not name a known setting
/// * `InvalidValue` - A configuration value is invalid for its field
/// * `DirectoryCreationFailed` - Failed to create the config directory
/// * `TomlError` - Error parsing or serializing TOML data
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Config directory creation failed: {0}")]
    DirectoryCreationFailed(String),

    #[error("TOML parsing error: {0}")]
    TomlError(String),
}

/// Poll defaults used by `stratus wait`
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PollConfig {
    pub timeout_secs: Option<u64>,
    pub interval_secs: Option<u64>,
}

/// Pricing defaults used by the price scorer
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PricingConfig {
    pub hours_per_month: Option<f64>,
    pub commitment_months: Option<u32>,
}

/// Main configuration structure containing all configuration sections
///
/// # Fields
/// * `poll` - Optional poll interval/timeout defaults
/// * `pricing` - Optional pricing defaults
/// * `weights` - Optional per-dimension score weight overrides, keyed by dimension
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigData {
    pub poll: Option<PollConfig>,
    pub pricing: Option<PricingConfig>,
    pub weights: Option<BTreeMap<String, f64>>,
}

/// Configuration manager that handles loading, saving, and accessing configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: PathBuf,
    pub data: ConfigData,
}

impl Config {
    /// Load from the default location (`$STRATUS_HOME` or `~/.stratus`)
    pub fn new() -> Result<Self> {
        Self::load_from(&config_dir()?)
    }

    /// Empty configuration bound to `config.toml` in the given directory, without reading it
    pub fn empty_at(config_dir: &Path) -> Self {
        Config {
            config_path: config_dir.join("config.toml"),
            data: ConfigData::default(),
        }
    }

    /// Load `config.toml` from the given directory, or start empty
    ///
    /// # Errors
    /// * `ConfigError::TomlError` - If TOML parsing fails
    /// * `CliError::Io` - If the file exists but cannot be read
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        let data = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))?
        } else {
            ConfigData::default()
        };

        log::debug!("Loaded configuration from {}", config_path.display());
        Ok(Config { config_path, data })
    }

    /// Save the configuration to file with atomic write
    ///
    /// # Errors
    /// * `ConfigError::TomlError` - If TOML serialization fails
    /// * `ConfigError::DirectoryCreationFailed` - If directory creation fails
    /// * `CliError::Io` - If file operations fail
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.data)
            .map_err(|e| ConfigError::TomlError(e.to_string()))?;

        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::DirectoryCreationFailed(e.to_string()))?;
            }
        }

        // Write to a temporary file first, then rename
        let temp_path = self.config_path.with_extension("tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &self.config_path)?;

        Ok(())
    }

    /// Poll policy from the `[poll]` section, falling back to the poller defaults
    pub fn poll_policy(&self) -> Result<PollPolicy> {
        let defaults = PollPolicy::default();
        let poll = self.data.poll.clone().unwrap_or_default();

        let total_timeout = poll
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.total_timeout);
        let interval = poll
            .interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.interval);

        Ok(PollPolicy::new(total_timeout, interval)?)
    }

    pub fn hours_per_month(&self) -> Result<f64> {
        match self.data.pricing.as_ref().and_then(|p| p.hours_per_month) {
            Some(hours) if !valid_hours(hours) => {
                Err(invalid_value("pricing.hours_per_month", hours))
            }
            Some(hours) => Ok(hours),
            None => Ok(HOURS_PER_MONTH),
        }
    }

    pub fn commitment_months(&self) -> Result<Option<u32>> {
        match self.data.pricing.as_ref().and_then(|p| p.commitment_months) {
            Some(0) => Err(invalid_value("pricing.commitment_months", 0)),
            months => Ok(months),
        }
    }

    /// Default weights with the `[weights]` overrides applied
    pub fn score_weights(&self) -> Result<ScoreWeights> {
        let mut weights = ScoreWeights::default();

        if let Some(overrides) = &self.data.weights {
            for (key, weight) in overrides {
                let field = format!("weights.{}", key);
                let dimension: Dimension = key
                    .parse()
                    .map_err(|_| ConfigError::UnknownKey(field.clone()))?;
                if !valid_weight(*weight) {
                    return Err(invalid_value(&field, weight));
                }
                weights.set(dimension, *weight);
            }
        }

        Ok(weights)
    }

    /// Get a value by dotted key, e.g. `poll.interval_secs`
    pub fn get_value(&self, key: &str) -> Result<Option<String>> {
        let (section, field) = split_key(key)?;
        let poll = self.data.poll.as_ref();
        let pricing = self.data.pricing.as_ref();

        let value = match (section, field) {
            ("poll", "timeout_secs") => poll.and_then(|p| p.timeout_secs).map(|v| v.to_string()),
            ("poll", "interval_secs") => {
                poll.and_then(|p| p.interval_secs).map(|v| v.to_string())
            }
            ("pricing", "hours_per_month") => {
                pricing.and_then(|p| p.hours_per_month).map(|v| v.to_string())
            }
            ("pricing", "commitment_months") => {
                pricing.and_then(|p| p.commitment_months).map(|v| v.to_string())
            }
            ("weights", dimension) => {
                let dimension: Dimension = dimension
                    .parse()
                    .map_err(|_| ConfigError::UnknownKey(key.to_string()))?;
                self.data
                    .weights
                    .as_ref()
                    .and_then(|w| w.get(dimension.key()))
                    .map(|v| v.to_string())
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
        };

        Ok(value)
    }

    /// Set a value by dotted key, validating it for the target field
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let (section, field) = split_key(key)?;
        let previous_poll = self.data.poll.clone();
        let invalid = || ConfigError::InvalidValue {
            field: key.to_string(),
            value: value.to_string(),
        };

        match (section, field) {
            ("poll", "timeout_secs") => {
                let secs = value.trim().parse::<u64>().map_err(|_| invalid())?;
                self.data.poll.get_or_insert_with(Default::default).timeout_secs = Some(secs);
            }
            ("poll", "interval_secs") => {
                let secs = value
                    .trim()
                    .parse::<u64>()
                    .ok()
                    .filter(|s| *s > 0)
                    .ok_or_else(invalid)?;
                self.data.poll.get_or_insert_with(Default::default).interval_secs = Some(secs);
            }
            ("pricing", "hours_per_month") => {
                let hours = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|h| valid_hours(*h))
                    .ok_or_else(invalid)?;
                self.data
                    .pricing
                    .get_or_insert_with(Default::default)
                    .hours_per_month = Some(hours);
            }
            ("pricing", "commitment_months") => {
                let months = value
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(invalid)?;
                self.data
                    .pricing
                    .get_or_insert_with(Default::default)
                    .commitment_months = Some(months);
            }
            ("weights", dimension) => {
                let dimension: Dimension = dimension
                    .parse()
                    .map_err(|_| ConfigError::UnknownKey(key.to_string()))?;
                let weight = value
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|w| valid_weight(*w))
                    .ok_or_else(invalid)?;
                self.data
                    .weights
                    .get_or_insert_with(Default::default)
                    .insert(dimension.key().to_string(), weight);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string()).into()),
        }

        // Timeout and interval are only valid together
        if section == "poll" {
            if let Err(e) = self.poll_policy() {
                self.data.poll = previous_poll;
                return Err(e);
            }
        }

        Ok(())
    }

    pub fn show_config(&self) -> String {
        toml::to_string_pretty(&self.data).unwrap_or_else(|_| "Error formatting config".to_string())
    }
}

fn valid_hours(hours: f64) -> bool {
    hours.is_finite() && hours > 0.0
}

fn valid_weight(weight: f64) -> bool {
    weight.is_finite() && weight >= 0.0
}

fn invalid_value(field: &str, value: impl std::fmt::Display) -> CliError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    key.split_once('.')
        .filter(|(section, field)| !section.is_empty() && !field.is_empty())
        .ok_or_else(|| CliError::Config(ConfigError::UnknownKey(key.to_string())))
}

/// Configuration directory: `$STRATUS_HOME`, else `~/.stratus`
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(dir));
    }

    let home_dir = home::home_dir().ok_or_else(|| {
        ConfigError::DirectoryCreationFailed("Could not find home directory".to_string())
    })?;

    Ok(home_dir.join(".stratus"))
}
