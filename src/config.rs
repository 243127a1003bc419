//! Configuration loading from TOML.
//!
//! Reads an optional `pricewatch.toml` and deserializes it into
//! strongly-typed structs. Every section has defaults matching the
//! standard deployment, so a missing file is not an error. Command-line
//! flags are applied on top (see [`crate::cli`]) and the merged result is
//! checked with [`AppConfig::validate`] before anything runs.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::estimator::{EstimationParameters, DEFAULT_OUTLIER_FACTOR, DEFAULT_RANGE_FRACTION};
use crate::sources::DEFAULT_MIN_RESULTS;
use crate::storage::DEFAULT_OUTPUT_DIR;
use crate::types::ConfigError;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "pricewatch.toml";

/// Default search-term list.
pub const DEFAULT_ITEMS_FILE: &str = "items.txt";

/// Desktop Edge UA; eBay returns a bot-check page to obvious clients.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/42.0.2311.135 Safari/537.36 Edge/12.246";

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Line-delimited search term file.
    pub items_path: PathBuf,
    pub schedule: ScheduleConfig,
    pub estimator: EstimatorConfig,
    pub source: SourceConfig,
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            items_path: PathBuf::from(DEFAULT_ITEMS_FILE),
            schedule: ScheduleConfig::default(),
            estimator: EstimatorConfig::default(),
            source: SourceConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Scan when the minute of the hour is a multiple of this.
    pub interval_minutes: u32,
    /// Idle wait between due checks.
    pub poll_secs: u64,
    /// Wait after a scan attempt so one due minute never fires twice.
    pub cooldown_secs: u64,
    /// Delay between consecutive quote requests within a scan.
    pub pacing_secs: u64,
    /// Run one scan immediately and exit.
    pub test_mode: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            poll_secs: 1,
            cooldown_secs: 60,
            pacing_secs: 3,
            test_mode: false,
        }
    }
}

impl ScheduleConfig {
    pub fn poll(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }
}

/// Estimator tuning. Both keys are required when the section is present.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EstimatorConfig {
    pub range_fraction: Option<f64>,
    pub outlier_factor: Option<f64>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            range_fraction: Some(DEFAULT_RANGE_FRACTION),
            outlier_factor: Some(DEFAULT_OUTLIER_FACTOR),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    /// Fewer parsed prices than this fails the fetch.
    pub min_results: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.ebay.com".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            min_results: DEFAULT_MIN_RESULTS,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// Whether a scan interval yields a regular schedule within each hour.
pub fn validate_interval(minutes: u32) -> Result<(), ConfigError> {
    if minutes == 0 || minutes > 60 || 60 % minutes != 0 {
        return Err(ConfigError::Interval(minutes));
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Estimator parameters from the `[estimator]` section.
    pub fn estimation_parameters(&self) -> Result<EstimationParameters, ConfigError> {
        Ok(EstimationParameters::from_parts(
            self.estimator.range_fraction,
            self.estimator.outlier_factor,
        )?)
    }

    /// Check every value the scheduler depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.schedule.interval_minutes)?;
        self.estimation_parameters()?;
        if self.source.min_results == 0 {
            return Err(ConfigError::MinResults);
        }
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.base_url".to_string()));
        }
        Ok(())
    }
}
