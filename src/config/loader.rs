//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching
//! config/sentinel.toml structure. Validation failures are fatal at
//! startup: the engine must not run with an incomplete threshold set,
//! since silent defaults could mask real anomalies.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::detector::{DetectorConfig, DetectorConfigError, TimeframeConfig};

/// Extrapolation scale applied when a timeframe has no entry in the
/// `lambda_multiplier` map.
const DEFAULT_LAMBDA_MULTIPLIER: f64 = 12.0;

/// Main configuration structure matching config/sentinel.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub detector: DetectorSection,
    pub feed: FeedSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Detector thresholds and timeframes
#[derive(Debug, Clone, Deserialize)]
pub struct DetectorSection {
    /// Alert z-score magnitude threshold (per-timeframe overridable)
    pub sigma_thresh: f64,
    /// Alert z-score trend magnitude threshold (per-timeframe overridable)
    pub zscore_trend_thresh: f64,
    /// Samples before a (symbol, timeframe) pair may alert
    pub warmup_samples: u64,
    /// Bounded z-score history length used to fit the trend
    #[serde(default = "default_trend_window")]
    pub trend_window: usize,
    /// One entry per estimation horizon
    #[serde(rename = "timeframe", default)]
    pub timeframes: Vec<TimeframeSection>,
    /// Extrapolation scale per timeframe name
    #[serde(default)]
    pub lambda_multiplier: HashMap<String, f64>,
}

fn default_trend_window() -> usize {
    20
}

/// One timeframe entry; thresholds fall back to the section globals
#[derive(Debug, Clone, Deserialize)]
pub struct TimeframeSection {
    pub name: String,
    /// Decay factor in (0, 1); weight retained from the past
    pub lambda: f64,
    #[serde(default)]
    pub sigma_thresh: Option<f64>,
    #[serde(default)]
    pub zscore_trend_thresh: Option<f64>,
}

/// Market data feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    /// Data API base URL
    pub base_url: String,
    /// Seconds between latest-trade polls in live mode
    pub poll_interval_secs: u64,
    /// Bar aggregation requested for historical fetches
    #[serde(default = "default_bar_timeframe")]
    pub bar_timeframe: String,
}

fn default_bar_timeframe() -> String {
    "1Min".to_string()
}

impl FeedSection {
    /// Base URL with environment variable override
    /// Checks ALPACA_DATA_URL env var first, falls back to config value
    pub fn resolved_base_url(&self) -> String {
        std::env::var("ALPACA_DATA_URL").unwrap_or_else(|_| self.base_url.clone())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Default log filter when neither --verbose nor --debug is given
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid detector parameters: {0}")]
    DetectorError(#[from] DetectorConfigError),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.base_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "feed.base_url cannot be empty".to_string(),
            ));
        }
        if self.feed.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(format!(
                "feed.poll_interval_secs must be >= 1, got {}",
                self.feed.poll_interval_secs
            )));
        }
        // The detector section is validated through its resolved form so
        // the per-timeframe fallbacks are checked, not the raw fields.
        DetectorConfig::from(self).validate()?;
        Ok(())
    }
}

// Conversion from Config to the engine's resolved parameter struct
impl From<&Config> for DetectorConfig {
    fn from(config: &Config) -> Self {
        let section = &config.detector;
        let timeframes = section
            .timeframes
            .iter()
            .map(|tf| TimeframeConfig {
                name: tf.name.clone(),
                lambda: tf.lambda,
                sigma_thresh: tf.sigma_thresh.unwrap_or(section.sigma_thresh),
                zscore_trend_thresh: tf
                    .zscore_trend_thresh
                    .unwrap_or(section.zscore_trend_thresh),
                lambda_multiplier: section
                    .lambda_multiplier
                    .get(&tf.name)
                    .copied()
                    .unwrap_or(DEFAULT_LAMBDA_MULTIPLIER),
            })
            .collect();

        DetectorConfig {
            warmup_samples: section.warmup_samples,
            trend_window: section.trend_window,
            timeframes,
        }
    }
}
