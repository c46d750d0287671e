//! Detector Parameters
//!
//! Fully-resolved configuration consumed by the anomaly engine. Produced
//! from the file config at startup; immutable for the process lifetime.

use serde::{Deserialize, Serialize};

/// Standard deviation below which a series is treated as degenerate.
pub const STD_DEV_EPSILON: f64 = 1e-10;

/// One exponentially-weighted estimation horizon.
///
/// Thresholds are resolved per timeframe: the file config lets a timeframe
/// override the global gates, and the result lands here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeConfig {
    /// Display name, e.g. "1Min" or "1Day".
    pub name: String,
    /// Decay factor in (0, 1); weight retained from the past.
    pub lambda: f64,
    /// Alert gate on |z|.
    pub sigma_thresh: f64,
    /// Alert gate on |z-trend|.
    pub zscore_trend_thresh: f64,
    /// Extrapolation scale for the projected price.
    pub lambda_multiplier: f64,
}

/// Resolved engine configuration: one entry per timeframe plus the shared
/// warm-up and trend-window knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Samples required before a (symbol, timeframe) pair may alert.
    pub warmup_samples: u64,
    /// Bounded z-score history length used to fit the trend.
    pub trend_window: usize,
    pub timeframes: Vec<TimeframeConfig>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            warmup_samples: 10,
            trend_window: 20,
            timeframes: vec![TimeframeConfig {
                name: "1Min".to_string(),
                lambda: 0.94,
                sigma_thresh: 3.0,
                zscore_trend_thresh: 2.0,
                lambda_multiplier: 12.0,
            }],
        }
    }
}

impl DetectorConfig {
    /// Override the sigma gate on every timeframe.
    pub fn with_sigma_thresh(mut self, thresh: f64) -> Self {
        for tf in &mut self.timeframes {
            tf.sigma_thresh = thresh;
        }
        self
    }

    /// Override the trend gate on every timeframe.
    pub fn with_zscore_trend_thresh(mut self, thresh: f64) -> Self {
        for tf in &mut self.timeframes {
            tf.zscore_trend_thresh = thresh;
        }
        self
    }

    /// Validate all parameters. Any failure is fatal at startup: running
    /// with an incomplete threshold set could mask real anomalies.
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        if self.timeframes.is_empty() {
            return Err(DetectorConfigError::NoTimeframes);
        }
        if self.warmup_samples == 0 {
            return Err(DetectorConfigError::InvalidWarmup(self.warmup_samples));
        }
        if self.trend_window < 2 {
            return Err(DetectorConfigError::InvalidTrendWindow(self.trend_window));
        }
        for tf in &self.timeframes {
            if tf.name.trim().is_empty() {
                return Err(DetectorConfigError::EmptyTimeframeName);
            }
            if !(tf.lambda > 0.0 && tf.lambda < 1.0) {
                return Err(DetectorConfigError::InvalidLambda {
                    timeframe: tf.name.clone(),
                    lambda: tf.lambda,
                });
            }
            if tf.sigma_thresh <= 0.0 || !tf.sigma_thresh.is_finite() {
                return Err(DetectorConfigError::InvalidSigmaThresh {
                    timeframe: tf.name.clone(),
                    thresh: tf.sigma_thresh,
                });
            }
            if tf.zscore_trend_thresh <= 0.0 || !tf.zscore_trend_thresh.is_finite() {
                return Err(DetectorConfigError::InvalidTrendThresh {
                    timeframe: tf.name.clone(),
                    thresh: tf.zscore_trend_thresh,
                });
            }
            if tf.lambda_multiplier <= 0.0 || !tf.lambda_multiplier.is_finite() {
                return Err(DetectorConfigError::InvalidLambdaMultiplier {
                    timeframe: tf.name.clone(),
                    multiplier: tf.lambda_multiplier,
                });
            }
        }
        let mut names: Vec<&str> = self.timeframes.iter().map(|tf| tf.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.timeframes.len() {
            return Err(DetectorConfigError::DuplicateTimeframeName);
        }
        Ok(())
    }
}

/// Detector parameter validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectorConfigError {
    #[error("at least one timeframe must be configured")]
    NoTimeframes,
    #[error("warmup_samples must be >= 1, got {0}")]
    InvalidWarmup(u64),
    #[error("trend_window must be >= 2, got {0}")]
    InvalidTrendWindow(usize),
    #[error("timeframe name cannot be empty")]
    EmptyTimeframeName,
    #[error("duplicate timeframe name")]
    DuplicateTimeframeName,
    #[error("timeframe {timeframe}: lambda must be in (0, 1), got {lambda}")]
    InvalidLambda { timeframe: String, lambda: f64 },
    #[error("timeframe {timeframe}: sigma_thresh must be > 0, got {thresh}")]
    InvalidSigmaThresh { timeframe: String, thresh: f64 },
    #[error("timeframe {timeframe}: zscore_trend_thresh must be > 0, got {thresh}")]
    InvalidTrendThresh { timeframe: String, thresh: f64 },
    #[error("timeframe {timeframe}: lambda_multiplier must be > 0, got {multiplier}")]
    InvalidLambdaMultiplier { timeframe: String, multiplier: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DetectorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.warmup_samples, 10);
        assert_eq!(config.trend_window, 20);
        assert_eq!(config.timeframes.len(), 1);
        assert_eq!(config.timeframes[0].lambda, 0.94);
    }

    #[test]
    fn test_threshold_overrides() {
        let config = DetectorConfig::default()
            .with_sigma_thresh(4.0)
            .with_zscore_trend_thresh(1.5);
        assert_eq!(config.timeframes[0].sigma_thresh, 4.0);
        assert_eq!(config.timeframes[0].zscore_trend_thresh, 1.5);
    }

    #[test]
    fn test_rejects_empty_timeframes() {
        let mut config = DetectorConfig::default();
        config.timeframes.clear();
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::NoTimeframes)
        ));
    }

    #[test]
    fn test_rejects_lambda_outside_unit_interval() {
        let mut config = DetectorConfig::default();
        config.timeframes[0].lambda = 1.0;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::InvalidLambda { .. })
        ));

        config.timeframes[0].lambda = 0.0;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::InvalidLambda { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut config = DetectorConfig::default();
        config.timeframes[0].sigma_thresh = 0.0;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::InvalidSigmaThresh { .. })
        ));

        let mut config = DetectorConfig::default();
        config.timeframes[0].zscore_trend_thresh = -1.0;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::InvalidTrendThresh { .. })
        ));
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut config = DetectorConfig::default();
        let dup = config.timeframes[0].clone();
        config.timeframes.push(dup);
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::DuplicateTimeframeName)
        ));
    }

    #[test]
    fn test_rejects_short_trend_window() {
        let mut config = DetectorConfig::default();
        config.trend_window = 1;
        assert!(matches!(
            config.validate(),
            Err(DetectorConfigError::InvalidTrendWindow(1))
        ));
    }
}
