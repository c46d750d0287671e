//! Alert events emitted by the anomaly engine.
//!
//! The `Display` rendering is a compatibility contract: downstream
//! log-scraping consumers key on the field order and labels, so the line
//! format must not change.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification of a firing alert, derived from the signs of the z-score
/// and the z-score trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertAction {
    /// Positive deviation still gaining momentum.
    SpikeUp,
    /// Negative deviation still gaining momentum.
    SpikeDown,
    /// Deviation past threshold but losing momentum.
    Revert,
}

impl AlertAction {
    /// Classify from the z-score and trend of a firing alert.
    pub fn classify(zscore: f64, trend: f64) -> Self {
        if zscore > 0.0 && trend > 0.0 {
            AlertAction::SpikeUp
        } else if zscore < 0.0 && trend < 0.0 {
            AlertAction::SpikeDown
        } else {
            AlertAction::Revert
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertAction::SpikeUp => "SPIKE_UP",
            AlertAction::SpikeDown => "SPIKE_DOWN",
            AlertAction::Revert => "REVERT",
        }
    }
}

impl fmt::Display for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad() so the renderer's width specifier applies.
        f.pad(self.as_str())
    }
}

/// Immutable alert value produced by the engine, consumed by a sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub symbol: String,
    pub price: f64,
    pub zscore: f64,
    pub zscore_trend: f64,
    pub timeframe: String,
    /// Decay factor of the timeframe that fired.
    pub lambda: f64,
    /// Price projected one extrapolation step along the current deviation.
    pub extrapolated_price: f64,
    /// Evaluations since `|z|` last crossed the sigma threshold; 0 when
    /// this observation is the crossing. Sinks may use it to de-duplicate.
    pub samples_ago: u64,
    pub action: AlertAction,
}

impl Alert {
    /// Gaussian tail confidence of the deviation, in [0, 1].
    ///
    /// Standard normal CDF of |z|: the probability that a draw from the
    /// fitted distribution is less extreme than the observed price.
    pub fn confidence(&self) -> f64 {
        use statrs::function::erf::erf;
        0.5 * (1.0 + erf(self.zscore.abs() / f64::sqrt(2.0)))
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ALERT: {:<6} | Price: {:>8.3} | Z-Score: {:>5.1} | Act: {:<4} | \
             Samples Ago: {:>4} | Z-Trend: {:>5.1} | Lambda: {:>8} | Ext. Price: {:>8.3}",
            self.symbol,
            self.price,
            self.zscore,
            self.action,
            self.samples_ago,
            self.zscore_trend,
            self.lambda,
            self.extrapolated_price,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_alert() -> Alert {
        Alert {
            symbol: "AAPL".to_string(),
            price: 130.0,
            zscore: 3.56,
            zscore_trend: 2.15,
            timeframe: "1Min".to_string(),
            lambda: 0.94,
            extrapolated_price: 192.97,
            samples_ago: 0,
            action: AlertAction::SpikeUp,
        }
    }

    #[test]
    fn test_action_classification() {
        assert_eq!(AlertAction::classify(3.5, 2.1), AlertAction::SpikeUp);
        assert_eq!(AlertAction::classify(-3.5, -2.1), AlertAction::SpikeDown);
        assert_eq!(AlertAction::classify(3.5, -2.1), AlertAction::Revert);
        assert_eq!(AlertAction::classify(-3.5, 2.1), AlertAction::Revert);
    }

    #[test]
    fn test_action_strings() {
        assert_eq!(AlertAction::SpikeUp.as_str(), "SPIKE_UP");
        assert_eq!(AlertAction::SpikeDown.as_str(), "SPIKE_DOWN");
        assert_eq!(AlertAction::Revert.as_str(), "REVERT");
    }

    #[test]
    fn test_render_contract_field_order() {
        let line = sample_alert().to_string();
        // The label sequence is what scrapers key on.
        let labels = [
            "ALERT:",
            "| Price:",
            "| Z-Score:",
            "| Act:",
            "| Samples Ago:",
            "| Z-Trend:",
            "| Lambda:",
            "| Ext. Price:",
        ];
        let mut at = 0;
        for label in labels {
            let pos = line[at..]
                .find(label)
                .unwrap_or_else(|| panic!("missing `{label}` in `{line}`"));
            at += pos + label.len();
        }
        assert!(line.contains("SPIKE_UP"));
        assert!(line.contains("130.000"));
    }

    #[test]
    fn test_confidence_matches_normal_cdf() {
        let mut alert = sample_alert();
        alert.zscore = 0.0;
        assert_relative_eq!(alert.confidence(), 0.5, epsilon = 0.001);
        alert.zscore = 2.0;
        assert_relative_eq!(alert.confidence(), 0.977, epsilon = 0.001);
        // Symmetric in the sign of z.
        alert.zscore = -2.0;
        assert_relative_eq!(alert.confidence(), 0.977, epsilon = 0.001);
    }
}
