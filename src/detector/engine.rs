//! Anomaly Engine
//!
//! Owns one estimator/tracker lane per (symbol, timeframe) pair, consumes
//! price observations in sequence order, and emits alerts when both the
//! z-score and the z-score trend cross their thresholds.
//!
//! The two-condition gate is the central design decision: a large
//! deviation that is not trending is treated as noise, not as an anomaly
//! worth a fresh alert.

use std::collections::HashMap;
use std::sync::Arc;

use crate::detector::estimator::SymbolEstimator;
use crate::detector::params::{DetectorConfig, TimeframeConfig};
use crate::detector::tracker::{ZScoreEval, ZScoreTracker};
use crate::domain::{Alert, AlertAction, Observation, ObservationError};
use crate::ports::AlertSink;

/// Result of feeding one observation through the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Observation accepted; carries the alerts it fired (often none).
    Processed(Vec<Alert>),
    /// Sequence number not past the last processed one; dropped silently.
    OutOfOrder,
    /// Failed validation; dropped with a warning.
    Invalid(ObservationError),
}

/// Running counters for shutdown summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub processed: u64,
    pub dropped_out_of_order: u64,
    pub dropped_invalid: u64,
    pub alerts_emitted: u64,
}

impl EngineStats {
    pub fn merge(&mut self, other: &EngineStats) {
        self.processed += other.processed;
        self.dropped_out_of_order += other.dropped_out_of_order;
        self.dropped_invalid += other.dropped_invalid;
        self.alerts_emitted += other.alerts_emitted;
    }
}

/// One estimation lane: a timeframe's estimator plus its tracker.
#[derive(Debug)]
struct Lane {
    timeframe: Arc<TimeframeConfig>,
    estimator: SymbolEstimator,
    tracker: ZScoreTracker,
}

/// Per-symbol state, created lazily on first observation and never
/// removed for the process lifetime.
#[derive(Debug)]
struct SymbolState {
    last_sequence_no: Option<u64>,
    lanes: Vec<Lane>,
}

impl SymbolState {
    fn new(config: &DetectorConfig, timeframes: &[Arc<TimeframeConfig>]) -> Self {
        let lanes = timeframes
            .iter()
            .map(|tf| Lane {
                timeframe: Arc::clone(tf),
                estimator: SymbolEstimator::new(tf.lambda),
                tracker: ZScoreTracker::new(
                    config.trend_window,
                    config.warmup_samples,
                    tf.sigma_thresh,
                ),
            })
            .collect();
        Self {
            last_sequence_no: None,
            lanes,
        }
    }
}

/// Streaming anomaly detector across all symbols and timeframes.
///
/// `on_observation` is a pure, synchronous state transition; any
/// concurrency (and the per-symbol ordering guarantee) belongs to the
/// caller. Single writer per symbol is assumed.
pub struct AnomalyEngine {
    config: Arc<DetectorConfig>,
    timeframes: Vec<Arc<TimeframeConfig>>,
    symbols: HashMap<String, SymbolState>,
    sink: Arc<dyn AlertSink>,
    stats: EngineStats,
}

impl AnomalyEngine {
    pub fn new(config: Arc<DetectorConfig>, sink: Arc<dyn AlertSink>) -> Self {
        let timeframes = config.timeframes.iter().cloned().map(Arc::new).collect();
        Self {
            config,
            timeframes,
            symbols: HashMap::new(),
            sink,
            stats: EngineStats::default(),
        }
    }

    /// Feed one observation through every configured timeframe.
    pub fn on_observation(&mut self, obs: &Observation) -> Outcome {
        if let Err(err) = obs.validate() {
            tracing::warn!(symbol = %obs.symbol, price = obs.price, "dropping observation: {err}");
            self.stats.dropped_invalid += 1;
            return Outcome::Invalid(err);
        }

        let config = &self.config;
        let timeframes = &self.timeframes;
        let state = self
            .symbols
            .entry(obs.symbol.clone())
            .or_insert_with(|| SymbolState::new(config, timeframes));

        if let Some(last) = state.last_sequence_no {
            if obs.sequence_no <= last {
                tracing::debug!(
                    symbol = %obs.symbol,
                    sequence_no = obs.sequence_no,
                    last,
                    "dropping out-of-order observation"
                );
                self.stats.dropped_out_of_order += 1;
                return Outcome::OutOfOrder;
            }
        }
        state.last_sequence_no = Some(obs.sequence_no);

        let mut alerts = Vec::new();
        for lane in &mut state.lanes {
            // Validation already passed; the estimator re-checks as its own
            // invariant but cannot fail here.
            let snap = match lane.estimator.update(obs.price) {
                Ok(snap) => snap,
                Err(_) => continue,
            };

            let eval = lane.tracker.evaluate(
                obs.price,
                snap.mean,
                snap.std_dev,
                lane.estimator.sample_count(),
            );
            let (zscore, trend, samples_ago) = match eval {
                ZScoreEval::NotReady => continue,
                ZScoreEval::Ready {
                    zscore,
                    trend,
                    samples_ago,
                } => (zscore, trend, samples_ago),
            };

            let tf = &lane.timeframe;
            if zscore.abs() < tf.sigma_thresh || trend.abs() < tf.zscore_trend_thresh {
                continue;
            }

            let alert = Alert {
                symbol: obs.symbol.clone(),
                price: obs.price,
                zscore,
                zscore_trend: trend,
                timeframe: tf.name.clone(),
                lambda: tf.lambda,
                extrapolated_price: snap.mean
                    + zscore.signum() * tf.lambda_multiplier * snap.std_dev,
                samples_ago,
                action: AlertAction::classify(zscore, trend),
            };
            self.sink.emit(&alert);
            alerts.push(alert);
        }

        self.stats.processed += 1;
        self.stats.alerts_emitted += alerts.len() as u64;
        Outcome::Processed(alerts)
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    /// Number of symbols with state in the arena.
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Last processed sequence number for a symbol, if it has state.
    pub fn last_sequence_no(&self, symbol: &str) -> Option<u64> {
        self.symbols.get(symbol).and_then(|s| s.last_sequence_no)
    }

    /// Snapshot of (mean, std_dev, sample_count) per timeframe for a
    /// symbol; diagnostics and equivalence tests.
    pub fn lane_snapshots(&self, symbol: &str) -> Vec<(String, f64, f64, u64)> {
        self.symbols
            .get(symbol)
            .map(|state| {
                state
                    .lanes
                    .iter()
                    .map(|lane| {
                        let snap = lane.estimator.snapshot();
                        (
                            lane.timeframe.name.clone(),
                            snap.mean,
                            snap.std_dev,
                            lane.estimator.sample_count(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
