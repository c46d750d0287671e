//! Detector Layer - Streaming anomaly detection core
//!
//! The statistical heart of the sentinel:
//! - Exponentially-weighted mean/variance estimation per timeframe
//! - Z-score and z-score-trend tracking over a bounded history
//! - Two-gate alert decision (deviation magnitude AND deviation momentum)
//!
//! Everything here is synchronous and allocation-light; concurrency and
//! I/O live in the application and adapter layers.

pub mod engine;
pub mod estimator;
pub mod params;
pub mod tracker;

pub use engine::{AnomalyEngine, EngineStats, Outcome};
pub use estimator::{EwmaSnapshot, SymbolEstimator};
pub use params::{DetectorConfig, DetectorConfigError, TimeframeConfig};
pub use tracker::{ZScoreEval, ZScoreTracker};
