//! Sigma Sentinel - Streaming Z-Score Anomaly Alert Library
//!
//! Watches a stream of price observations and alerts when a price's
//! z-score and z-score trend both cross their configured thresholds.
//!
//! # Modules
//!
//! - `domain`: Core value types (Observation, Alert, sequence numbering)
//! - `detector`: The engine core (estimators, trackers, AnomalyEngine)
//! - `ports`: Trait abstractions (ObservationSource, AlertSink)
//! - `adapters`: External implementations (Alpaca REST, replay, live, CLI)
//! - `application`: Supervisor and sharded dispatcher
//! - `config`: Configuration loading and validation

pub mod adapters;
pub mod application;
pub mod config;
pub mod detector;
pub mod domain;
pub mod ports;
