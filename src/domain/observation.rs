//! Price observations and their validation.
//!
//! An `Observation` is one sequence-numbered price sample for a symbol.
//! The sequence number is the sole ordering key: wall-clock timestamps may
//! be out of order or duplicated under replay.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an observation is rejected before touching any estimator state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("price is not finite")]
    NonFinitePrice,
    #[error("price must be > 0")]
    NonPositivePrice,
    #[error("symbol is empty")]
    EmptySymbol,
}

/// One timestamped, sequence-numbered price sample for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub symbol: String,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
    /// Strictly increasing per symbol; the sole ordering key.
    pub sequence_no: u64,
}

impl Observation {
    pub fn new(
        symbol: impl Into<String>,
        price: f64,
        timestamp: DateTime<Utc>,
        sequence_no: u64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
            sequence_no,
        }
    }

    /// Check the observation against the `InvalidObservation` taxonomy.
    pub fn validate(&self) -> Result<(), ObservationError> {
        if self.symbol.trim().is_empty() {
            return Err(ObservationError::EmptySymbol);
        }
        if !self.price.is_finite() {
            return Err(ObservationError::NonFinitePrice);
        }
        if self.price <= 0.0 {
            return Err(ObservationError::NonPositivePrice);
        }
        Ok(())
    }
}

/// Per-symbol monotone sequence numbering, shared between sources.
///
/// A warm-start replay and the live poller that follows it must hand the
/// engine one uninterrupted numbering per symbol, otherwise the engine's
/// ordering gate would drop everything the second source produces.
#[derive(Debug, Default, Clone)]
pub struct SequenceCounter {
    next: HashMap<String, u64>,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for `symbol`, starting at 1.
    pub fn next(&mut self, symbol: &str) -> u64 {
        let counter = self.next.entry(symbol.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last sequence number handed out for `symbol`, if any.
    pub fn current(&self, symbol: &str) -> Option<u64> {
        self.next.get(symbol).copied()
    }
}
