//! Exponentially-Weighted Symbol Estimator
//!
//! Maintains a streaming mean and variance for one (symbol, timeframe)
//! pair without storing observation history:
//!
//! - `ewma' = ewma + (1 - lambda) * delta`
//! - `ewvar' = lambda * ewvar + (1 - lambda) * delta^2`
//!
//! where `delta = price - ewma` and `lambda` is the weight retained from
//! the past (smaller lambda = faster adaptation). The variance recurrence
//! is a sum of non-negative terms, so `ewvar >= 0` holds without clamping.
//! A single extreme outlier moves the estimate by at most `(1 - lambda)`
//! of its deviation.

use crate::domain::ObservationError;

/// Mean and standard deviation after an update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaSnapshot {
    pub mean: f64,
    pub std_dev: f64,
}

/// Streaming EWMA mean/variance tracker for a single decay horizon.
#[derive(Debug, Clone)]
pub struct SymbolEstimator {
    lambda: f64,
    ewma: f64,
    ewvar: f64,
    sample_count: u64,
    initialized: bool,
}

impl SymbolEstimator {
    /// Create an estimator with decay `lambda` in (0, 1).
    pub fn new(lambda: f64) -> Self {
        Self {
            lambda,
            ewma: 0.0,
            ewvar: 0.0,
            sample_count: 0,
            initialized: false,
        }
    }

    /// Fold one price into the estimate.
    ///
    /// A non-finite or non-positive price fails and leaves the state
    /// untouched; the update is otherwise atomic and no partial state is
    /// ever observable.
    pub fn update(&mut self, price: f64) -> Result<EwmaSnapshot, ObservationError> {
        if !price.is_finite() {
            return Err(ObservationError::NonFinitePrice);
        }
        if price <= 0.0 {
            return Err(ObservationError::NonPositivePrice);
        }

        if !self.initialized {
            self.ewma = price;
            self.ewvar = 0.0;
            self.initialized = true;
        } else {
            let delta = price - self.ewma;
            self.ewma += (1.0 - self.lambda) * delta;
            self.ewvar = self.lambda * self.ewvar + (1.0 - self.lambda) * delta * delta;
        }
        self.sample_count += 1;

        Ok(self.snapshot())
    }

    /// Current mean and standard deviation.
    pub fn snapshot(&self) -> EwmaSnapshot {
        EwmaSnapshot {
            mean: self.ewma,
            std_dev: self.ewvar.sqrt(),
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}
