//! Z-Score Tracker
//!
//! Turns an estimator's current mean/std-dev plus the latest price into a
//! z-score and a z-score trend, and keeps the crossing bookkeeping behind
//! the `samples_ago` alert field.
//!
//! The trend is the newest z minus the mean of the previous history
//! window. A continuously-adapting EWMA bounds |z| at lambda/sqrt(1-lambda)
//! (about 3.84 at lambda = 0.94), so the trend signal distinguishes a fresh
//! shock out of a quiet regime (large trend) from a sustained plateau the
//! estimator has already absorbed (trend near zero).

use std::collections::VecDeque;

use crate::detector::params::STD_DEV_EPSILON;

/// Outcome of one tracker evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZScoreEval {
    /// Warm-up incomplete or degenerate variance; caller must not alert.
    NotReady,
    Ready {
        zscore: f64,
        trend: f64,
        /// Evaluations since |z| last crossed the sigma threshold.
        samples_ago: u64,
    },
}

/// Rolling z-score state for one (symbol, timeframe) pair.
#[derive(Debug, Clone)]
pub struct ZScoreTracker {
    history: VecDeque<f64>,
    capacity: usize,
    warmup_samples: u64,
    sigma_thresh: f64,
    /// Evaluations performed (z actually computed).
    evals: u64,
    /// Evaluation index of the most recent upward threshold crossing.
    last_cross: Option<u64>,
    was_above: bool,
}

impl ZScoreTracker {
    pub fn new(capacity: usize, warmup_samples: u64, sigma_thresh: f64) -> Self {
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            warmup_samples,
            sigma_thresh,
            evals: 0,
            last_cross: None,
            was_above: false,
        }
    }

    /// Evaluate the latest price against the estimator's state.
    ///
    /// History and crossing bookkeeping advance even while warming up, so
    /// the trend baseline already exists when alerts unlock; only the
    /// returned readiness changes.
    pub fn evaluate(
        &mut self,
        price: f64,
        mean: f64,
        std_dev: f64,
        sample_count: u64,
    ) -> ZScoreEval {
        if std_dev < STD_DEV_EPSILON {
            return ZScoreEval::NotReady;
        }

        let zscore = (price - mean) / std_dev;
        let trend = match self.history.len() {
            0 => 0.0,
            n => {
                let prev_mean: f64 = self.history.iter().sum::<f64>() / n as f64;
                zscore - prev_mean
            }
        };

        self.history.push_back(zscore);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let above = zscore.abs() >= self.sigma_thresh;
        if above && !self.was_above {
            self.last_cross = Some(self.evals);
        }
        self.was_above = above;
        let samples_ago = self.last_cross.map(|c| self.evals - c).unwrap_or(0);
        self.evals += 1;

        if sample_count <= self.warmup_samples {
            return ZScoreEval::NotReady;
        }

        ZScoreEval::Ready {
            zscore,
            trend,
            samples_ago,
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// History snapshot, oldest first (for diagnostics and tests).
    pub fn history(&self) -> impl Iterator<Item = f64> + '_ {
        self.history.iter().copied()
    }
}
