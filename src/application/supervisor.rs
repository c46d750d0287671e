//! Observation supervisor.
//!
//! Drains an observation channel into a single engine. The engine is a
//! synchronous state machine; the supervisor is the async shell around it.
//! Sources guarantee per-symbol ordering on the channel, so one consumer
//! task is sufficient and no locking is involved.

use tokio::sync::mpsc;

use crate::detector::{AnomalyEngine, EngineStats};
use crate::domain::Observation;

pub struct Supervisor {
    engine: AnomalyEngine,
}

impl Supervisor {
    pub fn new(engine: AnomalyEngine) -> Self {
        Self { engine }
    }

    /// Process observations until the channel closes; returns the engine
    /// counters accumulated so far.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<Observation>) -> EngineStats {
        while let Some(obs) = rx.recv().await {
            self.engine.on_observation(&obs);
        }
        let stats = self.engine.stats();
        tracing::info!(
            processed = stats.processed,
            alerts = stats.alerts_emitted,
            dropped_invalid = stats.dropped_invalid,
            dropped_out_of_order = stats.dropped_out_of_order,
            "observation stream ended"
        );
        stats
    }

    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    pub fn engine(&self) -> &AnomalyEngine {
        &self.engine
    }
}
