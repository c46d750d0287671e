//! Sharded observation dispatcher.
//!
//! Scales processing across worker tasks while keeping the single-writer-
//! per-symbol rule: each worker owns an independent engine and a symbol is
//! always hash-routed to the same worker, so no symbol state is ever
//! shared and unrelated symbols never contend on a lock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::detector::{AnomalyEngine, DetectorConfig, EngineStats};
use crate::domain::Observation;
use crate::ports::AlertSink;

pub struct ShardedDispatcher {
    senders: Vec<mpsc::Sender<Observation>>,
    handles: Vec<JoinHandle<EngineStats>>,
}

impl ShardedDispatcher {
    /// Spawn `workers` tasks, each owning its own engine over the shared
    /// config and sink.
    pub fn new(workers: usize, config: Arc<DetectorConfig>, sink: Arc<dyn AlertSink>) -> Self {
        let workers = workers.max(1);
        let mut senders = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for worker_id in 0..workers {
            let (tx, mut rx) = mpsc::channel::<Observation>(256);
            let mut engine = AnomalyEngine::new(Arc::clone(&config), Arc::clone(&sink));
            let handle = tokio::spawn(async move {
                while let Some(obs) = rx.recv().await {
                    engine.on_observation(&obs);
                }
                tracing::debug!(worker_id, "worker drained");
                engine.stats()
            });
            senders.push(tx);
            handles.push(handle);
        }

        Self { senders, handles }
    }

    pub fn workers(&self) -> usize {
        self.senders.len()
    }

    fn route(&self, symbol: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        symbol.hash(&mut hasher);
        (hasher.finish() as usize) % self.senders.len()
    }

    /// Route one observation to its symbol's worker. Returns false if the
    /// worker is gone.
    pub async fn dispatch(&self, obs: Observation) -> bool {
        let worker = self.route(&obs.symbol);
        self.senders[worker].send(obs).await.is_ok()
    }

    /// Drain a source channel through the shard set, then shut down and
    /// merge the per-worker counters.
    pub async fn pump(self, mut rx: mpsc::Receiver<Observation>) -> EngineStats {
        while let Some(obs) = rx.recv().await {
            if !self.dispatch(obs).await {
                tracing::warn!("worker channel closed early");
                break;
            }
        }
        self.shutdown().await
    }

    /// Close the worker channels and merge their final counters.
    pub async fn shutdown(self) -> EngineStats {
        drop(self.senders);
        let mut total = EngineStats::default();
        for handle in self.handles {
            match handle.await {
                Ok(stats) => total.merge(&stats),
                Err(err) => tracing::error!("worker panicked: {err}"),
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RecordingSink;
    use chrono::{TimeZone, Utc};

    fn obs(symbol: &str, price: f64, seq: u64) -> Observation {
        let ts = Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap();
        Observation::new(symbol, price, ts, seq)
    }

    #[tokio::test]
    async fn test_symbols_route_to_a_fixed_worker() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher =
            ShardedDispatcher::new(4, Arc::new(DetectorConfig::default()), sink);

        let first = dispatcher.route("AAPL");
        for _ in 0..10 {
            assert_eq!(dispatcher.route("AAPL"), first);
        }
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_pump_processes_everything_in_symbol_order() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher =
            ShardedDispatcher::new(3, Arc::new(DetectorConfig::default()), sink);

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for i in 1..=20u64 {
                tx.send(obs("AAPL", 100.0, i)).await.unwrap();
                tx.send(obs("MSFT", 200.0, i)).await.unwrap();
                tx.send(obs("NVDA", 300.0, i)).await.unwrap();
            }
        });

        let stats = dispatcher.pump(rx).await;
        assert_eq!(stats.processed, 60);
        assert_eq!(stats.dropped_out_of_order, 0);
    }

    #[tokio::test]
    async fn test_single_worker_floor() {
        let sink = Arc::new(RecordingSink::new());
        let dispatcher = ShardedDispatcher::new(0, Arc::new(DetectorConfig::default()), sink);
        assert_eq!(dispatcher.workers(), 1);
        dispatcher.shutdown().await;
    }
}
