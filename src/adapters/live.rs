//! Live polling source.
//!
//! Polls the latest-trade endpoint at a fixed interval and forwards each
//! fresh trade as an observation. Trades are de-duplicated by their
//! exchange timestamp, so a quiet symbol produces nothing rather than a
//! stream of repeats. Sequence numbering continues from an injected
//! `SequenceCounter`, letting live data extend a warm-start replay under
//! one uninterrupted per-symbol numbering.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::adapters::alpaca::AlpacaClient;
use crate::domain::{Observation, SequenceCounter};
use crate::ports::{ObservationSource, SourceError};

pub struct PollingSource {
    client: AlpacaClient,
    symbols: Vec<String>,
    interval: Duration,
    sequences: SequenceCounter,
    last_trade_ts: HashMap<String, DateTime<Utc>>,
}

impl PollingSource {
    pub fn new(client: AlpacaClient, symbols: Vec<String>, interval: Duration) -> Self {
        Self::with_sequences(client, symbols, interval, SequenceCounter::new())
    }

    /// Continue numbering from a prior source (warm-start chaining).
    pub fn with_sequences(
        client: AlpacaClient,
        symbols: Vec<String>,
        interval: Duration,
        sequences: SequenceCounter,
    ) -> Self {
        Self {
            client,
            symbols,
            interval,
            sequences,
            last_trade_ts: HashMap::new(),
        }
    }
}

#[async_trait]
impl ObservationSource for PollingSource {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Observation>, SourceError> {
        if self.symbols.is_empty() {
            return Err(SourceError::Subscription("no symbols to poll".into()));
        }

        let (tx, rx) = mpsc::channel(256);
        let client = self.client.clone();
        let symbols = self.symbols.clone();
        let interval = self.interval;
        let mut sequences = self.sequences.clone();
        let mut last_trade_ts = std::mem::take(&mut self.last_trade_ts);

        tracing::info!(
            symbols = symbols.len(),
            interval_secs = interval.as_secs(),
            "starting live polling"
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let trades = match client.latest_trades(&symbols).await {
                    Ok(trades) => trades,
                    Err(err) => {
                        tracing::warn!("latest-trade poll failed: {err}");
                        continue;
                    }
                };

                for (symbol, trade) in trades {
                    let stale = last_trade_ts
                        .get(&symbol)
                        .map(|seen| trade.timestamp <= *seen)
                        .unwrap_or(false);
                    if stale {
                        continue;
                    }
                    last_trade_ts.insert(symbol.clone(), trade.timestamp);

                    let seq = sequences.next(&symbol);
                    let obs = Observation::new(symbol, trade.price, trade.timestamp, seq);
                    if tx.send(obs).await.is_err() {
                        tracing::info!("observation channel closed, stopping poller");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
