//! Observation source port.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::Observation;

/// Source-side error type.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("market data error: {0}")]
    MarketData(String),

    #[error("no observations in the selected window")]
    EmptyWindow,

    #[error("subscription error: {0}")]
    Subscription(String),
}

/// Producer of `Observation` values, live or replayed.
///
/// Implementations must guarantee per-symbol sequence-number ordering on
/// the returned channel; the engine's drop rule is only a safety net.
#[async_trait]
pub trait ObservationSource: Send {
    /// Start producing and return the receiving end of the stream.
    /// The channel closing signals the end of the source.
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Observation>, SourceError>;
}
