//! Historical replay source.
//!
//! Replays historical bars through the same channel interface live data
//! uses. Window selection is "days_ago / ndays": the window ends
//! `days_ago` civil days before now and extends `ndays` days back from
//! there. Bars are merged chronologically across symbols (stable, so
//! original inter-observation ordering is preserved) and sequence numbers
//! are assigned per symbol in that order.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::adapters::alpaca::Bar;
use crate::domain::{Observation, SequenceCounter};
use crate::ports::{ObservationSource, SourceError};

/// Replay window in civil days.
#[derive(Debug, Clone, Copy)]
pub struct ReplayWindow {
    pub days_ago: i64,
    pub ndays: i64,
}

impl ReplayWindow {
    /// Resolve to `[start, end)` against a reference "now".
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let day_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let end = day_start - Duration::days(self.days_ago - 1);
        let start = end - Duration::days(self.ndays);
        (start, end)
    }
}

/// Deterministic observation source backed by pre-fetched bars.
pub struct ReplaySource {
    bars: HashMap<String, Vec<Bar>>,
    window: ReplayWindow,
    now: DateTime<Utc>,
    sequences: SequenceCounter,
}

impl ReplaySource {
    pub fn new(bars: HashMap<String, Vec<Bar>>, window: ReplayWindow) -> Self {
        Self::with_reference_time(bars, window, Utc::now())
    }

    /// Fixed reference time; replay becomes fully deterministic in tests.
    pub fn with_reference_time(
        bars: HashMap<String, Vec<Bar>>,
        window: ReplayWindow,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            bars,
            window,
            now,
            sequences: SequenceCounter::new(),
        }
    }

    /// Sequence counters after the replay, for chaining a live source.
    pub fn into_sequences(self) -> SequenceCounter {
        self.sequences
    }

    /// Select, merge and number the observations of the window.
    fn build_observations(&mut self) -> Vec<Observation> {
        let (start, end) = self.window.bounds(self.now);

        let mut selected: Vec<(&String, &Bar)> = self
            .bars
            .iter()
            .flat_map(|(symbol, bars)| {
                bars.iter()
                    .filter(|bar| bar.timestamp >= start && bar.timestamp < end)
                    .map(move |bar| (symbol, bar))
            })
            .collect();
        // Stable sort: same-timestamp bars keep their per-symbol order.
        selected.sort_by_key(|(_, bar)| bar.timestamp);

        selected
            .into_iter()
            .map(|(symbol, bar)| {
                let seq = self.sequences.next(symbol);
                Observation::new(symbol.clone(), bar.close, bar.timestamp, seq)
            })
            .collect()
    }
}

#[async_trait]
impl ObservationSource for ReplaySource {
    async fn subscribe(&mut self) -> Result<mpsc::Receiver<Observation>, SourceError> {
        let observations = self.build_observations();
        if observations.is_empty() {
            return Err(SourceError::EmptyWindow);
        }
        tracing::info!(
            count = observations.len(),
            days_ago = self.window.days_ago,
            ndays = self.window.ndays,
            "starting replay"
        );

        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(async move {
            for obs in observations {
                if tx.send(obs).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(ts: DateTime<Utc>, close: f64) -> Bar {
        Bar {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 100.0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 6, 12, 0, 0).unwrap()
    }

    fn minute_bars(day: DateTime<Utc>, closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(day + Duration::minutes(i as i64), c))
            .collect()
    }

    #[test]
    fn test_window_bounds() {
        let window = ReplayWindow {
            days_ago: 1,
            ndays: 2,
        };
        let (start, end) = window.bounds(now());
        assert_eq!(end, Utc.with_ymd_and_hms(2026, 3, 6, 0, 0, 0).unwrap());
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 3, 4, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_replay_preserves_order_and_numbers_per_symbol() {
        let day = Utc.with_ymd_and_hms(2026, 3, 4, 14, 30, 0).unwrap();
        let mut bars = HashMap::new();
        bars.insert("AAPL".to_string(), minute_bars(day, &[1.0, 2.0, 3.0]));
        bars.insert(
            "MSFT".to_string(),
            minute_bars(day + Duration::seconds(30), &[10.0, 20.0]),
        );

        let mut source = ReplaySource::with_reference_time(
            bars,
            ReplayWindow {
                days_ago: 1,
                ndays: 2,
            },
            now(),
        );
        let mut rx = source.subscribe().await.unwrap();

        let mut received = Vec::new();
        while let Some(obs) = rx.recv().await {
            received.push(obs);
        }

        assert_eq!(received.len(), 5);
        // Chronological across symbols.
        for pair in received.windows(2) {
            assert!(pair[0].timestamp <= pair[1].timestamp);
        }
        // Per-symbol sequence numbers are 1..n in price order.
        let aapl: Vec<(u64, f64)> = received
            .iter()
            .filter(|o| o.symbol == "AAPL")
            .map(|o| (o.sequence_no, o.price))
            .collect();
        assert_eq!(aapl, vec![(1, 1.0), (2, 2.0), (3, 3.0)]);
        assert_eq!(source.into_sequences().current("MSFT"), Some(2));
    }

    #[tokio::test]
    async fn test_replay_excludes_bars_outside_window() {
        let inside = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2026, 3, 6, 10, 0, 0).unwrap();
        let mut bars = HashMap::new();
        bars.insert(
            "AAPL".to_string(),
            vec![bar(inside, 5.0), bar(outside, 6.0)],
        );

        let mut source = ReplaySource::with_reference_time(
            bars,
            ReplayWindow {
                days_ago: 1,
                ndays: 2,
            },
            now(),
        );
        let mut rx = source.subscribe().await.unwrap();
        let mut received = Vec::new();
        while let Some(obs) = rx.recv().await {
            received.push(obs);
        }
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].price, 5.0);
    }

    #[tokio::test]
    async fn test_empty_window_is_an_error() {
        let mut source = ReplaySource::with_reference_time(
            HashMap::new(),
            ReplayWindow {
                days_ago: 1,
                ndays: 2,
            },
            now(),
        );
        assert!(matches!(
            source.subscribe().await,
            Err(SourceError::EmptyWindow)
        ));
    }
}
