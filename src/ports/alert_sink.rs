//! Alert sink port.
//!
//! The engine emits every firing alert here and never rate-limits;
//! de-duplication policy, if any, belongs to the sink (the `samples_ago`
//! field exists for exactly that).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Alert, AlertAction};

/// Consumer of alert events. Must not block: `emit` is called on the
/// observation hot path.
#[cfg_attr(test, mockall::automock)]
pub trait AlertSink: Send + Sync {
    fn emit(&self, alert: &Alert);
}

/// Renders each alert as the textual contract line at info level, plus a
/// TREND CHANGE line whenever a symbol's action flips.
#[derive(Debug, Default)]
pub struct LogAlertSink {
    last_action: Mutex<HashMap<String, AlertAction>>,
}

impl LogAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the action for a symbol; returns the previous action when it
    /// differed from the new one.
    fn note_action(&self, symbol: &str, action: AlertAction) -> Option<AlertAction> {
        let mut last = self.last_action.lock().expect("sink poisoned");
        match last.insert(symbol.to_string(), action) {
            Some(prev) if prev != action => Some(prev),
            _ => None,
        }
    }
}

impl AlertSink for LogAlertSink {
    fn emit(&self, alert: &Alert) {
        if let Some(prev) = self.note_action(&alert.symbol, alert.action) {
            tracing::info!(
                "TREND CHANGE: {:<6} | Prev Act: {} | New Act: {}",
                alert.symbol,
                prev,
                alert.action
            );
        }
        tracing::info!("{}", alert);
    }
}

/// Collects alerts in memory; the test double used across the crate.
#[derive(Debug, Default)]
pub struct RecordingSink {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().expect("sink poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().expect("sink poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertSink for RecordingSink {
    fn emit(&self, alert: &Alert) {
        self.alerts.lock().expect("sink poisoned").push(alert.clone());
    }
}
