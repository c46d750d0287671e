//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Observation feeds (live polling or deterministic replay)
//! - Alert delivery (log line rendering, test recording)

pub mod alert_sink;
pub mod observation_source;

pub use alert_sink::{AlertSink, LogAlertSink, RecordingSink};
pub use observation_source::{ObservationSource, SourceError};
