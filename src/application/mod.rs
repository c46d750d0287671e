//! Application Layer - Wiring between sources, engines and sinks.

pub mod dispatcher;
pub mod supervisor;

pub use dispatcher::ShardedDispatcher;
pub use supervisor::Supervisor;
