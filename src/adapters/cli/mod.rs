//! CLI adapter.

pub mod commands;

pub use commands::{CheckCmd, CliApp, Command, CommonArgs, ReplayCmd, RunCmd};
