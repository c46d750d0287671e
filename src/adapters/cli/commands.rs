//! CLI Command Definitions
//!
//! Argument surface for the sentinel: live run, historical replay, and
//! config check. Threshold flags override the config file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sigma Sentinel - Streaming Z-Score Anomaly Alerts
#[derive(Parser, Debug)]
#[command(
    name = "sigma-sentinel",
    version = env!("CARGO_PKG_VERSION"),
    about = "Streaming z-score anomaly alerts for market data",
    long_about = "Sigma Sentinel watches a stream of price observations and alerts \
                  when a price's z-score and z-score trend both cross their \
                  configured thresholds."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch live market data and alert in near-real time
    Run(RunCmd),

    /// Replay historical data through the same detection pipeline
    Replay(ReplayCmd),

    /// Validate the configuration and print the resolved parameters
    Check(CheckCmd),
}

/// Shared symbol-selection and threshold-override arguments
#[derive(Parser, Debug)]
pub struct CommonArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/sentinel.toml")]
    pub config: PathBuf,

    /// File containing symbols, one per line
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Comma-separated list of symbols
    #[arg(short, long, value_name = "SYMBOLS")]
    pub symbols: Option<String>,

    /// Override the z-score magnitude threshold for all timeframes
    #[arg(long, value_name = "SIGMA")]
    pub sigma_thresh: Option<f64>,

    /// Override the z-score trend threshold for all timeframes
    #[arg(long, value_name = "TREND")]
    pub zscore_trend_thresh: Option<f64>,
}

/// Watch live market data
#[derive(Parser, Debug)]
pub struct RunCmd {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Days of historical data to warm-start the estimators with
    #[arg(long, value_name = "DAYS", default_value = "2")]
    pub ndays: i64,

    /// Seconds between latest-trade polls (overrides config)
    #[arg(long, value_name = "SECS")]
    pub poll_interval: Option<u64>,

    /// Number of worker tasks; symbols are hash-routed to a fixed worker
    #[arg(long, value_name = "N", default_value = "1")]
    pub workers: usize,
}

/// Replay historical data
#[derive(Parser, Debug)]
pub struct ReplayCmd {
    #[command(flatten)]
    pub common: CommonArgs,

    /// How many days back the replay window ends
    #[arg(long, value_name = "DAYS", default_value = "1")]
    pub days_ago: i64,

    /// Length of the replay window in days
    #[arg(long, value_name = "DAYS", default_value = "2")]
    pub ndays: i64,

    /// Number of worker tasks; symbols are hash-routed to a fixed worker
    #[arg(long, value_name = "N", default_value = "1")]
    pub workers: usize,
}

/// Validate configuration
#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/sentinel.toml")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_defaults() {
        let app = CliApp::try_parse_from(["sigma-sentinel", "run", "--symbols", "AAPL"]).unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.common.config, PathBuf::from("config/sentinel.toml"));
                assert_eq!(cmd.common.symbols.as_deref(), Some("AAPL"));
                assert_eq!(cmd.ndays, 2);
                assert_eq!(cmd.workers, 1);
                assert!(cmd.poll_interval.is_none());
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_run_with_overrides() {
        let app = CliApp::try_parse_from([
            "sigma-sentinel",
            "run",
            "--file",
            "symbols.txt",
            "--ndays",
            "5",
            "--poll-interval",
            "10",
            "--workers",
            "4",
            "--sigma-thresh",
            "3.5",
            "--zscore-trend-thresh",
            "1.8",
        ])
        .unwrap();

        match app.command {
            Command::Run(cmd) => {
                assert_eq!(cmd.common.file, Some(PathBuf::from("symbols.txt")));
                assert_eq!(cmd.ndays, 5);
                assert_eq!(cmd.poll_interval, Some(10));
                assert_eq!(cmd.workers, 4);
                assert_eq!(cmd.common.sigma_thresh, Some(3.5));
                assert_eq!(cmd.common.zscore_trend_thresh, Some(1.8));
            }
            _ => panic!("Expected Run command"),
        }
    }

    #[test]
    fn test_parse_replay() {
        let app = CliApp::try_parse_from([
            "sigma-sentinel",
            "replay",
            "--symbols",
            "AAPL,MSFT",
            "--days-ago",
            "3",
            "--ndays",
            "1",
        ])
        .unwrap();

        match app.command {
            Command::Replay(cmd) => {
                assert_eq!(cmd.days_ago, 3);
                assert_eq!(cmd.ndays, 1);
                assert_eq!(cmd.common.symbols.as_deref(), Some("AAPL,MSFT"));
            }
            _ => panic!("Expected Replay command"),
        }
    }

    #[test]
    fn test_parse_check() {
        let app =
            CliApp::try_parse_from(["sigma-sentinel", "check", "--config", "custom.toml"]).unwrap();

        match app.command {
            Command::Check(cmd) => {
                assert_eq!(cmd.config, PathBuf::from("custom.toml"));
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let app = CliApp::try_parse_from([
            "sigma-sentinel",
            "-v",
            "--debug",
            "check",
        ])
        .unwrap();

        assert!(app.verbose);
        assert!(app.debug);
    }
}
