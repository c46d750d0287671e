//! Sigma Sentinel - Streaming Z-Score Anomaly Alerts
//!
//! Watches live or replayed market data and alerts when a price's z-score
//! and z-score trend both cross their configured thresholds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

use sigma_sentinel::adapters::alpaca::AlpacaClient;
use sigma_sentinel::adapters::cli::{CheckCmd, CliApp, Command, CommonArgs, ReplayCmd, RunCmd};
use sigma_sentinel::adapters::symbols::collect_symbols;
use sigma_sentinel::adapters::{PollingSource, ReplaySource, ReplayWindow};
use sigma_sentinel::application::{ShardedDispatcher, Supervisor};
use sigma_sentinel::config::{load_config, Config};
use sigma_sentinel::detector::{AnomalyEngine, DetectorConfig, EngineStats};
use sigma_sentinel::domain::Observation;
use sigma_sentinel::ports::{LogAlertSink, ObservationSource, SourceError};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present (API credentials go there, not in the config)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    match app.command {
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::Replay(cmd) => replay_command(cmd, app.verbose, app.debug).await,
        Command::Check(cmd) => check_command(cmd, app.verbose, app.debug),
    }
}

fn init_logging(verbose: bool, debug: bool, default_level: &str) {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

/// Load the config file and resolve the detector parameters, applying any
/// CLI threshold overrides.
fn load_and_resolve(common: &CommonArgs) -> Result<(Config, DetectorConfig)> {
    let path = shellexpand::tilde(&common.config.to_string_lossy()).to_string();
    let config = load_config(&path)
        .with_context(|| format!("Failed to load configuration from {path}"))?;

    let mut detector = DetectorConfig::from(&config);
    if let Some(sigma) = common.sigma_thresh {
        detector = detector.with_sigma_thresh(sigma);
    }
    if let Some(trend) = common.zscore_trend_thresh {
        detector = detector.with_zscore_trend_thresh(trend);
    }
    detector
        .validate()
        .context("Invalid threshold override")?;

    Ok((config, detector))
}

fn resolve_symbols(common: &CommonArgs) -> Result<Vec<String>> {
    let file = common
        .file
        .as_ref()
        .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).to_string()));
    let symbols = collect_symbols(file.as_deref(), common.symbols.as_deref())?;
    Ok(symbols.into_iter().collect())
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let (config, detector) = load_and_resolve(&cmd.common)?;
    init_logging(verbose, debug, &config.logging.level);
    tracing::info!("Starting Sigma Sentinel...");

    let symbols = resolve_symbols(&cmd.common)?;
    tracing::info!("Watching symbols: {}", symbols.join(", "));

    let client = AlpacaClient::from_env(config.feed.resolved_base_url())
        .context("Failed to create market data client")?;

    // Warm-start: replay the last ndays of history through the engines so
    // the estimators are seeded before live data arrives.
    let end = Utc::now();
    let start = end - chrono::Duration::days(cmd.ndays);
    let bars = client
        .fetch_bars_for_symbols(&symbols, start, end, &config.feed.bar_timeframe)
        .await
        .context("Failed to fetch warm-start history")?;

    let sink = Arc::new(LogAlertSink::new());
    let dispatcher = ShardedDispatcher::new(cmd.workers, Arc::new(detector), sink);

    let mut warm = ReplaySource::new(
        bars,
        ReplayWindow {
            days_ago: 0,
            ndays: cmd.ndays,
        },
    );
    match warm.subscribe().await {
        Ok(rx) => drain_into(&dispatcher, rx).await,
        Err(SourceError::EmptyWindow) => {
            tracing::warn!("no historical data in the warm-start window; starting cold")
        }
        Err(err) => return Err(err).context("Warm-start replay failed"),
    }
    tracing::info!("Warm-start complete");

    let interval = cmd
        .poll_interval
        .unwrap_or(config.feed.poll_interval_secs);
    let mut live = PollingSource::with_sequences(
        client,
        symbols,
        Duration::from_secs(interval),
        warm.into_sequences(),
    );
    let rx = live.subscribe().await.context("Failed to start live feed")?;

    tokio::select! {
        _ = drain_into(&dispatcher, rx) => {
            tracing::warn!("live feed ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    let stats = dispatcher.shutdown().await;
    print_summary(&stats);
    Ok(())
}

async fn replay_command(cmd: ReplayCmd, verbose: bool, debug: bool) -> Result<()> {
    let (config, detector) = load_and_resolve(&cmd.common)?;
    init_logging(verbose, debug, &config.logging.level);
    tracing::info!(
        "Replaying {} day(s) of data ending {} day(s) ago...",
        cmd.ndays,
        cmd.days_ago
    );

    let symbols = resolve_symbols(&cmd.common)?;
    let client = AlpacaClient::from_env(config.feed.resolved_base_url())
        .context("Failed to create market data client")?;

    let end = Utc::now();
    let start = end - chrono::Duration::days(cmd.days_ago + cmd.ndays + 1);
    let bars = client
        .fetch_bars_for_symbols(&symbols, start, end, &config.feed.bar_timeframe)
        .await
        .context("Failed to fetch historical data")?;

    let mut source = ReplaySource::new(
        bars,
        ReplayWindow {
            days_ago: cmd.days_ago,
            ndays: cmd.ndays,
        },
    );
    let rx = source
        .subscribe()
        .await
        .context("Replay produced no observations")?;

    let sink = Arc::new(LogAlertSink::new());
    let detector = Arc::new(detector);
    let stats = if cmd.workers > 1 {
        ShardedDispatcher::new(cmd.workers, detector, sink).pump(rx).await
    } else {
        let mut supervisor = Supervisor::new(AnomalyEngine::new(detector, sink));
        supervisor.run(rx).await
    };

    print_summary(&stats);
    Ok(())
}

fn check_command(cmd: CheckCmd, verbose: bool, debug: bool) -> Result<()> {
    let path = shellexpand::tilde(&cmd.config.to_string_lossy()).to_string();
    let config =
        load_config(&path).with_context(|| format!("Failed to load configuration from {path}"))?;
    init_logging(verbose, debug, &config.logging.level);

    let detector = DetectorConfig::from(&config);
    println!("Configuration OK: {path}");
    println!("  warmup_samples: {}", detector.warmup_samples);
    println!("  trend_window:   {}", detector.trend_window);
    for tf in &detector.timeframes {
        println!(
            "  timeframe {:<6} lambda: {:<6} sigma_thresh: {:<5} zscore_trend_thresh: {:<5} lambda_multiplier: {}",
            tf.name, tf.lambda, tf.sigma_thresh, tf.zscore_trend_thresh, tf.lambda_multiplier
        );
    }
    println!("  feed: {} (poll every {}s)", config.feed.base_url, config.feed.poll_interval_secs);
    Ok(())
}

async fn drain_into(dispatcher: &ShardedDispatcher, mut rx: mpsc::Receiver<Observation>) {
    while let Some(obs) = rx.recv().await {
        if !dispatcher.dispatch(obs).await {
            tracing::warn!("worker channel closed early");
            break;
        }
    }
}

fn print_summary(stats: &EngineStats) {
    println!("Processed:            {}", stats.processed);
    println!("Alerts emitted:       {}", stats.alerts_emitted);
    println!("Dropped (invalid):    {}", stats.dropped_invalid);
    println!("Dropped (out of seq): {}", stats.dropped_out_of_order);
}
