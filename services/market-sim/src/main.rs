//! Market Simulation Service - headless driver

use anyhow::{Context, Result};
use clap::Parser;
use market_sim::{EngineConfig, EngineController, EngineSnapshot};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Synthetic market-data engine
#[derive(Parser)]
#[clap(name = "market-sim")]
#[clap(about = "Runs the market simulation engine and prints its snapshots")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[clap(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop after this many ticks
    #[clap(long)]
    ticks: Option<u64>,

    /// Override the update interval
    #[clap(long)]
    interval_ms: Option<u64>,

    /// Seed for a reproducible run
    #[clap(long)]
    seed: Option<u64>,

    /// Print each snapshot summary as JSON
    #[clap(long)]
    json: bool,
}

/// One line of output per committed tick
#[derive(Serialize)]
struct TickSummary<'a> {
    symbol: &'a str,
    version: u64,
    timestamp_ms: i64,
    mid_price: f64,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    candle_volume: Option<u64>,
    last_trade: Option<&'a market_sim::Trade>,
    poc: Option<f64>,
    statistics: &'a market_sim::Statistics,
}

impl<'a> TickSummary<'a> {
    fn from_snapshot(snapshot: &'a EngineSnapshot) -> Self {
        let candle = snapshot.open_candle();
        Self {
            symbol: &snapshot.symbol,
            version: snapshot.version,
            timestamp_ms: snapshot.timestamp_ms,
            mid_price: snapshot.mid_price,
            open: candle.map(|c| c.open),
            high: candle.map(|c| c.high),
            low: candle.map(|c| c.low),
            candle_volume: candle.map(|c| c.volume),
            last_trade: snapshot.trades.first(),
            poc: snapshot.profile.as_ref().map(|p| p.poc),
            statistics: &snapshot.statistics,
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = EngineConfig::load(cli.config.as_deref()).context("Failed to load config")?;
    if let Some(interval_ms) = cli.interval_ms {
        config.update_interval_ms = interval_ms;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn print_summary(snapshot: &EngineSnapshot, json: bool) -> Result<()> {
    let summary = TickSummary::from_snapshot(snapshot);
    if json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        info!(
            version = summary.version,
            mid_price = summary.mid_price,
            cumulative_delta = summary.statistics.cumulative_delta,
            large_orders = summary.statistics.large_order_count,
            icebergs = summary.statistics.iceberg_count,
            "Snapshot"
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_sim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    info!(
        "Starting market-sim v{} for {}",
        env!("CARGO_PKG_VERSION"),
        config.symbol
    );
    info!(
        interval_ms = config.update_interval_ms,
        depth_levels = config.depth_levels,
        seed = ?config.seed,
        "Engine configuration"
    );

    let controller = EngineController::from_config(config)?;
    let mut updates = controller.subscribe();
    let mut last_version = updates.borrow_and_update().version;
    let mut ticks = 0u64;

    controller.start()?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!("Failed to listen for Ctrl+C: {}", e);
                }
                info!("Received Ctrl+C, shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if snapshot.version == last_version {
                    continue;
                }
                last_version = snapshot.version;
                ticks += 1;
                print_summary(&snapshot, cli.json)?;

                if cli.ticks.is_some_and(|budget| ticks >= budget) {
                    info!(ticks, "Tick budget spent");
                    break;
                }
            }
        }
    }

    controller.dispose();
    Ok(())
}
