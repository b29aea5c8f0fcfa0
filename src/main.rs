mod advisor;
mod api;
mod config;
mod engine;
mod error;
mod indicators;
mod ledger;
mod models;
mod trading;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{AlpacaClient, Broker, RetryBroker};
use crate::config::{AppConfig, StrategyKind};
use crate::engine::CycleEngine;
use crate::ledger::DecisionLedger;
use crate::trading::SignalGenerator;

#[derive(Parser)]
#[command(name = "autotrader", about = "RSI-driven paper-trading agent", version)]
struct Cli {
    /// Log level filter (overridden by RUST_LOG when set).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one decision cycle and print the summary.
    Scan,

    /// Run decision cycles continuously until Ctrl-C.
    Run {
        /// Seconds between cycle starts.
        #[arg(long, default_value_t = 900)]
        interval: u64,
    },

    /// Print the account snapshot and open positions.
    Status,

    /// Print recent ledger records.
    Ledger {
        /// Maximum records to print (most recent).
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Only records on or after this date (YYYY-MM-DD).
        #[arg(long)]
        since: Option<NaiveDate>,
    },

    /// Drop ledger records past the retention window.
    Rotate {
        /// Retention in days; defaults to the configured window.
        #[arg(long)]
        days: Option<u32>,
    },

    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("Configuration error")?;
    let ledger = Arc::new(DecisionLedger::new(config.ledger_path.clone()));

    match cli.command {
        Commands::Scan => {
            let engine = build_engine(&config, ledger.clone())?;
            rotate_quietly(&ledger, config.retention_days);
            let summary = engine.run_cycle().await?;
            print!("{summary}");
        }
        Commands::Run { interval } => {
            let engine = build_engine(&config, ledger.clone())?;
            info!(interval, strategy = config.strategy_kind.as_str(), "Starting cycle loop");
            run_loop(&engine, &ledger, &config, Duration::from_secs(interval)).await?;
        }
        Commands::Status => {
            let broker = build_broker(&config)?;
            let account = broker.account().await?;
            println!(
                "equity ${:.2} | cash ${:.2} | buying power ${:.2}",
                account.equity, account.cash, account.buying_power
            );
            let positions = broker.positions().await?;
            if positions.is_empty() {
                println!("no open positions");
            }
            for p in positions {
                println!(
                    "{:<6} {:>6} @ ${:<8.2} now ${:<8.2} P&L {:+.2}%",
                    p.ticker,
                    p.qty,
                    p.avg_entry_price,
                    p.current_price,
                    p.unrealized_plpc * 100.0
                );
            }
        }
        Commands::Ledger { limit, since } => {
            for d in ledger.recent(limit, since)? {
                println!(
                    "{} {:<6} {:<4} x{:<5} {}",
                    d.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    d.ticker,
                    d.action,
                    d.shares,
                    d.reason
                );
            }
        }
        Commands::Rotate { days } => {
            let retention = match days {
                Some(d) if d == 0 => None,
                Some(d) => Some(d),
                None => config.retention_days,
            };
            let removed = ledger.rotate(retention)?;
            println!("removed {removed} expired records");
        }
        Commands::Config => {
            println!("strategy: {}", config.strategy_kind.as_str());
            println!("ledger: {}", config.ledger_path.display());
            match config.retention_days {
                Some(d) => println!("retention: {d} days"),
                None => println!("retention: disabled"),
            }
            println!(
                "advisor providers: {}",
                config
                    .advisor_providers()
                    .iter()
                    .map(|p| p.name.clone())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            for (i, group) in config.watch_groups.iter().enumerate() {
                println!("group {}: {}", i + 1, group.join(", "));
            }
            println!("{}", serde_json::to_string_pretty(&config.strategy)?);
        }
    }

    Ok(())
}

fn build_broker(config: &AppConfig) -> Result<Arc<dyn Broker>> {
    let client = AlpacaClient::new(&config.alpaca_api_key, &config.alpaca_secret_key)?;
    Ok(Arc::new(RetryBroker::new(client)))
}

fn build_engine(config: &AppConfig, ledger: Arc<DecisionLedger>) -> Result<CycleEngine> {
    let broker = build_broker(config)?;

    let signals = match config.strategy_kind {
        StrategyKind::Rsi => SignalGenerator::RsiOnly {
            config: config.strategy.clone(),
        },
        StrategyKind::Advisor => {
            let advisor = advisor::LlmAdvisor::new(config.advisor_providers())?;
            SignalGenerator::AdvisorGated {
                advisor: Arc::new(advisor),
                config: config.strategy.clone(),
            }
        }
    };

    Ok(CycleEngine::new(
        broker,
        signals,
        ledger,
        config.strategy.clone(),
        config.watch_groups.clone(),
    ))
}

fn rotate_quietly(ledger: &DecisionLedger, retention_days: Option<u32>) {
    if let Err(e) = ledger.rotate(retention_days) {
        warn!(error = %e, "Ledger rotation failed");
    }
}

async fn run_loop(
    engine: &CycleEngine,
    ledger: &DecisionLedger,
    config: &AppConfig,
    interval: Duration,
) -> Result<()> {
    loop {
        rotate_quietly(ledger, config.retention_days);
        match engine.run_cycle().await {
            Ok(summary) => info!(summary = %summary, "Cycle finished"),
            Err(e) => error!(error = %e, "Cycle failed"),
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
