use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use balancebook::app;
use balancebook::config::{default_config_path, ResolvedConfig};
use balancebook::storage::{JsonFileStorage, Storage};
use balancebook::summary::Period;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn parse_lookback_arg(s: &str) -> Result<u64, String> {
    balancebook::duration::parse_days(s).map_err(|e| e.to_string())
}

#[derive(Parser)]
#[command(name = "balancebook")]
#[command(about = "Fund performance ledger and personal balance tracker")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show current configuration
    Config,

    /// Fetch the full history and rebuild every personal balance
    Backfill {
        /// First date to fetch (defaults to ingest.backfill_start)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last date to fetch (defaults to ingest.backfill_end)
        #[arg(long)]
        end: Option<NaiveDate>,
    },

    /// Rebuild every personal balance from the recorded events
    Recompute,

    /// Re-fetch recent days and extend the personal balance chain
    Ingest {
        /// How far back to re-fetch, e.g. "5d" or "2w" (defaults to ingest.lookback_days)
        #[arg(long, value_parser = parse_lookback_arg)]
        lookback: Option<u64>,
    },

    /// Contributions and withdrawals
    Event {
        #[command(subcommand)]
        command: EventCommand,
    },

    /// Stored daily performance rows
    Rows {
        #[command(subcommand)]
        command: RowsCommand,
    },

    /// Personal balance change over a period
    Summary {
        /// One of 1d, 7d, 1m, 1y, all
        #[arg(long, default_value = "1d")]
        period: Period,
    },
}

#[derive(Subcommand)]
enum EventCommand {
    /// Record a contribution or withdrawal
    Add {
        /// Effective date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// CONTRIBUTION or WITHDRAWAL
        #[arg(long = "type")]
        kind: String,

        /// Positive amount in USD
        #[arg(long)]
        amount: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List recorded events
    List,
}

#[derive(Subcommand)]
enum RowsCommand {
    /// List rows, optionally within an inclusive date range
    List {
        #[arg(long)]
        start: Option<NaiveDate>,

        #[arg(long)]
        end: Option<NaiveDate>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{out}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();

    let cli = Cli::parse();

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let storage: Arc<dyn Storage> = Arc::new(JsonFileStorage::new(&config.data_dir));

    match cli.command {
        Command::Config => print_json(&app::config_output(&cli.config, &config)),
        Command::Backfill { start, end } => {
            let source = app::build_source(&config)?;
            let output = app::backfill(storage.as_ref(), &source, &config, start, end).await?;
            print_json(&output)
        }
        Command::Recompute => {
            let report = app::recompute(storage.as_ref(), &config).await?;
            print_json(&report)
        }
        Command::Ingest { lookback } => {
            let source = app::build_source(&config)?;
            let output = app::ingest(storage.as_ref(), &source, &config, lookback).await?;
            print_json(&output)
        }
        Command::Event { command } => match command {
            EventCommand::Add {
                date,
                kind,
                amount,
                notes,
            } => {
                let output = app::add_event(
                    storage.as_ref(),
                    &config,
                    &date,
                    &kind,
                    &amount,
                    notes.as_deref(),
                )
                .await?;
                print_json(&output)
            }
            EventCommand::List => print_json(&app::list_events(storage.as_ref()).await?),
        },
        Command::Rows { command } => match command {
            RowsCommand::List { start, end } => {
                print_json(&app::list_rows(storage.as_ref(), start, end).await?)
            }
        },
        Command::Summary { period } => print_json(&app::summary(storage, period).await?),
    }
}
