//! Shoplink CLI - order reconciliation and profitability reports.
//!
//! # Usage
//!
//! ```bash
//! # Apply database migrations
//! shoplink migrate
//!
//! # Sync the newest storefront orders and reconcile supplier references
//! shoplink sync orders --limit 50
//!
//! # Sync daily ad spend for a date range
//! shoplink sync spend --from 2025-02-01 --to 2025-02-10
//!
//! # Backfill history by walking display numbers downward
//! shoplink backfill --floor 1000
//!
//! # Profitability report for a day, a range, or the last N days
//! shoplink report --from 2025-02-10
//! shoplink report --from 2025-02-01 --to 2025-02-10 --json
//! shoplink report --days 30
//!
//! # Fulfillment status for one order
//! shoplink fulfillments --number 1102
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shoplink")]
#[command(author, version, about = "Storefront/supplier reconciliation tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Sync data from external sources
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },
    /// Walk display numbers downward, reconciling every order found
    Backfill {
        /// Display number to start from (default: the newest order)
        #[arg(long)]
        start: Option<i64>,

        /// Lowest display number to visit, inclusive
        #[arg(long)]
        floor: i64,
    },
    /// Profitability report for a date range or a lookback window
    Report {
        /// First (or only) day of an explicit range
        #[arg(long, conflicts_with = "days")]
        from: Option<NaiveDate>,

        /// Last day of the range; omit for a single-day report
        #[arg(long, requires = "from", conflicts_with = "days")]
        to: Option<NaiveDate>,

        /// Report the last N days ending today (default 7 when no range
        /// is given)
        #[arg(long)]
        days: Option<u32>,

        /// Emit JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },
    /// Show fulfillment records for one storefront order
    Fulfillments {
        /// Display number of the order
        #[arg(long)]
        number: i64,
    },
}

#[derive(Subcommand)]
enum SyncTarget {
    /// Sync the newest storefront orders and reconcile their references
    Orders {
        /// How many of the newest orders to sync
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Sync daily ad spend aggregates
    Spend {
        /// First day, inclusive
        #[arg(long)]
        from: NaiveDate,

        /// Last day, inclusive (default: same as --from)
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Sync { target } => match target {
            SyncTarget::Orders { limit } => commands::sync::orders(limit).await?,
            SyncTarget::Spend { from, to } => {
                commands::sync::spend(from, to.unwrap_or(from)).await?;
            }
        },
        Commands::Backfill { start, floor } => commands::backfill::run(start, floor).await?,
        Commands::Report {
            from,
            to,
            days,
            json,
        } => {
            commands::report::run(from, to, days, json).await?;
        }
        Commands::Fulfillments { number } => commands::fulfillments::run(number).await?,
    }
    Ok(())
}
