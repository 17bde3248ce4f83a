//! Failure-tolerance simulator for the ledger.
//!
//! Replays duplicate, retried, shuffled, and delayed submissions through the
//! operation processor and prints a JSON report to stdout.
//!
//! Usage:
//!   simulator duplicate --parallel 100 --target-account <id>
//!   simulator retry --retries 3 --delay-ms 500
//!   simulator --in-memory out-of-order --count 10
//!   simulator delayed --delay-ms 2000

mod cli;
mod scenarios;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ledger_core::ledger::{InMemoryLedgerStore, LedgerStore, ProcessorSettings};
use ledger_db::SeaOrmLedgerStore;
use ledger_shared::AppConfig;
use ledger_shared::config::{LedgerConfig, TelemetryConfig};
use tracing::info;

use cli::{Cli, Scenario};
use scenarios::Simulator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // The in-memory store needs no database section, so a missing URL is fine there.
    let config = match AppConfig::load() {
        Ok(config) => Some(config),
        Err(_) if cli.in_memory => None,
        Err(e) => return Err(e).context("failed to load configuration"),
    };
    let (ledger, telemetry) = config.as_ref().map_or_else(
        || (LedgerConfig::default(), TelemetryConfig::default()),
        |config| (config.ledger.clone(), config.telemetry.clone()),
    );
    telemetry::init(&telemetry);

    let store: Arc<dyn LedgerStore> = match &config {
        Some(config) if !cli.in_memory => {
            let db = ledger_db::connect_with(&config.database)
                .await
                .context("failed to connect to database")?;
            info!("Connected to database");
            Arc::new(SeaOrmLedgerStore::new(db))
        }
        _ => {
            info!("Using in-memory store");
            Arc::new(InMemoryLedgerStore::new())
        }
    };

    let simulator = Simulator::new(store, ProcessorSettings::from(&ledger));
    let report = match &cli.scenario {
        Scenario::Duplicate {
            operation,
            parallel,
        } => simulator.duplicate(operation, *parallel).await?,
        Scenario::Retry {
            operation,
            retries,
            delay_ms,
        } => {
            simulator
                .retry(operation, *retries, Duration::from_millis(*delay_ms))
                .await?
        }
        Scenario::OutOfOrder { operation, count } => {
            simulator.out_of_order(operation, *count).await?
        }
        Scenario::Delayed {
            operation,
            delay_ms,
        } => {
            simulator
                .delayed(operation, Duration::from_millis(*delay_ms))
                .await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
