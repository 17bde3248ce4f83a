//! Database seeder for ledger development and testing.
//!
//! Registers a fixed set of accounts so local runs and manual testing can
//! refer to stable ids. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use ledger_core::ledger::{Account, AccountKind, LedgerStore};
use ledger_db::SeaOrmLedgerStore;
use ledger_shared::AppConfig;
use ledger_shared::clock;
use ledger_shared::types::AccountId;
use uuid::Uuid;

/// Settlement account offsetting deposits and withdrawals.
const SETTLEMENT_ACCOUNT_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);
/// First customer account.
const ALICE_ACCOUNT_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);
/// Second customer account.
const BOB_ACCOUNT_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0003);
/// Clearing account for in-flight transfers.
const TRANSIT_ACCOUNT_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0004);

const SEED_ACCOUNTS: [(&str, Uuid, AccountKind); 4] = [
    ("settlement", SETTLEMENT_ACCOUNT_ID, AccountKind::System),
    ("alice", ALICE_ACCOUNT_ID, AccountKind::User),
    ("bob", BOB_ACCOUNT_ID, AccountKind::User),
    ("transit", TRANSIT_ACCOUNT_ID, AccountKind::Transit),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    println!("Connecting to database...");
    let db = ledger_db::connect_with(&config.database)
        .await
        .context("failed to connect to database")?;
    let store = SeaOrmLedgerStore::new(db);

    println!("Seeding accounts...");
    for (label, id, kind) in SEED_ACCOUNTS {
        seed_account(&store, label, AccountId::from_uuid(id), kind).await?;
    }

    println!("Seeding complete!");
    println!(
        "  Set LEDGER__LEDGER__SETTLEMENT_ACCOUNT={SETTLEMENT_ACCOUNT_ID} to book offsetting entries."
    );
    Ok(())
}

async fn seed_account(
    store: &SeaOrmLedgerStore,
    label: &str,
    id: AccountId,
    kind: AccountKind,
) -> anyhow::Result<()> {
    if store.find_account(id).await?.is_some() {
        println!("  {label} ({id}) already exists, skipping...");
        return Ok(());
    }

    store
        .insert_account(&Account::restore(id, kind, clock::now()))
        .await
        .with_context(|| format!("failed to insert {label} account"))?;
    println!("  Created {kind} account {label} ({id})");
    Ok(())
}
