//! Command-line interface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use ledger_core::ledger::OperationKind;
use ledger_shared::types::AccountId;
use rust_decimal::Decimal;

/// Failure-tolerance simulations for the ledger.
#[derive(Parser, Debug, Clone)]
#[command(name = "simulator")]
#[command(version)]
#[command(about = "Replays dirty production traffic against the ledger", long_about = None)]
pub struct Cli {
    /// Run against a fresh in-memory store instead of PostgreSQL.
    #[arg(long, global = true, default_value_t = false)]
    pub in_memory: bool,

    /// Scenario to run.
    #[command(subcommand)]
    pub scenario: Scenario,
}

/// Available scenarios.
#[derive(Subcommand, Debug, Clone)]
pub enum Scenario {
    /// Sends the same operation N times in parallel.
    Duplicate {
        #[command(flatten)]
        operation: OperationArgs,
        /// Number of parallel submissions.
        #[arg(short = 'n', long, default_value_t = 10)]
        parallel: usize,
    },
    /// Sends an operation, then retries it sequentially with a pause.
    Retry {
        #[command(flatten)]
        operation: OperationArgs,
        /// Number of retries after the initial attempt.
        #[arg(short = 'n', long, default_value_t = 3)]
        retries: usize,
        /// Pause between attempts.
        #[arg(long, default_value_t = 500)]
        delay_ms: u64,
    },
    /// Processes a batch of distinct deposits in shuffled order.
    OutOfOrder {
        #[command(flatten)]
        operation: OperationArgs,
        /// Number of operations in the batch.
        #[arg(short = 'n', long, default_value_t = 5)]
        count: usize,
    },
    /// Processes one operation after a delay.
    Delayed {
        #[command(flatten)]
        operation: OperationArgs,
        /// Delay before submitting.
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },
}

/// Operation kinds accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    /// Credit the target account.
    Deposit,
    /// Debit the source account.
    Withdrawal,
    /// Move money from source to target.
    Transfer,
}

impl From<KindArg> for OperationKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Deposit => Self::Deposit,
            KindArg::Withdrawal => Self::Withdrawal,
            KindArg::Transfer => Self::Transfer,
        }
    }
}

/// The operation a scenario submits.
#[derive(Args, Debug, Clone)]
pub struct OperationArgs {
    /// Idempotency key; a unique one is generated when omitted.
    #[arg(short, long)]
    pub reference: Option<String>,

    /// Operation kind.
    #[arg(short, long, value_enum, default_value_t = KindArg::Deposit)]
    pub kind: KindArg,

    /// Account debited by withdrawals and transfers; opened when omitted.
    #[arg(long)]
    pub source_account: Option<AccountId>,

    /// Account credited by deposits and transfers; opened when omitted.
    #[arg(long)]
    pub target_account: Option<AccountId>,

    /// Amount of the operation.
    #[arg(short, long, default_value = "100.00")]
    pub amount: Decimal,
}
