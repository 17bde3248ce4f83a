//! Failure-tolerance scenarios.
//!
//! Each scenario submits traffic a flaky upstream would produce and reports
//! how many distinct operations the ledger ended up booking.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use ledger_core::ledger::{
    Account, AccountKind, LedgerStore, Operation, OperationKind, OperationProcessor,
    ProcessOperation, ProcessorSettings,
};
use ledger_shared::types::AccountId;
use rand::seq::SliceRandom;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::Barrier;
use tracing::{debug, info};
use uuid::Uuid;

use crate::cli::OperationArgs;

/// Source tag of every simulated submission.
const SIMULATION_SOURCE: &str = "simulation";

/// Outcome of one scenario, printed as JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    /// Submissions sent.
    pub total_requests: usize,
    /// Distinct operations the submissions resolved to.
    pub unique_operations: usize,
    /// Submissions answered with an already booked operation.
    pub duplicates_detected: usize,
    /// Wall time of the scenario.
    pub execution_time_ms: u64,
    pub message: String,
    /// Operations worth showing; the first one for duplicate-style scenarios.
    pub operations: Vec<Operation>,
}

impl SimulationReport {
    fn new(
        total_requests: usize,
        unique_operations: usize,
        started: Instant,
        message: String,
        shown: Vec<Operation>,
    ) -> Self {
        Self {
            total_requests,
            unique_operations,
            duplicates_detected: total_requests.saturating_sub(unique_operations),
            execution_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            message,
            operations: shown,
        }
    }
}

/// Runs scenarios against one store.
pub struct Simulator {
    store: Arc<dyn LedgerStore>,
    processor: Arc<OperationProcessor<dyn LedgerStore>>,
}

fn distinct(operations: &[Operation]) -> usize {
    operations
        .iter()
        .map(Operation::id)
        .collect::<HashSet<_>>()
        .len()
}

impl Simulator {
    /// Creates a simulator booking through `store`.
    pub fn new(store: Arc<dyn LedgerStore>, settings: ProcessorSettings) -> Self {
        let processor = Arc::new(OperationProcessor::new(Arc::clone(&store), settings));
        Self { store, processor }
    }

    /// Submits the same operation `parallel` times at once.
    pub async fn duplicate(
        &self,
        args: &OperationArgs,
        parallel: usize,
    ) -> anyhow::Result<SimulationReport> {
        let command = self.prepare(args).await?;
        let started = Instant::now();
        info!(
            parallel,
            reference = %command.reference,
            "Starting duplicate simulation"
        );

        let barrier = Arc::new(Barrier::new(parallel));
        let handles = (0..parallel).map(|attempt| {
            let processor = Arc::clone(&self.processor);
            let barrier = Arc::clone(&barrier);
            let command = command.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                debug!(attempt, reference = %command.reference, "Submitting request");
                processor.process(&command).await
            })
        });

        let mut operations = Vec::with_capacity(parallel);
        for joined in join_all(handles).await {
            operations.push(joined??);
        }

        let unique = distinct(&operations);
        let shown = operations.into_iter().take(1).collect();
        let report = SimulationReport::new(
            parallel,
            unique,
            started,
            format!(
                "Idempotency working! {parallel} parallel requests resulted in {unique} operation(s)"
            ),
            shown,
        );
        info!(
            requests = report.total_requests,
            unique_operations = report.unique_operations,
            elapsed_ms = report.execution_time_ms,
            "Duplicate simulation completed"
        );
        Ok(report)
    }

    /// Submits an operation, then `retries` more times with a pause in between.
    pub async fn retry(
        &self,
        args: &OperationArgs,
        retries: usize,
        delay: Duration,
    ) -> anyhow::Result<SimulationReport> {
        let command = self.prepare(args).await?;
        let started = Instant::now();
        info!(
            retries,
            delay = ?delay,
            reference = %command.reference,
            "Starting retry simulation"
        );

        let mut operations = vec![self.processor.process(&command).await?];
        for attempt in 1..=retries {
            tokio::time::sleep(delay).await;
            debug!(attempt, "Retry attempt");
            operations.push(self.processor.process(&command).await?);
        }

        let total = retries + 1;
        let unique = distinct(&operations);
        let shown = operations.into_iter().take(1).collect();
        let report = SimulationReport::new(
            total,
            unique,
            started,
            format!("Retry tolerance working! {total} webhook retries resulted in {unique} operation(s)"),
            shown,
        );
        info!(
            attempts = total,
            unique_operations = report.unique_operations,
            elapsed_ms = report.execution_time_ms,
            "Retry simulation completed"
        );
        Ok(report)
    }

    /// Builds `count` distinct operations and processes them in shuffled order.
    ///
    /// The i-th operation moves `amount * i`, so the final balances are the
    /// same for every permutation.
    pub async fn out_of_order(
        &self,
        args: &OperationArgs,
        count: usize,
    ) -> anyhow::Result<SimulationReport> {
        let base = self.prepare(args).await?;
        let started = Instant::now();
        info!(count, "Starting out-of-order simulation");

        let mut commands: Vec<ProcessOperation> = (1..=count)
            .map(|i| {
                let mut command = base.clone();
                command.reference = format!("{}-{i:03}", base.reference);
                command.amount = base.amount * Decimal::from(i);
                command
            })
            .collect();
        commands.shuffle(&mut rand::rng());

        let mut operations = Vec::with_capacity(count);
        for command in &commands {
            debug!(reference = %command.reference, "Processing shuffled operation");
            operations.push(self.processor.process(command).await?);
        }

        let report = SimulationReport::new(
            count,
            distinct(&operations),
            started,
            "Out-of-order tolerance working! Operations processed in random order with consistent results"
                .to_string(),
            operations,
        );
        info!(
            operations = report.unique_operations,
            elapsed_ms = report.execution_time_ms,
            "Out-of-order simulation completed"
        );
        Ok(report)
    }

    /// Waits `delay`, then submits one operation.
    pub async fn delayed(
        &self,
        args: &OperationArgs,
        delay: Duration,
    ) -> anyhow::Result<SimulationReport> {
        let command = self.prepare(args).await?;
        let started = Instant::now();
        info!(
            delay = ?delay,
            reference = %command.reference,
            "Starting delayed simulation"
        );

        tokio::time::sleep(delay).await;
        let operation = self.processor.process(&command).await?;

        let report = SimulationReport::new(
            1,
            1,
            started,
            format!(
                "Delay tolerance working! Operation processed successfully after {}ms delay",
                delay.as_millis()
            ),
            vec![operation],
        );
        info!(
            elapsed_ms = report.execution_time_ms,
            "Delayed simulation completed"
        );
        Ok(report)
    }

    /// Resolves the submitted command, opening any account the caller left out.
    async fn prepare(&self, args: &OperationArgs) -> anyhow::Result<ProcessOperation> {
        let reference = args
            .reference
            .clone()
            .unwrap_or_else(|| format!("SIM-{}", Uuid::now_v7().simple()));

        let command = match OperationKind::from(args.kind) {
            OperationKind::Deposit => {
                let target = self.account_or_open(args.target_account).await?;
                ProcessOperation::deposit(reference, target, args.amount)
            }
            OperationKind::Withdrawal => {
                let source = self.account_or_open(args.source_account).await?;
                ProcessOperation::withdrawal(reference, source, args.amount)
            }
            OperationKind::Transfer => {
                let source = self.account_or_open(args.source_account).await?;
                let target = self.account_or_open(args.target_account).await?;
                ProcessOperation::transfer(reference, source, target, args.amount)
            }
        };

        Ok(command.with_source(SIMULATION_SOURCE))
    }

    async fn account_or_open(&self, id: Option<AccountId>) -> anyhow::Result<AccountId> {
        if let Some(id) = id {
            return Ok(id);
        }

        let account = Account::open(AccountKind::User);
        self.store.insert_account(&account).await?;
        info!(account_id = %account.id, "Opened simulation account");
        Ok(account.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::KindArg;
    use ledger_core::ledger::{BalanceService, InMemoryLedgerStore};
    use ledger_shared::types::Currency;
    use rust_decimal_macros::dec;

    fn args(kind: KindArg, target: Option<AccountId>) -> OperationArgs {
        OperationArgs {
            reference: None,
            kind,
            source_account: None,
            target_account: target,
            amount: dec!(100.00),
        }
    }

    fn simulator() -> (Arc<InMemoryLedgerStore>, Simulator) {
        let store = Arc::new(InMemoryLedgerStore::new());
        let simulator = Simulator::new(Arc::clone(&store) as Arc<dyn LedgerStore>, ProcessorSettings::default());
        (store, simulator)
    }

    #[tokio::test]
    async fn test_duplicate_books_once() {
        let (store, simulator) = simulator();
        let report = simulator.duplicate(&args(KindArg::Deposit, None), 10).await.unwrap();

        assert_eq!(report.total_requests, 10);
        assert_eq!(report.unique_operations, 1);
        assert_eq!(report.duplicates_detected, 9);
        assert_eq!(report.operations.len(), 1);
        assert_eq!(store.operation_count().await, 1);
        assert_eq!(
            report.message,
            "Idempotency working! 10 parallel requests resulted in 1 operation(s)"
        );
    }

    #[tokio::test]
    async fn test_retry_books_once() {
        let (store, simulator) = simulator();
        let report = simulator
            .retry(&args(KindArg::Deposit, None), 3, Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(report.total_requests, 4);
        assert_eq!(report.unique_operations, 1);
        assert_eq!(report.duplicates_detected, 3);
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_out_of_order_balance_is_sum_of_batch() {
        let (store, simulator) = simulator();
        let target = Account::open(AccountKind::User);
        store.insert_account(&target).await.unwrap();

        let report = simulator
            .out_of_order(&args(KindArg::Deposit, Some(target.id)), 4)
            .await
            .unwrap();
        assert_eq!(report.unique_operations, 4);
        assert_eq!(report.duplicates_detected, 0);
        assert_eq!(report.operations.len(), 4);

        let snapshot = BalanceService::new(store, Currency::Brl)
            .current_balance(target.id)
            .await
            .unwrap();
        // 100 * (1 + 2 + 3 + 4)
        assert_eq!(snapshot.balance.amount(), dec!(1000));
    }

    #[tokio::test]
    async fn test_delayed_transfer_opens_missing_accounts() {
        let (store, simulator) = simulator();
        let report = simulator
            .delayed(&args(KindArg::Transfer, None), Duration::from_millis(5))
            .await
            .unwrap();

        assert_eq!(report.total_requests, 1);
        assert_eq!(report.operations[0].kind(), OperationKind::Transfer);
        assert!(report.execution_time_ms >= 5);
        assert_eq!(store.entry_count().await, 2);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = SimulationReport {
            total_requests: 2,
            unique_operations: 1,
            duplicates_detected: 1,
            execution_time_ms: 7,
            message: "ok".to_string(),
            operations: Vec::new(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["totalRequests"], 2);
        assert_eq!(json["uniqueOperations"], 1);
        assert_eq!(json["duplicatesDetected"], 1);
        assert_eq!(json["executionTimeMs"], 7);
    }
}
