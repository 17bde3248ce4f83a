//! Idempotent operation processing.
//!
//! `process` validates a command, returns the existing operation when the
//! idempotency key is already booked, and otherwise writes the operation and
//! its entries in one unit of work. Two submissions racing on the same key
//! are resolved by the store's uniqueness constraint: the loser re-reads
//! and returns the winner's operation.

use std::sync::Arc;

use ledger_shared::config::LedgerConfig;
use ledger_shared::types::{AccountId, Currency, ExternalReference};
use tracing::{debug, error, info, warn};

use super::command::{Movement, ProcessOperation, ValidatedOperation};
use super::entry::{Entry, EntryType};
use super::error::LedgerError;
use super::factory::EntryFactory;
use super::operation::Operation;
use super::store::{LedgerStore, StoreError};

/// Processor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSettings {
    /// Currency of every booked amount.
    pub currency: Currency,
    /// Source tag used when a command carries none.
    pub default_source: String,
    /// Account offsetting deposits and withdrawals, if any.
    pub settlement_account: Option<AccountId>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            currency: Currency::Brl,
            default_source: "api".to_string(),
            settlement_account: None,
        }
    }
}

impl From<&LedgerConfig> for ProcessorSettings {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            currency: config.currency,
            default_source: config.default_source.clone(),
            settlement_account: config.settlement_account,
        }
    }
}

/// Books operations against a [`LedgerStore`].
///
/// Holds no per-key state: any number of `process` calls may run at once.
pub struct OperationProcessor<S: ?Sized> {
    store: Arc<S>,
    settings: ProcessorSettings,
}

impl<S: LedgerStore + ?Sized> OperationProcessor<S> {
    /// Creates a processor.
    #[must_use]
    pub fn new(store: Arc<S>, settings: ProcessorSettings) -> Self {
        Self { store, settings }
    }

    /// Active settings.
    #[must_use]
    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Processes a command idempotently.
    ///
    /// Submitting the same reference again returns the stored operation
    /// unchanged; a duplicate is never reported as an error.
    ///
    /// # Errors
    ///
    /// - Validation errors for malformed commands, before any write
    /// - `LedgerError::AccountNotFound` for unknown accounts
    /// - `LedgerError::Store` for persistence failures; nothing is left written
    pub async fn process(&self, command: &ProcessOperation) -> Result<Operation, LedgerError> {
        let command = command.validate(self.settings.currency, &self.settings.default_source)?;
        info!(
            reference = %command.reference,
            kind = %command.movement.kind(),
            amount = %command.amount,
            source = %command.source,
            "Operation received"
        );

        if let Some(existing) = self
            .store
            .find_operation_by_reference(&command.reference)
            .await?
        {
            info!(
                operation_id = %existing.id(),
                reference = %command.reference,
                status = %existing.status(),
                "Duplicate operation detected, returning existing"
            );
            return Ok(existing);
        }

        for account_id in command.movement.accounts() {
            if self.store.find_account(account_id).await?.is_none() {
                warn!(reference = %command.reference, account_id = %account_id, "Unknown account");
                return Err(LedgerError::AccountNotFound(account_id));
            }
        }
        let settlement = self.settlement_account(command.movement).await?;

        let mut operation = Operation::start(command.reference.clone(), command.movement.kind());
        let entries = build_entries(&operation, &command, settlement)?;

        match self.persist(&mut operation, &entries).await {
            Ok(()) => {
                info!(
                    operation_id = %operation.id(),
                    reference = %command.reference,
                    entries = entries.len(),
                    "Operation processed"
                );
                Ok(operation)
            }
            Err(LedgerError::Store(StoreError::DuplicateReference(_))) => {
                self.recover_lost_race(&command.reference).await
            }
            Err(e) => {
                error!(
                    operation_id = %operation.id(),
                    reference = %command.reference,
                    error = %e,
                    "Operation failed"
                );
                Err(e)
            }
        }
    }

    async fn settlement_account(
        &self,
        movement: Movement,
    ) -> Result<Option<AccountId>, LedgerError> {
        let Some(id) = self.settings.settlement_account else {
            return Ok(None);
        };
        if matches!(movement, Movement::Transfer { .. }) {
            return Ok(None);
        }

        match self.store.find_account(id).await? {
            Some(account) if account.kind.can_settle() => Ok(Some(id)),
            _ => Err(LedgerError::InvalidSettlementAccount(id)),
        }
    }

    /// Writes the operation, its entries, and the `processed` transition atomically.
    async fn persist(
        &self,
        operation: &mut Operation,
        entries: &[Entry],
    ) -> Result<(), LedgerError> {
        let mut writer = self.store.begin_operation().await?;
        writer.insert_operation(operation).await?;
        writer.insert_entries(entries).await?;
        operation.mark_processed()?;
        writer.update_operation(operation).await?;
        writer.commit().await?;
        Ok(())
    }

    async fn recover_lost_race(
        &self,
        reference: &ExternalReference,
    ) -> Result<Operation, LedgerError> {
        match self.store.find_operation_by_reference(reference).await? {
            Some(winner) => {
                info!(
                    operation_id = %winner.id(),
                    reference = %reference,
                    "Concurrent duplicate detected, returning winning operation"
                );
                Ok(winner)
            }
            None => {
                error!(reference = %reference, "Idempotency key conflict but no stored operation");
                Err(StoreError::DuplicateReference(reference.to_string()).into())
            }
        }
    }
}

fn build_entries(
    operation: &Operation,
    command: &ValidatedOperation,
    settlement: Option<AccountId>,
) -> Result<Vec<Entry>, LedgerError> {
    let id = operation.id();
    let amount = command.amount;
    let tag = command.source.as_str();

    let mut entries = match command.movement {
        Movement::Deposit { target } => vec![EntryFactory::create_credit_entry(
            id,
            target,
            amount,
            EntryType::Deposit,
            tag,
        )?],
        Movement::Withdrawal { source } => vec![EntryFactory::create_debit_entry(
            id,
            source,
            amount,
            EntryType::Withdrawal,
            tag,
        )?],
        Movement::Transfer { from, to } => vec![
            EntryFactory::create_debit_entry(id, from, amount, EntryType::TransferOut, tag)?,
            EntryFactory::create_credit_entry(id, to, amount, EntryType::TransferIn, tag)?,
        ],
    };

    if let Some(settlement) = settlement {
        match command.movement {
            Movement::Deposit { .. } => entries.push(EntryFactory::create_debit_entry(
                id,
                settlement,
                amount,
                EntryType::DepositSettlement,
                tag,
            )?),
            Movement::Withdrawal { .. } => entries.push(EntryFactory::create_credit_entry(
                id,
                settlement,
                amount,
                EntryType::WithdrawalSettlement,
                tag,
            )?),
            Movement::Transfer { .. } => {}
        }
    }

    let must_balance = settlement.is_some() || matches!(command.movement, Movement::Transfer { .. });
    if must_balance && !EntryFactory::validate_double_entry(&entries) {
        return Err(LedgerError::UnbalancedEntries(id));
    }

    debug!(operation_id = %id, entries = entries.len(), "Entries built");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use ledger_shared::types::{Money, OperationId, ReconciliationId};
    use rust_decimal_macros::dec;

    use crate::ledger::account::{Account, AccountKind};
    use crate::ledger::entry::EntryDirection;
    use crate::ledger::memory::InMemoryLedgerStore;
    use crate::ledger::operation::{OperationKind, OperationStatus};
    use crate::ledger::store::OperationWriter;
    use crate::reconciliation::ReconciliationRecord;

    fn brl(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::Brl)
    }

    async fn open(store: &InMemoryLedgerStore, kind: AccountKind) -> AccountId {
        let account = Account::open(kind);
        store.insert_account(&account).await.unwrap();
        account.id
    }

    fn processor(store: &InMemoryLedgerStore) -> OperationProcessor<InMemoryLedgerStore> {
        OperationProcessor::new(Arc::new(store.clone()), ProcessorSettings::default())
    }

    #[tokio::test]
    async fn test_deposit_books_one_credit() {
        let store = InMemoryLedgerStore::new();
        let account = open(&store, AccountKind::User).await;

        let op = processor(&store)
            .process(&ProcessOperation::deposit("DEP-1", account, dec!(10)))
            .await
            .unwrap();

        assert_eq!(op.status(), OperationStatus::Processed);
        assert_eq!(op.kind(), OperationKind::Deposit);
        assert!(op.processed_at().is_some());

        let entries = store.entries_for_operation(op.id()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].direction(), EntryDirection::Credit);
        assert_eq!(entries[0].amount(), brl(dec!(10)));
        assert_eq!(entries[0].entry_type(), EntryType::Deposit);
        assert_eq!(entries[0].source(), "api");
    }

    #[tokio::test]
    async fn test_withdrawal_books_one_debit() {
        let store = InMemoryLedgerStore::new();
        let account = open(&store, AccountKind::User).await;

        let op = processor(&store)
            .process(&ProcessOperation::withdrawal("WD-1", account, dec!(4.5)))
            .await
            .unwrap();

        let entries = store.entries_for_operation(op.id()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].amount(), brl(dec!(-4.5)));
        assert_eq!(entries[0].entry_type(), EntryType::Withdrawal);
    }

    #[tokio::test]
    async fn test_transfer_books_balanced_pair() {
        let store = InMemoryLedgerStore::new();
        let from = open(&store, AccountKind::User).await;
        let to = open(&store, AccountKind::User).await;

        let op = processor(&store)
            .process(&ProcessOperation::transfer("TR-1", from, to, dec!(100)))
            .await
            .unwrap();

        let entries = store.entries_for_operation(op.id()).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(EntryFactory::validate_double_entry(&entries));

        let out = entries.iter().find(|e| e.account_id() == from).unwrap();
        let inn = entries.iter().find(|e| e.account_id() == to).unwrap();
        assert_eq!(out.entry_type(), EntryType::TransferOut);
        assert_eq!(out.amount(), brl(dec!(-100)));
        assert_eq!(inn.entry_type(), EntryType::TransferIn);
        assert_eq!(inn.amount(), brl(dec!(100)));
    }

    #[tokio::test]
    async fn test_resubmission_returns_existing_operation() {
        let store = InMemoryLedgerStore::new();
        let account = open(&store, AccountKind::User).await;
        let processor = processor(&store);
        let command = ProcessOperation::deposit("DUP-1", account, dec!(10));

        let first = processor.process(&command).await.unwrap();
        let second = processor.process(&command).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.operation_count().await, 1);
        assert_eq!(store.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let account = open(&store, AccountKind::User).await;

        let result = processor(&store)
            .process(&ProcessOperation::transfer("SELF-1", account, account, dec!(1)))
            .await;

        assert!(matches!(result, Err(LedgerError::SameAccountTransfer(_))));
        assert_eq!(store.operation_count().await, 0);
    }

    #[tokio::test]
    async fn test_oversized_deposit_is_rejected_before_writing() {
        let store = InMemoryLedgerStore::new();
        let account = open(&store, AccountKind::User).await;

        let result = processor(&store)
            .process(&ProcessOperation::deposit(
                "BIG-1",
                account,
                rust_decimal::Decimal::MAX,
            ))
            .await;

        assert!(matches!(result, Err(LedgerError::AmountOutOfRange(_))));
        assert!(result.is_err_and(|err| err.is_client_error()));
        assert_eq!(store.operation_count().await, 0);
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_unknown_account_writes_nothing() {
        let store = InMemoryLedgerStore::new();
        let known = open(&store, AccountKind::User).await;
        let unknown = AccountId::new();

        let result = processor(&store)
            .process(&ProcessOperation::transfer("TR-404", known, unknown, dec!(1)))
            .await;

        assert!(matches!(result, Err(LedgerError::AccountNotFound(id)) if id == unknown));
        assert_eq!(store.operation_count().await, 0);
        assert_eq!(store.entry_count().await, 0);
    }

    #[tokio::test]
    async fn test_settlement_account_offsets_deposits_and_withdrawals() {
        let store = InMemoryLedgerStore::new();
        let user = open(&store, AccountKind::User).await;
        let settlement = open(&store, AccountKind::System).await;
        let processor = OperationProcessor::new(
            Arc::new(store.clone()),
            ProcessorSettings {
                settlement_account: Some(settlement),
                ..ProcessorSettings::default()
            },
        );

        let deposit = processor
            .process(&ProcessOperation::deposit("S-DEP", user, dec!(50)))
            .await
            .unwrap();
        let withdrawal = processor
            .process(&ProcessOperation::withdrawal("S-WD", user, dec!(20)))
            .await
            .unwrap();

        let deposit_entries = store.entries_for_operation(deposit.id()).await.unwrap();
        assert_eq!(deposit_entries.len(), 2);
        assert!(EntryFactory::validate_double_entry(&deposit_entries));
        assert!(
            deposit_entries
                .iter()
                .any(|e| e.entry_type() == EntryType::DepositSettlement
                    && e.account_id() == settlement)
        );

        let withdrawal_entries = store.entries_for_operation(withdrawal.id()).await.unwrap();
        assert!(EntryFactory::validate_double_entry(&withdrawal_entries));

        let mut all = store.entries_for_account(user).await.unwrap();
        all.extend(store.entries_for_account(settlement).await.unwrap());
        assert!(EntryFactory::validate_double_entry(&all));
    }

    #[tokio::test]
    async fn test_user_account_cannot_settle() {
        let store = InMemoryLedgerStore::new();
        let user = open(&store, AccountKind::User).await;
        let other_user = open(&store, AccountKind::User).await;
        let processor = OperationProcessor::new(
            Arc::new(store.clone()),
            ProcessorSettings {
                settlement_account: Some(other_user),
                ..ProcessorSettings::default()
            },
        );

        let result = processor
            .process(&ProcessOperation::deposit("S-BAD", user, dec!(1)))
            .await;
        assert!(matches!(
            result,
            Err(LedgerError::InvalidSettlementAccount(id)) if id == other_user
        ));
        assert_eq!(store.operation_count().await, 0);
    }

    /// Store wrapper that can hide committed operations from the first
    /// lookup and fail commits, to drive the processor's failure paths.
    struct ScriptedStore {
        inner: InMemoryLedgerStore,
        hide_next_lookup: AtomicBool,
        fail_commit: AtomicBool,
    }

    impl ScriptedStore {
        fn new(inner: InMemoryLedgerStore) -> Self {
            Self {
                inner,
                hide_next_lookup: AtomicBool::new(false),
                fail_commit: AtomicBool::new(false),
            }
        }
    }

    struct FailingWriter(Box<dyn OperationWriter>);

    #[async_trait]
    impl OperationWriter for FailingWriter {
        async fn insert_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
            self.0.insert_operation(operation).await
        }

        async fn insert_entries(&mut self, entries: &[Entry]) -> Result<(), StoreError> {
            self.0.insert_entries(entries).await
        }

        async fn update_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
            self.0.update_operation(operation).await
        }

        async fn commit(&mut self) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection reset".to_string()))
        }
    }

    #[async_trait]
    impl LedgerStore for ScriptedStore {
        async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
            self.inner.find_account(id).await
        }

        async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
            self.inner.insert_account(account).await
        }

        async fn count_accounts(&self) -> Result<u64, StoreError> {
            self.inner.count_accounts().await
        }

        async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
            self.inner.delete_account(id).await
        }

        async fn find_operation_by_reference(
            &self,
            reference: &ExternalReference,
        ) -> Result<Option<Operation>, StoreError> {
            if self.hide_next_lookup.swap(false, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_operation_by_reference(reference).await
        }

        async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>, StoreError> {
            self.inner.find_operation(id).await
        }

        async fn delete_operation(&self, id: OperationId) -> Result<bool, StoreError> {
            self.inner.delete_operation(id).await
        }

        async fn begin_operation(&self) -> Result<Box<dyn OperationWriter>, StoreError> {
            let writer = self.inner.begin_operation().await?;
            if self.fail_commit.load(Ordering::SeqCst) {
                Ok(Box::new(FailingWriter(writer)))
            } else {
                Ok(writer)
            }
        }

        async fn entries_for_account(
            &self,
            account_id: AccountId,
        ) -> Result<Vec<Entry>, StoreError> {
            self.inner.entries_for_account(account_id).await
        }

        async fn recent_entries_for_account(
            &self,
            account_id: AccountId,
            limit: u64,
        ) -> Result<Vec<Entry>, StoreError> {
            self.inner.recent_entries_for_account(account_id, limit).await
        }

        async fn entries_for_account_up_to(
            &self,
            account_id: AccountId,
            cutoff: DateTime<Utc>,
        ) -> Result<Vec<Entry>, StoreError> {
            self.inner.entries_for_account_up_to(account_id, cutoff).await
        }

        async fn entries_for_operation(
            &self,
            operation_id: OperationId,
        ) -> Result<Vec<Entry>, StoreError> {
            self.inner.entries_for_operation(operation_id).await
        }

        async fn insert_reconciliation(
            &self,
            record: &ReconciliationRecord,
        ) -> Result<(), StoreError> {
            self.inner.insert_reconciliation(record).await
        }

        async fn find_reconciliation(
            &self,
            id: ReconciliationId,
        ) -> Result<Option<ReconciliationRecord>, StoreError> {
            self.inner.find_reconciliation(id).await
        }

        async fn reconciliations_for_account(
            &self,
            account_id: AccountId,
        ) -> Result<Vec<ReconciliationRecord>, StoreError> {
            self.inner.reconciliations_for_account(account_id).await
        }

        async fn all_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError> {
            self.inner.all_reconciliations().await
        }
    }

    #[tokio::test]
    async fn test_lost_race_returns_winner() {
        let inner = InMemoryLedgerStore::new();
        let account = open(&inner, AccountKind::User).await;
        let store = Arc::new(ScriptedStore::new(inner.clone()));
        let processor = OperationProcessor::new(Arc::clone(&store), ProcessorSettings::default());
        let command = ProcessOperation::deposit("RACE-1", account, dec!(10));

        let winner = processor.process(&command).await.unwrap();

        // The next submission misses the fast path, as if it raced the winner.
        store.hide_next_lookup.store(true, Ordering::SeqCst);
        let loser = processor.process(&command).await.unwrap();

        assert_eq!(loser.id(), winner.id());
        assert_eq!(inner.operation_count().await, 1);
        assert_eq!(inner.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_leaves_nothing() {
        let inner = InMemoryLedgerStore::new();
        let account = open(&inner, AccountKind::User).await;
        let store = Arc::new(ScriptedStore::new(inner.clone()));
        store.fail_commit.store(true, Ordering::SeqCst);
        let processor = OperationProcessor::new(Arc::clone(&store), ProcessorSettings::default());

        let result = processor
            .process(&ProcessOperation::transfer(
                "FAIL-1",
                account,
                open(&inner, AccountKind::User).await,
                dec!(5),
            ))
            .await;

        assert!(matches!(
            result,
            Err(LedgerError::Store(StoreError::Backend(_)))
        ));
        assert_eq!(inner.operation_count().await, 0);
        assert_eq!(inner.entry_count().await, 0);

        // A retry after the outage books normally.
        store.fail_commit.store(false, Ordering::SeqCst);
        let retry = processor
            .process(&ProcessOperation::deposit("FAIL-1", account, dec!(5)))
            .await
            .unwrap();
        assert_eq!(retry.status(), OperationStatus::Processed);
    }
}
