//! In-memory [`LedgerStore`] for tests, simulations, and local runs.
//!
//! Enforces the same rules as the PostgreSQL schema: unique idempotency
//! keys, entries referencing existing rows, restricted deletion, and
//! all-or-nothing commits.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ledger_shared::types::{AccountId, ExternalReference, OperationId, ReconciliationId};
use tokio::sync::RwLock;

use super::account::Account;
use super::entry::Entry;
use super::operation::Operation;
use super::store::{LedgerStore, OperationWriter, StoreError};
use crate::reconciliation::ReconciliationRecord;

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<AccountId, Account>,
    operations: HashMap<OperationId, Operation>,
    references: HashMap<ExternalReference, OperationId>,
    entries: Vec<Entry>,
    reconciliations: Vec<ReconciliationRecord>,
}

impl State {
    fn check_reference(&self, operation: &Operation) -> Result<(), StoreError> {
        match self.references.get(operation.reference()) {
            Some(owner) if *owner != operation.id() => Err(StoreError::DuplicateReference(
                operation.reference().to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Thread-safe in-memory ledger storage.
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored operations.
    pub async fn operation_count(&self) -> usize {
        self.state.read().await.operations.len()
    }

    /// Number of stored entries across all accounts.
    pub async fn entry_count(&self) -> usize {
        self.state.read().await.entries.len()
    }
}

fn newest_first(mut records: Vec<ReconciliationRecord>) -> Vec<ReconciliationRecord> {
    records.sort_by_key(|record| std::cmp::Reverse(record.created_at()));
    records
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.state.read().await.accounts.get(&id).cloned())
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if state.accounts.contains_key(&account.id) {
            return Err(StoreError::Constraint(format!(
                "account {} already exists",
                account.id
            )));
        }
        state.accounts.insert(account.id, account.clone());
        Ok(())
    }

    async fn count_accounts(&self) -> Result<u64, StoreError> {
        Ok(self.state.read().await.accounts.len() as u64)
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        let referenced = state.entries.iter().any(|e| e.account_id() == id)
            || state.reconciliations.iter().any(|r| r.account_id() == id);
        if referenced {
            return Err(StoreError::Referenced {
                entity: "account",
                id: id.to_string(),
            });
        }
        Ok(state.accounts.remove(&id).is_some())
    }

    async fn find_operation_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<Operation>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .references
            .get(reference)
            .and_then(|id| state.operations.get(id))
            .cloned())
    }

    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>, StoreError> {
        Ok(self.state.read().await.operations.get(&id).cloned())
    }

    async fn delete_operation(&self, id: OperationId) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        if state.entries.iter().any(|e| e.operation_id() == id) {
            return Err(StoreError::Referenced {
                entity: "operation",
                id: id.to_string(),
            });
        }
        match state.operations.remove(&id) {
            Some(operation) => {
                state.references.remove(operation.reference());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn begin_operation(&self) -> Result<Box<dyn OperationWriter>, StoreError> {
        Ok(Box::new(InMemoryOperationWriter {
            state: Arc::clone(&self.state),
            operations: Vec::new(),
            entries: Vec::new(),
            committed: false,
        }))
    }

    async fn entries_for_account(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError> {
        let state = self.state.read().await;
        let mut entries: Vec<Entry> = state
            .entries
            .iter()
            .filter(|e| e.account_id() == account_id)
            .cloned()
            .collect();
        entries.sort_by_key(Entry::created_at);
        Ok(entries)
    }

    async fn recent_entries_for_account(
        &self,
        account_id: AccountId,
        limit: u64,
    ) -> Result<Vec<Entry>, StoreError> {
        let mut entries = self.entries_for_account(account_id).await?;
        entries.reverse();
        entries.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(entries)
    }

    async fn entries_for_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Vec<Entry>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.operation_id() == operation_id)
            .cloned()
            .collect())
    }

    async fn insert_reconciliation(&self, record: &ReconciliationRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.accounts.contains_key(&record.account_id()) {
            return Err(StoreError::Constraint(format!(
                "reconciliation references unknown account {}",
                record.account_id()
            )));
        }
        if state.reconciliations.iter().any(|r| r.id() == record.id()) {
            return Err(StoreError::Constraint(format!(
                "reconciliation {} already exists",
                record.id()
            )));
        }
        state.reconciliations.push(record.clone());
        Ok(())
    }

    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<ReconciliationRecord>, StoreError> {
        let state = self.state.read().await;
        Ok(state.reconciliations.iter().find(|r| r.id() == id).cloned())
    }

    async fn reconciliations_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let state = self.state.read().await;
        let records = state
            .reconciliations
            .iter()
            .filter(|r| r.account_id() == account_id)
            .cloned()
            .collect();
        Ok(newest_first(records))
    }

    async fn all_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let records = self.state.read().await.reconciliations.clone();
        Ok(newest_first(records))
    }
}

/// Buffers writes and applies them under one write lock on commit.
struct InMemoryOperationWriter {
    state: Arc<RwLock<State>>,
    operations: Vec<Operation>,
    entries: Vec<Entry>,
    committed: bool,
}

#[async_trait]
impl OperationWriter for InMemoryOperationWriter {
    async fn insert_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
        self.state.read().await.check_reference(operation)?;
        if self
            .operations
            .iter()
            .any(|pending| pending.reference() == operation.reference())
        {
            return Err(StoreError::DuplicateReference(
                operation.reference().to_string(),
            ));
        }
        self.operations.push(operation.clone());
        Ok(())
    }

    async fn insert_entries(&mut self, entries: &[Entry]) -> Result<(), StoreError> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn update_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
        if let Some(pending) = self
            .operations
            .iter_mut()
            .find(|pending| pending.id() == operation.id())
        {
            *pending = operation.clone();
            return Ok(());
        }

        let state = self.state.read().await;
        match state.operations.get(&operation.id()) {
            Some(stored) if stored.reference() == operation.reference() => {
                drop(state);
                self.operations.push(operation.clone());
                Ok(())
            }
            Some(_) => Err(StoreError::Constraint(format!(
                "operation {} cannot change its idempotency key",
                operation.id()
            ))),
            None => Err(StoreError::Constraint(format!(
                "operation {} does not exist",
                operation.id()
            ))),
        }
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        if self.committed {
            return Err(StoreError::Backend(
                "unit of work already committed".to_string(),
            ));
        }

        let mut state = self.state.write().await;

        // Validate everything before touching state so a failure leaves no trace.
        for operation in &self.operations {
            state.check_reference(operation)?;
        }
        for entry in &self.entries {
            let operation_known = state.operations.contains_key(&entry.operation_id())
                || self.operations.iter().any(|op| op.id() == entry.operation_id());
            if !operation_known {
                return Err(StoreError::Constraint(format!(
                    "entry {} references unknown operation {}",
                    entry.id(),
                    entry.operation_id()
                )));
            }
            if !state.accounts.contains_key(&entry.account_id()) {
                return Err(StoreError::Constraint(format!(
                    "entry {} references unknown account {}",
                    entry.id(),
                    entry.account_id()
                )));
            }
        }

        for operation in self.operations.drain(..) {
            state
                .references
                .insert(operation.reference().clone(), operation.id());
            state.operations.insert(operation.id(), operation);
        }
        state.entries.append(&mut self.entries);
        self.committed = true;
        Ok(())
    }
}
