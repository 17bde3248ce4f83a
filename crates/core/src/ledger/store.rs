//! Persistence port.
//!
//! The core never talks to a database directly. Adapters implement
//! [`LedgerStore`]; the in-memory store lives in [`super::memory`] and the
//! PostgreSQL adapter in the `ledger-db` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_shared::types::{AccountId, ExternalReference, OperationId, ReconciliationId};
use thiserror::Error;

use super::account::Account;
use super::entry::Entry;
use super::operation::Operation;
use crate::reconciliation::ReconciliationRecord;

/// Errors reported by storage adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Another operation already owns this idempotency key.
    ///
    /// The processor treats this as a lost race, never as a failure.
    #[error("Duplicate idempotency key: {0}")]
    DuplicateReference(String),

    /// The row owns ledger entries and cannot be deleted.
    #[error("{entity} {id} is referenced by ledger entries")]
    Referenced {
        /// Table or aggregate name.
        entity: &'static str,
        /// Row id.
        id: String,
    },

    /// Any other integrity constraint.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Stored data could not be mapped back into the domain.
    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    /// Connection, query, or transaction failure.
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Storage for accounts, operations, entries, and reconciliation records.
///
/// Entries and reconciliation records are append-only; the port exposes no
/// way to update or delete them.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // ========== Accounts ==========
    /// Looks up an account.
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// Registers an account.
    async fn insert_account(&self, account: &Account) -> Result<(), StoreError>;

    /// Number of registered accounts.
    async fn count_accounts(&self) -> Result<u64, StoreError>;

    /// Deletes an account that owns no entries. Returns false if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Referenced` when entries point at the account.
    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError>;

    // ========== Operations ==========
    /// Looks up the operation owning an idempotency key.
    async fn find_operation_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<Operation>, StoreError>;

    /// Looks up an operation by id.
    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>, StoreError>;

    /// Deletes an operation that owns no entries. Returns false if it did not exist.
    async fn delete_operation(&self, id: OperationId) -> Result<bool, StoreError>;

    /// Opens an atomic unit of work for booking one operation.
    async fn begin_operation(&self) -> Result<Box<dyn OperationWriter>, StoreError>;

    // ========== Entries ==========
    /// All entries of an account, oldest first.
    async fn entries_for_account(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError>;

    /// The most recent entries of an account, newest first.
    async fn recent_entries_for_account(
        &self,
        account_id: AccountId,
        limit: u64,
    ) -> Result<Vec<Entry>, StoreError>;

    /// Entries created at or before `cutoff`, oldest first.
    ///
    /// The default filters [`Self::entries_for_account`]; adapters may push
    /// the predicate down.
    async fn entries_for_account_up_to(
        &self,
        account_id: AccountId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Entry>, StoreError> {
        let mut entries = self.entries_for_account(account_id).await?;
        entries.retain(|entry| entry.created_at() <= cutoff);
        Ok(entries)
    }

    /// Entries produced by one operation.
    async fn entries_for_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Vec<Entry>, StoreError>;

    // ========== Reconciliation ==========
    /// Appends a reconciliation record.
    async fn insert_reconciliation(&self, record: &ReconciliationRecord) -> Result<(), StoreError>;

    /// Looks up a reconciliation record.
    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<ReconciliationRecord>, StoreError>;

    /// Reconciliation history of an account, newest first.
    async fn reconciliations_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ReconciliationRecord>, StoreError>;

    /// Every reconciliation record, newest first.
    async fn all_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError>;
}

/// Atomic unit of work for one operation.
///
/// Nothing written through the writer is visible until [`Self::commit`]
/// succeeds. Dropping the writer without committing discards every write.
#[async_trait]
pub trait OperationWriter: Send {
    /// Inserts a new operation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateReference` when the idempotency key is taken.
    async fn insert_operation(&mut self, operation: &Operation) -> Result<(), StoreError>;

    /// Inserts entries.
    async fn insert_entries(&mut self, entries: &[Entry]) -> Result<(), StoreError>;

    /// Persists a status transition.
    async fn update_operation(&mut self, operation: &Operation) -> Result<(), StoreError>;

    /// Makes every write durable at once.
    async fn commit(&mut self) -> Result<(), StoreError>;
}
