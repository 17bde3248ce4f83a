//! PostgreSQL implementation of the ledger persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ledger_core::ledger::{Account, Entry, LedgerStore, Operation, OperationWriter, StoreError};
use ledger_core::reconciliation::ReconciliationRecord;
use ledger_shared::types::{AccountId, ExternalReference, OperationId, ReconciliationId};
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};
use tracing::debug;

use crate::mapper;
use crate::repositories::{
    AccountRepository, EntryRepository, OperationRepository, ReconciliationRepository,
};

/// Name of the unique constraint guarding idempotency keys.
pub const IDEMPOTENCY_KEY_CONSTRAINT: &str = "uq_operations_idempotency_key";

/// Maps a database error into the port's error type.
pub fn map_db_err(err: &DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)
        | SqlErr::ForeignKeyConstraintViolation(message)) => StoreError::Constraint(message),
        _ => {
            let message = err.to_string();
            if message.contains("violates check constraint") {
                StoreError::Constraint(message)
            } else {
                StoreError::Backend(message)
            }
        }
    }
}

fn is_duplicate_key(err: &DbErr) -> bool {
    matches!(
        err.sql_err(),
        Some(SqlErr::UniqueConstraintViolation(message)) if message.contains(IDEMPOTENCY_KEY_CONSTRAINT)
    )
}

fn map_delete_err(err: &DbErr, entity: &'static str, id: String) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => StoreError::Referenced { entity, id },
        _ => map_db_err(err),
    }
}

fn map_rows<M, T>(
    rows: Vec<M>,
    convert: impl Fn(M) -> Result<T, StoreError>,
) -> Result<Vec<T>, StoreError> {
    rows.into_iter().map(convert).collect()
}

/// Ledger store backed by a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
    accounts: AccountRepository,
    operations: OperationRepository,
    entries: EntryRepository,
    reconciliations: ReconciliationRepository,
}

impl SeaOrmLedgerStore {
    /// Creates a store over an open pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            accounts: AccountRepository::new(db.clone()),
            operations: OperationRepository::new(db.clone()),
            entries: EntryRepository::new(db.clone()),
            reconciliations: ReconciliationRepository::new(db.clone()),
            db,
        }
    }

    /// Underlying pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for SeaOrmLedgerStore {
    async fn find_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let row = self
            .accounts
            .find_by_id(id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?;
        Ok(row.map(mapper::account_from_model))
    }

    async fn insert_account(&self, account: &Account) -> Result<(), StoreError> {
        AccountRepository::insert(&self.db, mapper::account_to_model(account))
            .await
            .map_err(|e| map_db_err(&e))
    }

    async fn count_accounts(&self) -> Result<u64, StoreError> {
        self.accounts.count().await.map_err(|e| map_db_err(&e))
    }

    async fn delete_account(&self, id: AccountId) -> Result<bool, StoreError> {
        AccountRepository::delete(&self.db, id.into_inner())
            .await
            .map_err(|e| map_delete_err(&e, "account", id.to_string()))
    }

    async fn find_operation_by_reference(
        &self,
        reference: &ExternalReference,
    ) -> Result<Option<Operation>, StoreError> {
        self.operations
            .find_by_idempotency_key(reference.as_str())
            .await
            .map_err(|e| map_db_err(&e))?
            .map(mapper::operation_from_model)
            .transpose()
    }

    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>, StoreError> {
        self.operations
            .find_by_id(id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?
            .map(mapper::operation_from_model)
            .transpose()
    }

    async fn delete_operation(&self, id: OperationId) -> Result<bool, StoreError> {
        OperationRepository::delete(&self.db, id.into_inner())
            .await
            .map_err(|e| map_delete_err(&e, "operation", id.to_string()))
    }

    async fn begin_operation(&self) -> Result<Box<dyn OperationWriter>, StoreError> {
        let txn = self.db.begin().await.map_err(|e| map_db_err(&e))?;
        Ok(Box::new(SeaOrmOperationWriter { txn: Some(txn) }))
    }

    async fn entries_for_account(&self, account_id: AccountId) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .entries
            .list_by_account(account_id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::entry_from_model)
    }

    async fn recent_entries_for_account(
        &self,
        account_id: AccountId,
        limit: u64,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .entries
            .list_recent_by_account(account_id.into_inner(), limit)
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::entry_from_model)
    }

    async fn entries_for_account_up_to(
        &self,
        account_id: AccountId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .entries
            .list_by_account_up_to(account_id.into_inner(), mapper::to_db_time(cutoff))
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::entry_from_model)
    }

    async fn entries_for_operation(
        &self,
        operation_id: OperationId,
    ) -> Result<Vec<Entry>, StoreError> {
        let rows = self
            .entries
            .list_by_operation(operation_id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::entry_from_model)
    }

    async fn insert_reconciliation(&self, record: &ReconciliationRecord) -> Result<(), StoreError> {
        ReconciliationRepository::insert(&self.db, mapper::reconciliation_to_model(record))
            .await
            .map_err(|e| map_db_err(&e))
    }

    async fn find_reconciliation(
        &self,
        id: ReconciliationId,
    ) -> Result<Option<ReconciliationRecord>, StoreError> {
        self.reconciliations
            .find_by_id(id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?
            .map(mapper::reconciliation_from_model)
            .transpose()
    }

    async fn reconciliations_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let rows = self
            .reconciliations
            .list_by_account(account_id.into_inner())
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::reconciliation_from_model)
    }

    async fn all_reconciliations(&self) -> Result<Vec<ReconciliationRecord>, StoreError> {
        let rows = self
            .reconciliations
            .list_all()
            .await
            .map_err(|e| map_db_err(&e))?;
        map_rows(rows, mapper::reconciliation_from_model)
    }
}

/// Unit of work over one database transaction.
///
/// Dropping the writer before [`OperationWriter::commit`] rolls the
/// transaction back.
pub struct SeaOrmOperationWriter {
    txn: Option<DatabaseTransaction>,
}

impl SeaOrmOperationWriter {
    fn txn(&self) -> Result<&DatabaseTransaction, StoreError> {
        self.txn
            .as_ref()
            .ok_or_else(|| StoreError::Backend("unit of work already committed".to_string()))
    }
}

#[async_trait]
impl OperationWriter for SeaOrmOperationWriter {
    async fn insert_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
        let txn = self.txn()?;
        OperationRepository::insert(txn, mapper::operation_to_model(operation))
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    debug!(reference = %operation.reference(), "Idempotency key already stored");
                    StoreError::DuplicateReference(operation.reference().to_string())
                } else {
                    map_db_err(&e)
                }
            })
    }

    async fn insert_entries(&mut self, entries: &[Entry]) -> Result<(), StoreError> {
        let txn = self.txn()?;
        let models = entries.iter().map(mapper::entry_to_model).collect();
        EntryRepository::insert_many(txn, models)
            .await
            .map_err(|e| map_db_err(&e))
    }

    async fn update_operation(&mut self, operation: &Operation) -> Result<(), StoreError> {
        let txn = self.txn()?;
        OperationRepository::update_status(txn, mapper::operation_to_model(operation))
            .await
            .map_err(|e| map_db_err(&e))
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let txn = self
            .txn
            .take()
            .ok_or_else(|| StoreError::Backend("unit of work already committed".to_string()))?;
        txn.commit().await.map_err(|e| map_db_err(&e))
    }
}
