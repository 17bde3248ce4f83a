//! Conversions between `SeaORM` models and domain types.
//!
//! Reading a row back goes through the same validating constructors the
//! domain uses, so a row that violates an invariant surfaces as
//! `StoreError::Corrupt` instead of a silently wrong value.

use chrono::{DateTime, Utc};
use ledger_core::ledger::{
    Account, AccountKind, Entry, EntryDirection, EntryType, Operation, OperationKind,
    OperationStatus, StoreError,
};
use ledger_core::reconciliation::{ReconciliationRecord, ReconciliationStatus};
use ledger_shared::types::{
    AccountId, Currency, EntryId, ExternalReference, Money, OperationId, ReconciliationId,
};
use rust_decimal::Decimal;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{
    accounts, entries, operations, reconciliation_records, sea_orm_active_enums as db,
};

// ========== Timestamps ==========

pub(crate) fn to_db_time(value: DateTime<Utc>) -> DateTimeWithTimeZone {
    value.fixed_offset()
}

pub(crate) fn from_db_time(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

// ========== Enums ==========

pub(crate) const fn account_kind_to_db(kind: AccountKind) -> db::AccountKind {
    match kind {
        AccountKind::User => db::AccountKind::User,
        AccountKind::System => db::AccountKind::System,
        AccountKind::Transit => db::AccountKind::Transit,
    }
}

const fn account_kind_from_db(kind: db::AccountKind) -> AccountKind {
    match kind {
        db::AccountKind::User => AccountKind::User,
        db::AccountKind::System => AccountKind::System,
        db::AccountKind::Transit => AccountKind::Transit,
    }
}

pub(crate) const fn operation_kind_to_db(kind: OperationKind) -> db::OperationKind {
    match kind {
        OperationKind::Deposit => db::OperationKind::Deposit,
        OperationKind::Withdrawal => db::OperationKind::Withdrawal,
        OperationKind::Transfer => db::OperationKind::Transfer,
    }
}

const fn operation_kind_from_db(kind: db::OperationKind) -> OperationKind {
    match kind {
        db::OperationKind::Deposit => OperationKind::Deposit,
        db::OperationKind::Withdrawal => OperationKind::Withdrawal,
        db::OperationKind::Transfer => OperationKind::Transfer,
    }
}

pub(crate) const fn operation_status_to_db(status: OperationStatus) -> db::OperationStatus {
    match status {
        OperationStatus::Processing => db::OperationStatus::Processing,
        OperationStatus::Processed => db::OperationStatus::Processed,
        OperationStatus::Ignored => db::OperationStatus::Ignored,
        OperationStatus::Failed => db::OperationStatus::Failed,
    }
}

const fn operation_status_from_db(status: db::OperationStatus) -> OperationStatus {
    match status {
        db::OperationStatus::Processing => OperationStatus::Processing,
        db::OperationStatus::Processed => OperationStatus::Processed,
        db::OperationStatus::Ignored => OperationStatus::Ignored,
        db::OperationStatus::Failed => OperationStatus::Failed,
    }
}

const fn direction_to_db(direction: EntryDirection) -> db::EntryDirection {
    match direction {
        EntryDirection::Debit => db::EntryDirection::Debit,
        EntryDirection::Credit => db::EntryDirection::Credit,
    }
}

const fn direction_from_db(direction: db::EntryDirection) -> EntryDirection {
    match direction {
        db::EntryDirection::Debit => EntryDirection::Debit,
        db::EntryDirection::Credit => EntryDirection::Credit,
    }
}

const fn entry_type_to_db(entry_type: EntryType) -> db::EntryType {
    match entry_type {
        EntryType::Deposit => db::EntryType::Deposit,
        EntryType::Withdrawal => db::EntryType::Withdrawal,
        EntryType::TransferOut => db::EntryType::TransferOut,
        EntryType::TransferIn => db::EntryType::TransferIn,
        EntryType::DepositSettlement => db::EntryType::DepositSettlement,
        EntryType::WithdrawalSettlement => db::EntryType::WithdrawalSettlement,
    }
}

const fn entry_type_from_db(entry_type: db::EntryType) -> EntryType {
    match entry_type {
        db::EntryType::Deposit => EntryType::Deposit,
        db::EntryType::Withdrawal => EntryType::Withdrawal,
        db::EntryType::TransferOut => EntryType::TransferOut,
        db::EntryType::TransferIn => EntryType::TransferIn,
        db::EntryType::DepositSettlement => EntryType::DepositSettlement,
        db::EntryType::WithdrawalSettlement => EntryType::WithdrawalSettlement,
    }
}

const fn reconciliation_status_to_db(status: ReconciliationStatus) -> db::ReconciliationStatus {
    match status {
        ReconciliationStatus::Match => db::ReconciliationStatus::Match,
        ReconciliationStatus::Mismatch => db::ReconciliationStatus::Mismatch,
    }
}

const fn reconciliation_status_from_db(status: db::ReconciliationStatus) -> ReconciliationStatus {
    match status {
        db::ReconciliationStatus::Match => ReconciliationStatus::Match,
        db::ReconciliationStatus::Mismatch => ReconciliationStatus::Mismatch,
    }
}

// ========== Rows ==========

fn currency_from_db(code: &str) -> Result<Currency, StoreError> {
    code.trim().parse().map_err(StoreError::Corrupt)
}

fn money_from_db(amount: Decimal, currency: Currency) -> Money {
    Money::new(amount, currency)
}

/// Builds an account row.
pub fn account_to_model(account: &Account) -> accounts::Model {
    accounts::Model {
        id: account.id.into_inner(),
        kind: account_kind_to_db(account.kind),
        created_at: to_db_time(account.created_at),
    }
}

/// Restores an account from its row.
pub fn account_from_model(model: accounts::Model) -> Account {
    Account::restore(
        AccountId::from_uuid(model.id),
        account_kind_from_db(model.kind),
        from_db_time(model.created_at),
    )
}

/// Builds an operation row.
pub fn operation_to_model(operation: &Operation) -> operations::Model {
    operations::Model {
        id: operation.id().into_inner(),
        idempotency_key: operation.reference().as_str().to_string(),
        kind: operation_kind_to_db(operation.kind()),
        status: operation_status_to_db(operation.status()),
        created_at: to_db_time(operation.created_at()),
        processed_at: operation.processed_at().map(to_db_time),
        failure_reason: operation.failure_reason().map(str::to_string),
    }
}

/// Restores an operation from its row.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` when the stored key is not a valid reference.
pub fn operation_from_model(model: operations::Model) -> Result<Operation, StoreError> {
    let reference = ExternalReference::parse(&model.idempotency_key)
        .map_err(|e| StoreError::Corrupt(format!("operation {}: {e}", model.id)))?;

    Ok(Operation::restore(
        OperationId::from_uuid(model.id),
        reference,
        operation_kind_from_db(model.kind),
        operation_status_from_db(model.status),
        from_db_time(model.created_at),
        model.processed_at.map(from_db_time),
        model.failure_reason,
    ))
}

/// Builds an entry row.
pub fn entry_to_model(entry: &Entry) -> entries::Model {
    entries::Model {
        id: entry.id().into_inner(),
        operation_id: entry.operation_id().into_inner(),
        account_id: entry.account_id().into_inner(),
        amount: entry.amount().amount(),
        currency: entry.amount().currency().code().to_string(),
        direction: direction_to_db(entry.direction()),
        entry_type: entry_type_to_db(entry.entry_type()),
        source: entry.source().to_string(),
        created_at: to_db_time(entry.created_at()),
    }
}

/// Restores an entry from its row.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` for unknown currencies or a sign that
/// disagrees with the direction.
pub fn entry_from_model(model: entries::Model) -> Result<Entry, StoreError> {
    let currency = currency_from_db(&model.currency)?;
    let id = model.id;

    Entry::restore(
        EntryId::from_uuid(model.id),
        OperationId::from_uuid(model.operation_id),
        AccountId::from_uuid(model.account_id),
        money_from_db(model.amount, currency),
        direction_from_db(model.direction),
        entry_type_from_db(model.entry_type),
        model.source,
        from_db_time(model.created_at),
    )
    .map_err(|e| StoreError::Corrupt(format!("entry {id}: {e}")))
}

/// Builds a reconciliation row.
pub fn reconciliation_to_model(record: &ReconciliationRecord) -> reconciliation_records::Model {
    reconciliation_records::Model {
        id: record.id().into_inner(),
        account_id: record.account_id().into_inner(),
        reconciliation_date: to_db_time(record.reconciliation_date()),
        expected_balance: record.expected().amount(),
        calculated_balance: record.calculated().amount(),
        difference: record.difference().amount(),
        currency: record.expected().currency().code().to_string(),
        status: reconciliation_status_to_db(record.status()),
        created_at: to_db_time(record.created_at()),
    }
}

/// Restores a reconciliation record from its row.
///
/// # Errors
///
/// Returns `StoreError::Corrupt` when the stored figures are inconsistent.
pub fn reconciliation_from_model(
    model: reconciliation_records::Model,
) -> Result<ReconciliationRecord, StoreError> {
    let currency = currency_from_db(&model.currency)?;
    let id = model.id;

    ReconciliationRecord::restore(
        ReconciliationId::from_uuid(model.id),
        AccountId::from_uuid(model.account_id),
        from_db_time(model.reconciliation_date),
        money_from_db(model.expected_balance, currency),
        money_from_db(model.calculated_balance, currency),
        money_from_db(model.difference, currency),
        reconciliation_status_from_db(model.status),
        from_db_time(model.created_at),
    )
    .map_err(|e| StoreError::Corrupt(format!("reconciliation record {id}: {e}")))
}
