//! Double-entry ledger logic.
//!
//! This module implements the core ledger functionality:
//! - Accounts, operations, and immutable entries
//! - Entry generation with the debit-negative / credit-positive convention
//! - Balance derivation as a fold over entries
//! - Idempotent, race-safe operation processing
//! - The persistence port and an in-memory implementation

pub mod account;
pub mod balance;
pub mod balance_service;
pub mod command;
pub mod entry;
pub mod error;
pub mod factory;
pub mod memory;
pub mod operation;
pub mod processor;
pub mod store;

#[cfg(test)]
mod balance_props;
#[cfg(test)]
mod processor_props;

pub use account::{Account, AccountKind};
pub use balance::BalanceCalculator;
pub use balance_service::{BalanceService, BalanceSnapshot};
pub use command::{Movement, ProcessOperation, ValidatedOperation};
pub use entry::{Entry, EntryDirection, EntryType};
pub use error::LedgerError;
pub use factory::EntryFactory;
pub use memory::InMemoryLedgerStore;
pub use operation::{DUPLICATE_REASON, Operation, OperationKind, OperationStatus};
pub use processor::{OperationProcessor, ProcessorSettings};
pub use store::{LedgerStore, OperationWriter, StoreError};
