//! Repository abstractions for data access.
//!
//! Reads go through a repository holding the pool. Writes are associated
//! functions generic over [`sea_orm::ConnectionTrait`] so the same code runs
//! on the pool or inside an open transaction.

pub mod account;
pub mod entry;
pub mod operation;
pub mod reconciliation;

pub use account::AccountRepository;
pub use entry::EntryRepository;
pub use operation::OperationRepository;
pub use reconciliation::ReconciliationRepository;
