//! Entity re-exports.

pub use super::accounts::Entity as Accounts;
pub use super::entries::Entity as Entries;
pub use super::operations::Entity as Operations;
pub use super::reconciliation_records::Entity as ReconciliationRecords;
