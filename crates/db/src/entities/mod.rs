//! `SeaORM` entity definitions for the ledger schema.

pub mod prelude;

pub mod accounts;
pub mod entries;
pub mod operations;
pub mod reconciliation_records;
pub mod sea_orm_active_enums;
