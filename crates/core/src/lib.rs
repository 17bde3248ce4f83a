//! Core business logic for the ledger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, invariants, and balance derivation live here; storage is
//! reached through the [`ledger::LedgerStore`] port.
//!
//! # Modules
//!
//! - `ledger` - Operations, double-entry generation, and balance derivation
//! - `reconciliation` - Balance reconciliation and divergence analysis

pub mod ledger;
pub mod reconciliation;
