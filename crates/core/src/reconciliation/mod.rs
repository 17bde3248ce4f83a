//! Balance reconciliation.
//!
//! Compares externally asserted balances with balances derived from the
//! ledger, records every comparison, and surfaces recent entries when they
//! disagree. Mismatches are outcomes, not errors, and are never corrected
//! automatically.

pub mod dashboard;
pub mod divergence;
pub mod reconciler;
pub mod record;

pub use dashboard::ReconciliationDashboard;
pub use divergence::{DivergenceAnalyzer, DivergenceDirection, DivergenceReport};
pub use reconciler::Reconciler;
pub use record::{ReconciliationRecord, ReconciliationStatus};
