//! Reconciliation overview.

use std::collections::HashSet;

use ledger_shared::types::{Currency, Money};
use serde::Serialize;

use super::record::ReconciliationRecord;

/// Aggregate view over every reconciliation record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationDashboard {
    /// Registered accounts.
    pub total_accounts: u64,
    /// Distinct accounts with at least one mismatch.
    pub accounts_with_mismatch: usize,
    /// Largest absolute difference seen; zero when there are no records.
    pub largest_difference: Money,
    /// Most recent records, newest first.
    pub recent: Vec<ReconciliationRecord>,
}

impl ReconciliationDashboard {
    /// Summarizes `records`, which must be ordered newest first.
    #[must_use]
    pub fn summarize(
        total_accounts: u64,
        records: &[ReconciliationRecord],
        recent_limit: usize,
        currency: Currency,
    ) -> Self {
        let accounts_with_mismatch = records
            .iter()
            .filter(|record| !record.is_match())
            .map(ReconciliationRecord::account_id)
            .collect::<HashSet<_>>()
            .len();

        let largest_difference = records
            .iter()
            .map(|record| record.difference().abs())
            .max_by_key(Money::amount)
            .unwrap_or_else(|| Money::zero(currency));

        Self {
            total_accounts,
            accounts_with_mismatch,
            largest_difference,
            recent: records.iter().take(recent_limit).cloned().collect(),
        }
    }
}
