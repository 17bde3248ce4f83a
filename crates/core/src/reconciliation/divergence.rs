//! Read-only diagnostics for reconciliation mismatches.

use std::sync::Arc;

use ledger_shared::types::ReconciliationId;
use serde::Serialize;

use super::record::ReconciliationRecord;
use crate::ledger::{Entry, LedgerError, LedgerStore};

/// Which way the derived balance deviates from the asserted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DivergenceDirection {
    /// Balances agree.
    None,
    /// Ledger holds more than expected (`difference < 0`).
    CalculatedHigher,
    /// Ledger holds less than expected (`difference > 0`).
    CalculatedLower,
}

impl DivergenceDirection {
    /// Direction implied by a record's `expected - calculated`.
    #[must_use]
    pub fn of(record: &ReconciliationRecord) -> Self {
        let difference = record.difference();
        if difference.is_zero() {
            Self::None
        } else if difference.is_positive() {
            Self::CalculatedLower
        } else {
            Self::CalculatedHigher
        }
    }
}

/// A reconciliation record with the entries most likely to explain it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DivergenceReport {
    /// The analyzed record.
    pub record: ReconciliationRecord,
    /// Most recent entries of the account, newest first.
    pub recent_entries: Vec<Entry>,
    /// Direction of the deviation.
    pub direction: DivergenceDirection,
    /// Human-readable summary.
    pub analysis: String,
}

/// Loads the context needed to investigate a mismatch. Never writes.
pub struct DivergenceAnalyzer<S: ?Sized> {
    store: Arc<S>,
}

impl<S: LedgerStore + ?Sized> DivergenceAnalyzer<S> {
    /// Creates an analyzer.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Analyzes a reconciliation record, showing up to `entry_limit` entries.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ReconciliationNotFound` for unknown records.
    pub async fn analyze(
        &self,
        reconciliation_id: ReconciliationId,
        entry_limit: u64,
    ) -> Result<DivergenceReport, LedgerError> {
        let record = self
            .store
            .find_reconciliation(reconciliation_id)
            .await?
            .ok_or(LedgerError::ReconciliationNotFound(reconciliation_id))?;

        let recent_entries = self
            .store
            .recent_entries_for_account(record.account_id(), entry_limit)
            .await?;
        let direction = DivergenceDirection::of(&record);
        let analysis = describe(&record, direction, recent_entries.len());

        Ok(DivergenceReport {
            record,
            recent_entries,
            direction,
            analysis,
        })
    }
}

fn describe(record: &ReconciliationRecord, direction: DivergenceDirection, shown: usize) -> String {
    let side = match direction {
        DivergenceDirection::None => return "Balances match. No divergence detected.".to_string(),
        DivergenceDirection::CalculatedHigher => "higher",
        DivergenceDirection::CalculatedLower => "lower",
    };

    format!(
        "Divergence detected! Calculated balance is {side} than expected by {}. \
         Showing the last {shown} entries for investigation. \
         Check for: missing operations, duplicate processing, or incorrect amount calculations.",
        record.difference().abs().amount()
    )
}
