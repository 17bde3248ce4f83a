//! Reconciliation records.

use chrono::{DateTime, Utc};
use ledger_shared::clock;
use ledger_shared::types::{AccountId, Money, ReconciliationId};
use serde::Serialize;

use crate::ledger::LedgerError;

/// Outcome of comparing an asserted balance with the derived one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconciliationStatus {
    /// Difference is zero.
    Match,
    /// Difference is non-zero.
    Mismatch,
}

impl ReconciliationStatus {
    /// Status implied by a difference.
    #[must_use]
    pub fn for_difference(difference: &Money) -> Self {
        if difference.is_zero() {
            Self::Match
        } else {
            Self::Mismatch
        }
    }

    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::Mismatch => "mismatch",
        }
    }
}

impl std::fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(Self::Match),
            "mismatch" => Ok(Self::Mismatch),
            other => Err(format!("Unknown reconciliation status: {other}")),
        }
    }
}

/// An append-only comparison of expected and calculated balances.
///
/// `difference = expected - calculated` and the status is derived from it,
/// so a record can never disagree with itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationRecord {
    id: ReconciliationId,
    account_id: AccountId,
    reconciliation_date: DateTime<Utc>,
    expected: Money,
    calculated: Money,
    difference: Money,
    status: ReconciliationStatus,
    created_at: DateTime<Utc>,
}

impl ReconciliationRecord {
    /// Compares `expected` with `calculated` and classifies the result.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Money` if the currencies differ or the
    /// difference overflows.
    pub fn create(
        account_id: AccountId,
        expected: Money,
        calculated: Money,
    ) -> Result<Self, LedgerError> {
        let difference = expected.try_subtract(&calculated)?;
        let now = clock::now();
        Ok(Self {
            id: ReconciliationId::new(),
            account_id,
            reconciliation_date: now,
            expected,
            calculated,
            difference,
            status: ReconciliationStatus::for_difference(&difference),
            created_at: now,
        })
    }

    /// Rebuilds a record loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InconsistentReconciliation` if the stored
    /// difference or status does not follow from the balances.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: ReconciliationId,
        account_id: AccountId,
        reconciliation_date: DateTime<Utc>,
        expected: Money,
        calculated: Money,
        difference: Money,
        status: ReconciliationStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let consistent = expected
            .try_subtract(&calculated)
            .is_ok_and(|derived| derived == difference)
            && status == ReconciliationStatus::for_difference(&difference);
        if !consistent {
            return Err(LedgerError::InconsistentReconciliation(id));
        }

        Ok(Self {
            id,
            account_id,
            reconciliation_date,
            expected,
            calculated,
            difference,
            status,
            created_at,
        })
    }

    /// Record id.
    #[must_use]
    pub const fn id(&self) -> ReconciliationId {
        self.id
    }

    /// Reconciled account.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// When the comparison was made.
    #[must_use]
    pub const fn reconciliation_date(&self) -> DateTime<Utc> {
        self.reconciliation_date
    }

    /// Externally asserted balance.
    #[must_use]
    pub const fn expected(&self) -> Money {
        self.expected
    }

    /// Balance derived from entries.
    #[must_use]
    pub const fn calculated(&self) -> Money {
        self.calculated
    }

    /// `expected - calculated`.
    #[must_use]
    pub const fn difference(&self) -> Money {
        self.difference
    }

    /// Match or mismatch.
    #[must_use]
    pub const fn status(&self) -> ReconciliationStatus {
        self.status
    }

    /// When the record was stored.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true when the balances agree.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.status == ReconciliationStatus::Match
    }
}
