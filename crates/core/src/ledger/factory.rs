//! Entry construction with the ledger's sign convention.

use ledger_shared::types::{AccountId, Money, OperationId};

use super::entry::{Entry, EntryDirection, EntryType};
use super::error::LedgerError;

/// Builds correctly signed entries.
///
/// Callers pass magnitudes; the factory decides the sign from the side.
pub struct EntryFactory;

impl EntryFactory {
    /// Creates a debit entry storing `-amount`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` unless `amount > 0`.
    pub fn create_debit_entry(
        operation_id: OperationId,
        account_id: AccountId,
        amount: Money,
        entry_type: EntryType,
        source: &str,
    ) -> Result<Entry, LedgerError> {
        ensure_positive(amount)?;
        Entry::new(
            operation_id,
            account_id,
            amount.negate(),
            EntryDirection::Debit,
            entry_type,
            source,
        )
    }

    /// Creates a credit entry storing `amount`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NonPositiveAmount` unless `amount > 0`.
    pub fn create_credit_entry(
        operation_id: OperationId,
        account_id: AccountId,
        amount: Money,
        entry_type: EntryType,
        source: &str,
    ) -> Result<Entry, LedgerError> {
        ensure_positive(amount)?;
        Entry::new(
            operation_id,
            account_id,
            amount,
            EntryDirection::Credit,
            entry_type,
            source,
        )
    }

    /// Returns true iff `entries` is non-empty and its amounts sum to exactly zero.
    #[must_use]
    pub fn validate_double_entry(entries: &[Entry]) -> bool {
        let Some(first) = entries.first() else {
            return false;
        };

        entries
            .iter()
            .try_fold(Money::zero(first.amount().currency()), |sum, entry| {
                sum.try_add(&entry.amount())
            })
            .is_ok_and(|total| total.is_zero())
    }
}

fn ensure_positive(amount: Money) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::NonPositiveAmount(amount.amount()))
    }
}
