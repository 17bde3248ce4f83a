//! Balance derivation.
//!
//! A balance is a fold of entry amounts. Addition is commutative, so the
//! result does not depend on the order entries arrive in. Nothing is cached.

use chrono::{DateTime, Utc};
use ledger_shared::types::{Currency, Money};

use super::entry::Entry;
use super::error::LedgerError;

/// Folds entries into balances of one currency.
#[derive(Debug, Clone, Copy)]
pub struct BalanceCalculator {
    currency: Currency,
}

impl BalanceCalculator {
    /// Creates a calculator whose empty balance is zero in `currency`.
    #[must_use]
    pub const fn new(currency: Currency) -> Self {
        Self { currency }
    }

    /// Sums every entry.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Money` if an entry has a different currency or
    /// the sum overflows.
    pub fn calculate_balance(&self, entries: &[Entry]) -> Result<Money, LedgerError> {
        self.fold(entries.iter())
    }

    /// Sums the entries created at or before `cutoff`.
    pub fn calculate_balance_up_to(
        &self,
        entries: &[Entry],
        cutoff: DateTime<Utc>,
    ) -> Result<Money, LedgerError> {
        self.fold(entries.iter().filter(|entry| entry.created_at() <= cutoff))
    }

    /// Number of entries.
    #[must_use]
    pub fn count_entries(&self, entries: &[Entry]) -> usize {
        entries.len()
    }

    fn fold<'a>(
        &self,
        mut entries: impl Iterator<Item = &'a Entry>,
    ) -> Result<Money, LedgerError> {
        entries.try_fold(Money::zero(self.currency), |balance, entry| {
            Ok(balance.try_add(&entry.amount())?)
        })
    }
}
