//! Reconciliation of asserted balances against derived balances.

use std::sync::Arc;

use ledger_shared::types::{AccountId, Currency, Money};
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::dashboard::ReconciliationDashboard;
use super::record::ReconciliationRecord;
use crate::ledger::{BalanceCalculator, LedgerError, LedgerStore};

/// Compares expected balances with the ledger and records the outcome.
///
/// Only ever appends reconciliation records; accounts and entries are read-only here.
pub struct Reconciler<S: ?Sized> {
    store: Arc<S>,
    calculator: BalanceCalculator,
    currency: Currency,
}

impl<S: LedgerStore + ?Sized> Reconciler<S> {
    /// Creates a reconciler for amounts in `currency`.
    #[must_use]
    pub fn new(store: Arc<S>, currency: Currency) -> Self {
        Self {
            store,
            calculator: BalanceCalculator::new(currency),
            currency,
        }
    }

    /// Reconciles an account against an externally asserted balance.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AmountOutOfRange` when `expected` does not fit
    /// the storage columns and `LedgerError::AccountNotFound` for unknown
    /// accounts.
    pub async fn reconcile(
        &self,
        account_id: AccountId,
        expected: Decimal,
    ) -> Result<ReconciliationRecord, LedgerError> {
        let expected_balance = Money::new(expected, self.currency);
        if !expected_balance.is_storable() {
            return Err(LedgerError::AmountOutOfRange(expected));
        }
        self.ensure_account(account_id).await?;

        let entries = self.store.entries_for_account(account_id).await?;
        let calculated = self.calculator.calculate_balance(&entries)?;
        let record =
            ReconciliationRecord::create(account_id, expected_balance, calculated)?;
        self.store.insert_reconciliation(&record).await?;

        if record.is_match() {
            info!(
                reconciliation_id = %record.id(),
                account_id = %account_id,
                balance = %calculated,
                "Reconciliation matched"
            );
        } else {
            warn!(
                reconciliation_id = %record.id(),
                account_id = %account_id,
                expected = %record.expected(),
                calculated = %record.calculated(),
                difference = %record.difference(),
                "Reconciliation mismatch"
            );
        }

        Ok(record)
    }

    /// Reconciliation history of an account, newest first.
    pub async fn history(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<ReconciliationRecord>, LedgerError> {
        self.ensure_account(account_id).await?;
        Ok(self.store.reconciliations_for_account(account_id).await?)
    }

    /// Overview across all accounts.
    pub async fn dashboard(
        &self,
        recent_limit: usize,
    ) -> Result<ReconciliationDashboard, LedgerError> {
        let total_accounts = self.store.count_accounts().await?;
        let records = self.store.all_reconciliations().await?;
        Ok(ReconciliationDashboard::summarize(
            total_accounts,
            &records,
            recent_limit,
            self.currency,
        ))
    }

    async fn ensure_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        match self.store.find_account(account_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::AccountNotFound(account_id)),
        }
    }
}
