//! Balance queries over persisted entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ledger_shared::clock;
use ledger_shared::types::{AccountId, Currency, Money};
use serde::Serialize;
use tracing::debug;

use super::balance::BalanceCalculator;
use super::error::LedgerError;
use super::store::LedgerStore;

/// A derived balance and the entries it was folded from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceSnapshot {
    /// The account.
    pub account_id: AccountId,
    /// Sum of entry amounts.
    pub balance: Money,
    /// Entries included in the sum.
    pub entry_count: usize,
    /// Point in time the balance describes.
    pub as_of: DateTime<Utc>,
}

/// Derives balances on demand. Takes no locks and caches nothing.
pub struct BalanceService<S: ?Sized> {
    store: Arc<S>,
    calculator: BalanceCalculator,
}

impl<S: LedgerStore + ?Sized> BalanceService<S> {
    /// Creates a service deriving balances in `currency`.
    #[must_use]
    pub fn new(store: Arc<S>, currency: Currency) -> Self {
        Self {
            store,
            calculator: BalanceCalculator::new(currency),
        }
    }

    /// Current balance of an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` for unknown accounts.
    pub async fn current_balance(&self, account_id: AccountId) -> Result<BalanceSnapshot, LedgerError> {
        self.ensure_account(account_id).await?;

        let as_of = clock::now();
        let entries = self.store.entries_for_account(account_id).await?;
        let balance = self.calculator.calculate_balance(&entries)?;
        debug!(account_id = %account_id, balance = %balance, entries = entries.len(), "Balance derived");

        Ok(BalanceSnapshot {
            account_id,
            balance,
            entry_count: self.calculator.count_entries(&entries),
            as_of,
        })
    }

    /// Balance of an account including only entries created at or before `cutoff`.
    pub async fn balance_as_of(
        &self,
        account_id: AccountId,
        cutoff: DateTime<Utc>,
    ) -> Result<BalanceSnapshot, LedgerError> {
        self.ensure_account(account_id).await?;

        let entries = self
            .store
            .entries_for_account_up_to(account_id, cutoff)
            .await?;
        let balance = self.calculator.calculate_balance_up_to(&entries, cutoff)?;

        Ok(BalanceSnapshot {
            account_id,
            balance,
            entry_count: entries.iter().filter(|e| e.created_at() <= cutoff).count(),
            as_of: cutoff,
        })
    }

    async fn ensure_account(&self, account_id: AccountId) -> Result<(), LedgerError> {
        match self.store.find_account(account_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::AccountNotFound(account_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::ledger::account::{Account, AccountKind};
    use crate::ledger::command::ProcessOperation;
    use crate::ledger::memory::InMemoryLedgerStore;
    use crate::ledger::processor::{OperationProcessor, ProcessorSettings};

    struct Fixture {
        store: Arc<InMemoryLedgerStore>,
        processor: OperationProcessor<InMemoryLedgerStore>,
        balances: BalanceService<InMemoryLedgerStore>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryLedgerStore::new());
        Fixture {
            processor: OperationProcessor::new(Arc::clone(&store), ProcessorSettings::default()),
            balances: BalanceService::new(Arc::clone(&store), Currency::Brl),
            store,
        }
    }

    async fn open(store: &InMemoryLedgerStore) -> AccountId {
        let account = Account::open(AccountKind::User);
        store.insert_account(&account).await.unwrap();
        account.id
    }

    #[tokio::test]
    async fn test_new_account_has_zero_balance() {
        let f = fixture();
        let account = open(&f.store).await;

        let snapshot = f.balances.current_balance(account).await.unwrap();
        assert!(snapshot.balance.is_zero());
        assert_eq!(snapshot.entry_count, 0);
    }

    #[tokio::test]
    async fn test_deposit_raises_balance_by_exactly_its_amount() {
        let f = fixture();
        let account = open(&f.store).await;

        let before = f.balances.current_balance(account).await.unwrap();
        let again = f.balances.current_balance(account).await.unwrap();
        assert_eq!(before.balance, again.balance);

        f.processor
            .process(&ProcessOperation::deposit("D-1", account, dec!(12.3456)))
            .await
            .unwrap();

        let after = f.balances.current_balance(account).await.unwrap();
        assert_eq!(
            after.balance.try_subtract(&before.balance).unwrap().amount(),
            dec!(12.3456)
        );
        assert_eq!(after.entry_count, 1);
    }

    #[tokio::test]
    async fn test_transfer_conserves_value() {
        let f = fixture();
        let x = open(&f.store).await;
        let y = open(&f.store).await;
        f.processor
            .process(&ProcessOperation::deposit("SEED", x, dec!(100)))
            .await
            .unwrap();

        f.processor
            .process(&ProcessOperation::transfer("MOVE", x, y, dec!(40)))
            .await
            .unwrap();

        let bx = f.balances.current_balance(x).await.unwrap();
        let by = f.balances.current_balance(y).await.unwrap();
        assert_eq!(bx.balance.amount(), dec!(60));
        assert_eq!(by.balance.amount(), dec!(40));
    }

    #[tokio::test]
    async fn test_balance_as_of_excludes_later_entries() {
        let f = fixture();
        let account = open(&f.store).await;
        f.processor
            .process(&ProcessOperation::deposit("EARLY", account, dec!(10)))
            .await
            .unwrap();
        let cutoff = f.store.entries_for_account(account).await.unwrap()[0].created_at();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        f.processor
            .process(&ProcessOperation::deposit("LATE", account, dec!(5)))
            .await
            .unwrap();

        let snapshot = f.balances.balance_as_of(account, cutoff).await.unwrap();
        assert_eq!(snapshot.balance.amount(), dec!(10));
        assert_eq!(snapshot.entry_count, 1);
        assert_eq!(snapshot.as_of, cutoff);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let f = fixture();
        let result = f.balances.current_balance(AccountId::new()).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }
}
