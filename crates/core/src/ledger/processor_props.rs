//! Property-based tests for operation processing.
//!
//! - Any arrival order of the same distinct operations gives the same balances
//! - Resubmitting every operation changes nothing

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use ledger_shared::types::{AccountId, Currency};

use super::account::{Account, AccountKind};
use super::balance_service::BalanceService;
use super::command::ProcessOperation;
use super::memory::InMemoryLedgerStore;
use super::processor::{OperationProcessor, ProcessorSettings};
use super::store::LedgerStore;

const ACCOUNTS: usize = 3;

/// An operation against account slots, resolved to ids per run.
#[derive(Debug, Clone)]
enum Planned {
    Deposit(usize, Decimal),
    Withdrawal(usize, Decimal),
    Transfer(usize, usize, Decimal),
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn planned() -> impl Strategy<Value = Planned> {
    prop_oneof![
        (0..ACCOUNTS, amount()).prop_map(|(a, m)| Planned::Deposit(a, m)),
        (0..ACCOUNTS, amount()).prop_map(|(a, m)| Planned::Withdrawal(a, m)),
        (0..ACCOUNTS, 1..ACCOUNTS, amount())
            .prop_map(|(a, offset, m)| Planned::Transfer(a, (a + offset) % ACCOUNTS, m)),
    ]
}

fn command(index: usize, plan: &Planned, accounts: &[AccountId]) -> ProcessOperation {
    let reference = format!("PROP-{index}");
    match *plan {
        Planned::Deposit(a, m) => ProcessOperation::deposit(reference, accounts[a], m),
        Planned::Withdrawal(a, m) => ProcessOperation::withdrawal(reference, accounts[a], m),
        Planned::Transfer(a, b, m) => {
            ProcessOperation::transfer(reference, accounts[a], accounts[b], m)
        }
    }
}

/// Replays `order` (indices into `plan`) on a fresh store, submitting each
/// operation `copies` times, and returns the final balance of every slot.
fn replay(plan: &[Planned], order: &[usize], copies: usize) -> Vec<Decimal> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async {
        let store = Arc::new(InMemoryLedgerStore::new());
        let mut accounts = Vec::with_capacity(ACCOUNTS);
        for _ in 0..ACCOUNTS {
            let account = Account::open(AccountKind::User);
            store.insert_account(&account).await.unwrap();
            accounts.push(account.id);
        }

        let processor = OperationProcessor::new(Arc::clone(&store), ProcessorSettings::default());
        for &index in order {
            for _ in 0..copies {
                processor
                    .process(&command(index, &plan[index], &accounts))
                    .await
                    .unwrap();
            }
        }

        let balances = BalanceService::new(Arc::clone(&store), Currency::Brl);
        let mut result = Vec::with_capacity(ACCOUNTS);
        for id in &accounts {
            result.push(balances.current_balance(*id).await.unwrap().balance.amount());
        }
        result
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// *For any* set of distinct operations, every arrival order yields the
    /// same final balances.
    #[test]
    fn prop_final_balances_are_order_independent(
        (plan, order) in prop::collection::vec(planned(), 1..15).prop_flat_map(|plan| {
            let order = Just((0..plan.len()).collect::<Vec<_>>()).prop_shuffle();
            (Just(plan), order)
        })
    ) {
        let in_order: Vec<usize> = (0..plan.len()).collect();
        prop_assert_eq!(replay(&plan, &in_order, 1), replay(&plan, &order, 1));
    }

    /// *For any* set of operations, submitting each one several times gives
    /// the same balances as submitting it once.
    #[test]
    fn prop_resubmission_is_idempotent(
        plan in prop::collection::vec(planned(), 1..10),
        copies in 2usize..4,
    ) {
        let order: Vec<usize> = (0..plan.len()).collect();
        prop_assert_eq!(replay(&plan, &order, 1), replay(&plan, &order, copies));
    }

    /// *For any* mix of operations without a settlement account, transfers
    /// never change the sum of all balances.
    #[test]
    fn prop_transfers_preserve_total(plan in prop::collection::vec(planned(), 1..15)) {
        let order: Vec<usize> = (0..plan.len()).collect();
        let balances = replay(&plan, &order, 1);
        let total: Decimal = balances.iter().copied().sum();

        let external: Decimal = plan
            .iter()
            .map(|p| match *p {
                Planned::Deposit(_, m) => m,
                Planned::Withdrawal(_, m) => -m,
                Planned::Transfer(..) => Decimal::ZERO,
            })
            .sum();
        prop_assert_eq!(total, external);
    }
}
