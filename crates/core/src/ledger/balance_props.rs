//! Property-based tests for entry construction and balance derivation.
//!
//! - Order independence: any permutation of entries folds to the same balance
//! - Conservation: a debit/credit pair of equal magnitude sums to zero
//! - Non-zero entries: zero amounts never construct

use proptest::prelude::*;
use rust_decimal::Decimal;
use ledger_shared::types::{AccountId, Currency, Money, OperationId};

use super::balance::BalanceCalculator;
use super::entry::{Entry, EntryDirection, EntryType};
use super::error::LedgerError;
use super::factory::EntryFactory;

/// Strategy to generate positive amounts (0.0001 to 1,000,000.0000).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000_000i64).prop_map(|units| Decimal::new(units, 4))
}

/// Strategy to generate a signed, non-zero entry.
fn signed_entry() -> impl Strategy<Value = Entry> {
    (positive_amount(), any::<bool>()).prop_map(|(amount, credit)| {
        let money = Money::new(amount, Currency::Brl);
        if credit {
            EntryFactory::create_credit_entry(
                OperationId::new(),
                AccountId::new(),
                money,
                EntryType::Deposit,
                "api",
            )
        } else {
            EntryFactory::create_debit_entry(
                OperationId::new(),
                AccountId::new(),
                money,
                EntryType::Withdrawal,
                "api",
            )
        }
        .unwrap()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* entry set and any permutation of it, the balance is identical.
    #[test]
    fn prop_balance_is_order_independent(
        (entries, shuffled) in prop::collection::vec(signed_entry(), 0..40)
            .prop_flat_map(|entries| {
                let shuffled = Just(entries.clone()).prop_shuffle();
                (Just(entries), shuffled)
            })
    ) {
        let calc = BalanceCalculator::new(Currency::Brl);
        prop_assert_eq!(
            calc.calculate_balance(&entries).unwrap(),
            calc.calculate_balance(&shuffled).unwrap()
        );
    }

    /// *For any* positive amount, a transfer pair validates and sums to zero.
    #[test]
    fn prop_transfer_pair_conserves(amount in positive_amount()) {
        let op = OperationId::new();
        let money = Money::new(amount, Currency::Brl);
        let out = EntryFactory::create_debit_entry(
            op, AccountId::new(), money, EntryType::TransferOut, "api",
        ).unwrap();
        let inn = EntryFactory::create_credit_entry(
            op, AccountId::new(), money, EntryType::TransferIn, "api",
        ).unwrap();

        let pair = [out, inn];
        prop_assert!(EntryFactory::validate_double_entry(&pair));
        prop_assert!(BalanceCalculator::new(Currency::Brl)
            .calculate_balance(&pair)
            .unwrap()
            .is_zero());
    }

    /// *For any* direction, a zero amount never becomes an entry.
    #[test]
    fn prop_zero_entry_rejected(credit in any::<bool>()) {
        let direction = if credit { EntryDirection::Credit } else { EntryDirection::Debit };
        let result = Entry::new(
            OperationId::new(),
            AccountId::new(),
            Money::zero(Currency::Brl),
            direction,
            EntryType::Deposit,
            "api",
        );
        prop_assert!(matches!(result, Err(LedgerError::ZeroAmount)));
    }

    /// *For any* balance and cutoff after every entry, the point-in-time
    /// balance equals the current balance.
    #[test]
    fn prop_balance_up_to_now_equals_balance(entries in prop::collection::vec(signed_entry(), 0..20)) {
        let calc = BalanceCalculator::new(Currency::Brl);
        let cutoff = chrono::Utc::now();
        prop_assert_eq!(
            calc.calculate_balance_up_to(&entries, cutoff).unwrap(),
            calc.calculate_balance(&entries).unwrap()
        );
    }
}
