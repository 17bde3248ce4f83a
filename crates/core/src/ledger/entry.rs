//! Ledger entry domain types.
//!
//! An entry is one side of a double-entry record. It is write-once: there
//! are no setters, and construction enforces the sign convention
//! (debit negative, credit positive, never zero).

use chrono::{DateTime, Utc};
use ledger_shared::clock;
use ledger_shared::types::{AccountId, EntryId, Money, OperationId};
use serde::Serialize;

use super::error::LedgerError;

/// Side of a double-entry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Funds leave the account; stored amount is negative.
    Debit,
    /// Funds enter the account; stored amount is positive.
    Credit,
}

impl EntryDirection {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(format!("Unknown entry direction: {other}")),
        }
    }
}

/// Business classification of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Credit to the depositing account.
    Deposit,
    /// Debit from the withdrawing account.
    Withdrawal,
    /// Debit leg of a transfer.
    TransferOut,
    /// Credit leg of a transfer.
    TransferIn,
    /// Settlement debit offsetting a deposit.
    DepositSettlement,
    /// Settlement credit offsetting a withdrawal.
    WithdrawalSettlement,
}

impl EntryType {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::TransferOut => "transfer_out",
            Self::TransferIn => "transfer_in",
            Self::DepositSettlement => "deposit_settlement",
            Self::WithdrawalSettlement => "withdrawal_settlement",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer_out" => Ok(Self::TransferOut),
            "transfer_in" => Ok(Self::TransferIn),
            "deposit_settlement" => Ok(Self::DepositSettlement),
            "withdrawal_settlement" => Ok(Self::WithdrawalSettlement),
            other => Err(format!("Unknown entry type: {other}")),
        }
    }
}

/// An immutable ledger fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    id: EntryId,
    operation_id: OperationId,
    account_id: AccountId,
    amount: Money,
    direction: EntryDirection,
    entry_type: EntryType,
    source: String,
    created_at: DateTime<Utc>,
}

impl Entry {
    /// Creates a new entry stamped with the current time.
    ///
    /// `amount` is the signed amount: negative for debits, positive for credits.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::ZeroAmount` or `LedgerError::DirectionMismatch`
    /// when the amount violates the sign convention.
    pub fn new(
        operation_id: OperationId,
        account_id: AccountId,
        amount: Money,
        direction: EntryDirection,
        entry_type: EntryType,
        source: impl Into<String>,
    ) -> Result<Self, LedgerError> {
        Self::restore(
            EntryId::new(),
            operation_id,
            account_id,
            amount,
            direction,
            entry_type,
            source.into(),
            clock::now(),
        )
    }

    /// Rebuilds an entry loaded from storage, re-checking its invariants.
    #[allow(clippy::too_many_arguments)]
    pub fn restore(
        id: EntryId,
        operation_id: OperationId,
        account_id: AccountId,
        amount: Money,
        direction: EntryDirection,
        entry_type: EntryType,
        source: String,
        created_at: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        check_sign(amount, direction)?;
        Ok(Self {
            id,
            operation_id,
            account_id,
            amount,
            direction,
            entry_type,
            source,
            created_at,
        })
    }

    /// Entry id.
    #[must_use]
    pub const fn id(&self) -> EntryId {
        self.id
    }

    /// Operation that produced this entry.
    #[must_use]
    pub const fn operation_id(&self) -> OperationId {
        self.operation_id
    }

    /// Account the entry is booked against.
    #[must_use]
    pub const fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Signed amount.
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.amount
    }

    /// Debit or credit.
    #[must_use]
    pub const fn direction(&self) -> EntryDirection {
        self.direction
    }

    /// Kind of movement that produced the entry.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Channel that submitted the operation, e.g. `api`.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Creation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns true for debit entries.
    #[must_use]
    pub fn is_debit(&self) -> bool {
        self.direction == EntryDirection::Debit
    }

    /// Returns true for credit entries.
    #[must_use]
    pub fn is_credit(&self) -> bool {
        self.direction == EntryDirection::Credit
    }
}

fn check_sign(amount: Money, direction: EntryDirection) -> Result<(), LedgerError> {
    if amount.is_zero() {
        return Err(LedgerError::ZeroAmount);
    }

    let agrees = match direction {
        EntryDirection::Debit => amount.is_negative(),
        EntryDirection::Credit => amount.is_positive(),
    };
    if !agrees {
        return Err(LedgerError::DirectionMismatch {
            direction,
            amount: amount.amount(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_shared::types::Currency;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn brl(amount: Decimal) -> Money {
        Money::new(amount, Currency::Brl)
    }

    fn entry(amount: Decimal, direction: EntryDirection) -> Result<Entry, LedgerError> {
        Entry::new(
            OperationId::new(),
            AccountId::new(),
            brl(amount),
            direction,
            EntryType::Deposit,
            "api",
        )
    }

    #[test]
    fn test_zero_entry_is_rejected() {
        assert!(matches!(
            entry(dec!(0), EntryDirection::Credit),
            Err(LedgerError::ZeroAmount)
        ));
        assert!(matches!(
            entry(dec!(0.00001), EntryDirection::Debit),
            Err(LedgerError::ZeroAmount)
        ));
    }

    #[rstest]
    #[case(dec!(10), EntryDirection::Debit)]
    #[case(dec!(-10), EntryDirection::Credit)]
    fn test_sign_must_agree_with_direction(
        #[case] amount: Decimal,
        #[case] direction: EntryDirection,
    ) {
        assert!(matches!(
            entry(amount, direction),
            Err(LedgerError::DirectionMismatch { .. })
        ));
    }

    #[test]
    fn test_valid_entries() {
        let debit = entry(dec!(-10), EntryDirection::Debit).unwrap();
        assert!(debit.is_debit());
        assert_eq!(debit.amount(), brl(dec!(-10)));

        let credit = entry(dec!(10), EntryDirection::Credit).unwrap();
        assert!(credit.is_credit());
        assert_eq!(credit.source(), "api");
    }

    #[test]
    fn test_entry_type_storage_names() {
        use std::str::FromStr;
        assert_eq!(EntryType::TransferOut.as_str(), "transfer_out");
        assert_eq!(
            EntryType::from_str("withdrawal_settlement").unwrap(),
            EntryType::WithdrawalSettlement
        );
        assert!(EntryType::from_str("refund").is_err());
        assert_eq!(
            serde_json::to_string(&EntryType::TransferIn).unwrap(),
            "\"transfer_in\""
        );
    }
}
