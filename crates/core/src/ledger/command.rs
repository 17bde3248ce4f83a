//! Operation commands and their validation.

use ledger_shared::types::{AccountId, Currency, ExternalReference, Money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::operation::OperationKind;

/// A request to book a financial operation.
///
/// Fields are optional where callers can omit them; [`Self::validate`]
/// decides which combinations are acceptable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOperation {
    /// Idempotency key.
    pub reference: String,
    /// Operation kind.
    pub kind: Option<OperationKind>,
    /// Account funds leave.
    pub source_account: Option<AccountId>,
    /// Account funds enter.
    pub target_account: Option<AccountId>,
    /// Magnitude, strictly positive.
    pub amount: Decimal,
    /// Channel tag recorded on entries, e.g. `api`.
    pub source: Option<String>,
}

impl ProcessOperation {
    /// Deposit into `target`.
    #[must_use]
    pub fn deposit(reference: impl Into<String>, target: AccountId, amount: Decimal) -> Self {
        Self {
            reference: reference.into(),
            kind: Some(OperationKind::Deposit),
            source_account: None,
            target_account: Some(target),
            amount,
            source: None,
        }
    }

    /// Withdrawal from `source`.
    #[must_use]
    pub fn withdrawal(reference: impl Into<String>, source: AccountId, amount: Decimal) -> Self {
        Self {
            reference: reference.into(),
            kind: Some(OperationKind::Withdrawal),
            source_account: Some(source),
            target_account: None,
            amount,
            source: None,
        }
    }

    /// Transfer from `from` to `to`.
    #[must_use]
    pub fn transfer(
        reference: impl Into<String>,
        from: AccountId,
        to: AccountId,
        amount: Decimal,
    ) -> Self {
        Self {
            reference: reference.into(),
            kind: Some(OperationKind::Transfer),
            source_account: Some(from),
            target_account: Some(to),
            amount,
            source: None,
        }
    }

    /// Sets the channel tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Checks the command's shape without touching storage.
    ///
    /// # Errors
    ///
    /// Returns a validation `LedgerError` describing the first problem found.
    pub fn validate(
        &self,
        currency: Currency,
        default_source: &str,
    ) -> Result<ValidatedOperation, LedgerError> {
        let reference = ExternalReference::parse(&self.reference)?;
        let kind = self.kind.ok_or(LedgerError::MissingKind)?;

        let amount = Money::new(self.amount, currency);
        if !amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount(self.amount));
        }
        if !amount.is_storable() {
            return Err(LedgerError::AmountOutOfRange(self.amount));
        }

        let movement = match kind {
            OperationKind::Deposit => Movement::Deposit {
                target: self.target_account.ok_or(LedgerError::MissingTargetAccount)?,
            },
            OperationKind::Withdrawal => Movement::Withdrawal {
                source: self.source_account.ok_or(LedgerError::MissingSourceAccount)?,
            },
            OperationKind::Transfer => {
                let from = self.source_account.ok_or(LedgerError::MissingSourceAccount)?;
                let to = self.target_account.ok_or(LedgerError::MissingTargetAccount)?;
                if from == to {
                    return Err(LedgerError::SameAccountTransfer(from));
                }
                Movement::Transfer { from, to }
            }
        };

        let source = self
            .source
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .unwrap_or(default_source)
            .to_string();

        Ok(ValidatedOperation {
            reference,
            movement,
            amount,
            source,
        })
    }
}

/// Accounts touched by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Credit `target`.
    Deposit {
        /// Receiving account.
        target: AccountId,
    },
    /// Debit `source`.
    Withdrawal {
        /// Paying account.
        source: AccountId,
    },
    /// Debit `from`, credit `to`.
    Transfer {
        /// Paying account.
        from: AccountId,
        /// Receiving account.
        to: AccountId,
    },
}

impl Movement {
    /// Kind implied by the movement.
    #[must_use]
    pub const fn kind(self) -> OperationKind {
        match self {
            Self::Deposit { .. } => OperationKind::Deposit,
            Self::Withdrawal { .. } => OperationKind::Withdrawal,
            Self::Transfer { .. } => OperationKind::Transfer,
        }
    }

    /// Accounts that must exist before booking.
    #[must_use]
    pub fn accounts(self) -> Vec<AccountId> {
        match self {
            Self::Deposit { target } => vec![target],
            Self::Withdrawal { source } => vec![source],
            Self::Transfer { from, to } => vec![from, to],
        }
    }
}

/// A command that passed shape validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedOperation {
    /// Canonical idempotency key.
    pub reference: ExternalReference,
    /// Accounts and direction of funds.
    pub movement: Movement,
    /// Strictly positive magnitude.
    pub amount: Money,
    /// Channel tag.
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_shared::types::ReferenceError;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn validate(command: &ProcessOperation) -> Result<ValidatedOperation, LedgerError> {
        command.validate(Currency::Brl, "api")
    }

    #[test]
    fn test_valid_deposit() {
        let target = AccountId::new();
        let validated = validate(&ProcessOperation::deposit(" DEP-1 ", target, dec!(10))).unwrap();
        assert_eq!(validated.reference.as_str(), "DEP-1");
        assert_eq!(validated.movement, Movement::Deposit { target });
        assert_eq!(validated.amount.amount(), dec!(10.0000));
        assert_eq!(validated.source, "api");
    }

    #[test]
    fn test_source_tag_override() {
        let command =
            ProcessOperation::deposit("DEP-2", AccountId::new(), dec!(1)).with_source("simulation");
        assert_eq!(validate(&command).unwrap().source, "simulation");
    }

    #[test]
    fn test_missing_kind() {
        let mut command = ProcessOperation::deposit("K-1", AccountId::new(), dec!(1));
        command.kind = None;
        assert!(matches!(validate(&command), Err(LedgerError::MissingKind)));
    }

    #[test]
    fn test_bad_reference() {
        let command = ProcessOperation::deposit("bad ref", AccountId::new(), dec!(1));
        assert!(matches!(
            validate(&command),
            Err(LedgerError::InvalidReference(ReferenceError::InvalidCharacter(' ')))
        ));
    }

    #[test]
    fn test_non_positive_amounts() {
        for amount in [dec!(0), dec!(-5), dec!(0.00004)] {
            let command = ProcessOperation::deposit("A-1", AccountId::new(), amount);
            assert!(matches!(
                validate(&command),
                Err(LedgerError::NonPositiveAmount(_))
            ));
        }
    }

    #[rstest]
    #[case(dec!(1000000000000000))]
    #[case(dec!(999999999999999.99995))]
    #[case(Decimal::MAX)]
    fn test_amounts_beyond_storage_range(#[case] amount: Decimal) {
        let command = ProcessOperation::deposit("BIG-1", AccountId::new(), amount);
        assert!(matches!(
            validate(&command),
            Err(LedgerError::AmountOutOfRange(_))
        ));
    }

    #[test]
    fn test_largest_storable_amount() {
        let command =
            ProcessOperation::deposit("BIG-2", AccountId::new(), dec!(999999999999999.9999));
        assert!(validate(&command).is_ok());
    }

    #[test]
    fn test_missing_accounts() {
        let mut deposit = ProcessOperation::deposit("M-1", AccountId::new(), dec!(1));
        deposit.target_account = None;
        assert!(matches!(
            validate(&deposit),
            Err(LedgerError::MissingTargetAccount)
        ));

        let mut withdrawal = ProcessOperation::withdrawal("M-2", AccountId::new(), dec!(1));
        withdrawal.source_account = None;
        assert!(matches!(
            validate(&withdrawal),
            Err(LedgerError::MissingSourceAccount)
        ));

        let mut transfer =
            ProcessOperation::transfer("M-3", AccountId::new(), AccountId::new(), dec!(1));
        transfer.target_account = None;
        assert!(matches!(
            validate(&transfer),
            Err(LedgerError::MissingTargetAccount)
        ));
    }

    #[test]
    fn test_self_transfer_rejected() {
        let account = AccountId::new();
        let command = ProcessOperation::transfer("T-1", account, account, dec!(1));
        assert!(matches!(
            validate(&command),
            Err(LedgerError::SameAccountTransfer(id)) if id == account
        ));
    }

    #[test]
    fn test_movement_accounts() {
        let (a, b) = (AccountId::new(), AccountId::new());
        let movement = Movement::Transfer { from: a, to: b };
        assert_eq!(movement.kind(), OperationKind::Transfer);
        assert_eq!(movement.accounts(), vec![a, b]);
    }
}
