//! Ledger error types for validation, invariant, and state errors.
//!
//! Idempotency conflicts never appear here: the processor resolves them to
//! the existing operation before returning.

use ledger_shared::types::{
    AccountId, MoneyError, OperationId, ReconciliationId, ReferenceError,
};
use rust_decimal::Decimal;
use thiserror::Error;

use super::entry::EntryDirection;
use super::operation::OperationStatus;
use super::store::StoreError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// The idempotency key is malformed.
    #[error("Invalid external reference: {0}")]
    InvalidReference(#[from] ReferenceError),

    /// The command carries no operation kind.
    #[error("Operation kind is required")]
    MissingKind,

    /// Operation amounts must be strictly positive.
    #[error("Amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// The amount does not fit the storage columns.
    #[error("Amount {0} exceeds the supported range")]
    AmountOutOfRange(Decimal),

    /// Deposits and transfers need a target account.
    #[error("Target account is required")]
    MissingTargetAccount,

    /// Withdrawals and transfers need a source account.
    #[error("Source account is required")]
    MissingSourceAccount,

    /// A transfer must move funds between two different accounts.
    #[error("Cannot transfer to the same account: {0}")]
    SameAccountTransfer(AccountId),

    // ========== Invariant Errors ==========
    /// Entry amount cannot be zero.
    #[error("Entry amount cannot be zero")]
    ZeroAmount,

    /// Entry sign disagrees with its direction.
    #[error("{direction} entry cannot carry amount {amount}")]
    DirectionMismatch {
        /// Declared direction.
        direction: EntryDirection,
        /// Signed amount supplied.
        amount: Decimal,
    },

    /// Generated entries do not sum to zero.
    #[error("Entries for operation {0} do not balance")]
    UnbalancedEntries(OperationId),

    /// Money arithmetic failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Stored reconciliation data is internally inconsistent.
    #[error("Reconciliation record {0} is inconsistent")]
    InconsistentReconciliation(ReconciliationId),

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Reconciliation record not found.
    #[error("Reconciliation not found: {0}")]
    ReconciliationNotFound(ReconciliationId),

    // ========== Operation State Errors ==========
    /// The operation was already processed.
    #[error("Operation {0} is already processed")]
    AlreadyProcessed(OperationId),

    /// The operation already reached a terminal state.
    #[error("Operation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The operation.
        id: OperationId,
        /// Current status.
        from: OperationStatus,
        /// Requested status.
        to: OperationStatus,
    },

    // ========== Configuration Errors ==========
    /// The configured settlement account is missing or is a user account.
    #[error("Settlement account {0} must exist and be a system or transit account")]
    InvalidSettlementAccount(AccountId),

    // ========== Storage Errors ==========
    /// Persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidReference(_) => "INVALID_REFERENCE",
            Self::MissingKind => "MISSING_KIND",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::AmountOutOfRange(_) => "AMOUNT_OUT_OF_RANGE",
            Self::MissingTargetAccount => "MISSING_TARGET_ACCOUNT",
            Self::MissingSourceAccount => "MISSING_SOURCE_ACCOUNT",
            Self::SameAccountTransfer(_) => "SAME_ACCOUNT_TRANSFER",
            Self::ZeroAmount => "ZERO_AMOUNT",
            Self::DirectionMismatch { .. } => "DIRECTION_MISMATCH",
            Self::UnbalancedEntries(_) => "UNBALANCED_ENTRIES",
            Self::Money(MoneyError::CurrencyMismatch { .. }) => "CURRENCY_MISMATCH",
            Self::Money(MoneyError::InvalidAmount(_)) => "INVALID_AMOUNT",
            Self::Money(MoneyError::Overflow { .. }) => "AMOUNT_OVERFLOW",
            Self::InconsistentReconciliation(_) => "INCONSISTENT_RECONCILIATION",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::ReconciliationNotFound(_) => "RECONCILIATION_NOT_FOUND",
            Self::AlreadyProcessed(_) => "ALREADY_PROCESSED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvalidSettlementAccount(_) => "INVALID_SETTLEMENT_ACCOUNT",
            Self::Store(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidReference(_)
            | Self::MissingKind
            | Self::NonPositiveAmount(_)
            | Self::AmountOutOfRange(_)
            | Self::MissingTargetAccount
            | Self::MissingSourceAccount
            | Self::SameAccountTransfer(_)
            | Self::Money(MoneyError::InvalidAmount(_)) => 400,

            // 404 Not Found
            Self::AccountNotFound(_) | Self::ReconciliationNotFound(_) => 404,

            // 409 Conflict - invariant and state errors
            Self::ZeroAmount
            | Self::DirectionMismatch { .. }
            | Self::UnbalancedEntries(_)
            | Self::Money(MoneyError::CurrencyMismatch { .. })
            | Self::AlreadyProcessed(_)
            | Self::InvalidTransition { .. } => 409,

            // 500 Internal Server Error
            Self::InconsistentReconciliation(_)
            | Self::Money(MoneyError::Overflow { .. })
            | Self::InvalidSettlementAccount(_)
            | Self::Store(_) => 500,
        }
    }

    /// Returns true if the caller is at fault.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_shared::types::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::from(ReferenceError::Empty).error_code(),
            "INVALID_REFERENCE"
        );
        assert_eq!(
            LedgerError::NonPositiveAmount(dec!(0)).error_code(),
            "NON_POSITIVE_AMOUNT"
        );
        assert_eq!(LedgerError::ZeroAmount.error_code(), "ZERO_AMOUNT");
        assert_eq!(
            LedgerError::Money(MoneyError::CurrencyMismatch {
                left: Currency::Brl,
                right: Currency::Usd,
            })
            .error_code(),
            "CURRENCY_MISMATCH"
        );
        assert_eq!(
            LedgerError::Store(StoreError::Backend("down".to_string())).error_code(),
            "STORAGE_ERROR"
        );
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::MissingKind.http_status_code(), 400);
        assert_eq!(
            LedgerError::SameAccountTransfer(AccountId::new()).http_status_code(),
            400
        );
        assert_eq!(
            LedgerError::AccountNotFound(AccountId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::ReconciliationNotFound(ReconciliationId::new()).http_status_code(),
            404
        );
        assert_eq!(
            LedgerError::AlreadyProcessed(OperationId::new()).http_status_code(),
            409
        );
        assert_eq!(
            LedgerError::Store(StoreError::Backend("down".to_string())).http_status_code(),
            500
        );
    }

    #[test]
    fn test_amount_range_errors() {
        let err = LedgerError::AmountOutOfRange(Decimal::MAX);
        assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
        assert_eq!(err.http_status_code(), 400);

        let err = LedgerError::from(MoneyError::Overflow {
            left: Decimal::MAX,
            op: '+',
            right: dec!(1),
        });
        assert_eq!(err.error_code(), "AMOUNT_OVERFLOW");
        assert_eq!(err.http_status_code(), 500);
    }

    #[test]
    fn test_client_errors() {
        assert!(LedgerError::MissingTargetAccount.is_client_error());
        assert!(LedgerError::AccountNotFound(AccountId::new()).is_client_error());
        assert!(!LedgerError::Store(StoreError::Backend("x".to_string())).is_client_error());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::DirectionMismatch {
            direction: EntryDirection::Debit,
            amount: dec!(5.0000),
        };
        assert_eq!(err.to_string(), "debit entry cannot carry amount 5.0000");

        let err = LedgerError::from(ReferenceError::InvalidCharacter(' '));
        assert_eq!(
            err.to_string(),
            "Invalid external reference: External reference contains invalid character ' '"
        );
    }
}
