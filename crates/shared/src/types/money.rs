//! Money type with fixed decimal scale and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` and always carries exactly
//! [`MONEY_SCALE`] fractional digits, matching the `NUMERIC(19,4)` storage columns.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits carried by every [`Money`] value.
pub const MONEY_SCALE: u32 = 4;

/// Exclusive upper bound on the magnitude of a storable amount.
///
/// `NUMERIC(19,4)` leaves fifteen integer digits, so `10^15` is the first
/// value the columns cannot hold.
pub const MAX_MAGNITUDE: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// Errors raised by money arithmetic and parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// Arithmetic across two currencies.
    #[error("Cannot operate on different currencies: {left} vs {right}")]
    CurrencyMismatch {
        /// Currency of the left operand.
        left: Currency,
        /// Currency of the right operand.
        right: Currency,
    },

    /// The amount text is not a decimal number.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// The result does not fit in a decimal.
    #[error("Arithmetic overflow: {left} {op} {right}")]
    Overflow {
        /// Left operand.
        left: Decimal,
        /// `+` or `-`.
        op: char,
        /// Right operand.
        right: Decimal,
    },
}

/// ISO 4217 currency codes supported by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Brazilian Real
    Brl,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Indonesian Rupiah
    Idr,
    /// Singapore Dollar
    Sgd,
    /// Japanese Yen
    Jpy,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Brl => "BRL",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Idr => "IDR",
            Self::Sgd => "SGD",
            Self::Jpy => "JPY",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BRL" => Ok(Self::Brl),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "IDR" => Ok(Self::Idr),
            "SGD" => Ok(Self::Sgd),
            "JPY" => Ok(Self::Jpy),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}

/// A monetary amount with currency.
///
/// The amount is rounded half-up to four fractional digits once, at
/// construction. Arithmetic between two values never re-rounds because the
/// result of adding or subtracting scale-4 decimals is already scale 4.
/// Equality compares the numeric value, so `10.5` and `10.5000` are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "MoneyParts")]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

#[derive(Deserialize)]
struct MoneyParts {
    amount: Decimal,
    currency: Currency,
}

impl From<MoneyParts> for Money {
    fn from(parts: MoneyParts) -> Self {
        Self::new(parts.amount, parts.currency)
    }
}

impl Money {
    /// Creates a new Money instance, rounding half-up to the fixed scale.
    #[must_use]
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        let rounded =
            amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Self::scaled(rounded, currency)
    }

    /// Creates a zero amount in the specified currency.
    #[must_use]
    pub fn zero(currency: Currency) -> Self {
        Self::scaled(Decimal::ZERO, currency)
    }

    /// Parses a decimal string such as `"10.50"`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::InvalidAmount` if the text is not a decimal number.
    pub fn parse(value: &str, currency: Currency) -> Result<Self, MoneyError> {
        let amount = Decimal::from_str(value.trim())
            .map_err(|_| MoneyError::InvalidAmount(value.to_string()))?;
        Ok(Self::new(amount, currency))
    }

    fn scaled(mut amount: Decimal, currency: Currency) -> Self {
        amount.rescale(MONEY_SCALE);
        Self { amount, currency }
    }

    /// Returns the amount with exactly four fractional digits.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.amount
    }

    /// Returns the currency.
    #[must_use]
    pub const fn currency(&self) -> Currency {
        self.currency
    }

    /// Returns true if the amount is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly less than zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Returns true if the magnitude fits the storage columns.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        self.amount.abs() < MAX_MAGNITUDE
    }

    /// Adds another amount of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` if the currencies differ and
    /// `MoneyError::Overflow` if the sum does not fit in a decimal.
    pub fn try_add(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        let sum = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow {
                left: self.amount,
                op: '+',
                right: other.amount,
            })?;
        Ok(Self::scaled(sum, self.currency))
    }

    /// Subtracts another amount of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::CurrencyMismatch` if the currencies differ and
    /// `MoneyError::Overflow` if the difference does not fit in a decimal.
    pub fn try_subtract(&self, other: &Self) -> Result<Self, MoneyError> {
        self.ensure_same_currency(other)?;
        let difference = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::Overflow {
                left: self.amount,
                op: '-',
                right: other.amount,
            })?;
        Ok(Self::scaled(difference, self.currency))
    }

    /// Returns the value with its sign flipped.
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::scaled(-self.amount, self.currency)
    }

    /// Returns the absolute value.
    #[must_use]
    pub fn abs(&self) -> Self {
        Self::scaled(self.amount.abs(), self.currency)
    }

    fn ensure_same_currency(&self, other: &Self) -> Result<(), MoneyError> {
        if self.currency == other.currency {
            Ok(())
        } else {
            Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: other.currency,
            })
        }
    }
}

impl std::ops::Neg for Money {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.currency, self.amount)
    }
}
