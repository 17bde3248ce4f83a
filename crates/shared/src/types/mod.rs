//! Common types used across the ledger.

pub mod id;
pub mod money;
pub mod reference;

pub use id::*;
pub use money::{Currency, MAX_MAGNITUDE, MONEY_SCALE, Money, MoneyError};
pub use reference::{ExternalReference, ReferenceError};
