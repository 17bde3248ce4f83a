//! Ledger accounts.
//!
//! An account is identity plus classification. Its balance is never stored;
//! it is derived from entries by [`super::BalanceCalculator`].

use chrono::{DateTime, Utc};
use ledger_shared::clock;
use ledger_shared::types::AccountId;
use serde::{Deserialize, Serialize};

/// Classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// Customer-owned account.
    User,
    /// Internal account owned by the institution.
    System,
    /// Clearing account for funds in flight.
    Transit,
}

impl AccountKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::System => "system",
            Self::Transit => "transit",
        }
    }

    /// Returns true if the account may offset deposits and withdrawals.
    #[must_use]
    pub const fn can_settle(self) -> bool {
        matches!(self, Self::System | Self::Transit)
    }
}

impl std::fmt::Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "system" => Ok(Self::System),
            "transit" => Ok(Self::Transit),
            other => Err(format!("Unknown account kind: {other}")),
        }
    }
}

/// A ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Classification.
    pub kind: AccountKind,
    /// When the account was opened.
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Opens a new account with a fresh id.
    #[must_use]
    pub fn open(kind: AccountKind) -> Self {
        Self {
            id: AccountId::new(),
            kind,
            created_at: clock::now(),
        }
    }

    /// Rebuilds an account loaded from storage.
    #[must_use]
    pub const fn restore(id: AccountId, kind: AccountKind, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [AccountKind::User, AccountKind::System, AccountKind::Transit] {
            assert_eq!(AccountKind::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(AccountKind::from_str("asset").is_err());
    }

    #[test]
    fn test_only_internal_accounts_settle() {
        assert!(!AccountKind::User.can_settle());
        assert!(AccountKind::System.can_settle());
        assert!(AccountKind::Transit.can_settle());
    }

    #[test]
    fn test_open_assigns_identity() {
        let a = Account::open(AccountKind::User);
        let b = Account::open(AccountKind::User);
        assert_ne!(a.id, b.id);
        assert_eq!(a.kind, AccountKind::User);
    }
}
