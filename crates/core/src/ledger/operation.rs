//! Operation aggregate and its lifecycle.

use chrono::{DateTime, Utc};
use ledger_shared::clock;
use ledger_shared::types::{ExternalReference, OperationId};
use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// Reason recorded when an operation is ignored as a duplicate.
pub const DUPLICATE_REASON: &str = "Duplicate operation detected";

/// Kind of financial intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Funds enter a target account.
    Deposit,
    /// Funds leave a source account.
    Withdrawal,
    /// Funds move between two accounts.
    Transfer,
}

impl OperationKind {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "transfer" => Ok(Self::Transfer),
            other => Err(format!("Unknown operation kind: {other}")),
        }
    }
}

/// Lifecycle status.
///
/// `processing` moves exactly once to one of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Accepted and being booked.
    Processing,
    /// Entries are durable.
    Processed,
    /// Dropped as a duplicate.
    Ignored,
    /// Could not be booked.
    Failed,
}

impl OperationStatus {
    /// Returns the storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Ignored => "ignored",
            Self::Failed => "failed",
        }
    }

    /// Returns true for states that never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Processing)
    }
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OperationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "processed" => Ok(Self::Processed),
            "ignored" => Ok(Self::Ignored),
            "failed" => Ok(Self::Failed),
            other => Err(format!("Unknown operation status: {other}")),
        }
    }
}

/// A submitted financial operation, unique per external reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Operation {
    id: OperationId,
    reference: ExternalReference,
    kind: OperationKind,
    status: OperationStatus,
    created_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    failure_reason: Option<String>,
}

impl Operation {
    /// Starts a new operation in `processing`.
    #[must_use]
    pub fn start(reference: ExternalReference, kind: OperationKind) -> Self {
        Self {
            id: OperationId::new(),
            reference,
            kind,
            status: OperationStatus::Processing,
            created_at: clock::now(),
            processed_at: None,
            failure_reason: None,
        }
    }

    /// Rebuilds an operation loaded from storage.
    #[must_use]
    pub fn restore(
        id: OperationId,
        reference: ExternalReference,
        kind: OperationKind,
        status: OperationStatus,
        created_at: DateTime<Utc>,
        processed_at: Option<DateTime<Utc>>,
        failure_reason: Option<String>,
    ) -> Self {
        Self {
            id,
            reference,
            kind,
            status,
            created_at,
            processed_at,
            failure_reason,
        }
    }

    /// Marks the operation processed and stamps the processing time.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AlreadyProcessed` when called twice, and
    /// `LedgerError::InvalidTransition` from any other terminal state.
    pub fn mark_processed(&mut self) -> Result<(), LedgerError> {
        if self.status == OperationStatus::Processed {
            return Err(LedgerError::AlreadyProcessed(self.id));
        }
        self.transition(OperationStatus::Processed, None)
    }

    /// Marks the operation as an ignored duplicate.
    pub fn mark_ignored(&mut self) -> Result<(), LedgerError> {
        self.transition(OperationStatus::Ignored, Some(DUPLICATE_REASON.to_string()))
    }

    /// Marks the operation failed with a reason.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), LedgerError> {
        self.transition(OperationStatus::Failed, Some(reason.into()))
    }

    fn transition(
        &mut self,
        to: OperationStatus,
        failure_reason: Option<String>,
    ) -> Result<(), LedgerError> {
        if self.status.is_terminal() {
            return Err(LedgerError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.processed_at = Some(clock::now());
        self.failure_reason = failure_reason;
        Ok(())
    }

    /// Operation id.
    #[must_use]
    pub const fn id(&self) -> OperationId {
        self.id
    }

    /// Idempotency key.
    #[must_use]
    pub const fn reference(&self) -> &ExternalReference {
        &self.reference
    }

    /// Deposit, withdrawal, or transfer.
    #[must_use]
    pub const fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> OperationStatus {
        self.status
    }

    /// When the operation was first recorded.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the operation reached a terminal state.
    #[must_use]
    pub const fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    /// Why the operation failed, if it did.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}
