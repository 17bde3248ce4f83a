//! Shared value types and configuration for the ledger core.
//!
//! This crate provides common types used across all other crates:
//! - Money with fixed four-digit scale and currency
//! - Typed IDs for type-safe entity references
//! - External references (idempotency keys)
//! - Timestamp helper matching storage precision
//! - Configuration management

pub mod clock;
pub mod config;
pub mod types;

pub use config::AppConfig;
pub use types::{Currency, ExternalReference, Money, MoneyError, ReferenceError};
