//! Application configuration management.

use serde::Deserialize;

use crate::types::{AccountId, Currency};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger behaviour.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging output.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Currency of every amount the ledger books.
    #[serde(default = "default_currency")]
    pub currency: Currency,
    /// Source tag used when a command does not carry one.
    #[serde(default = "default_source")]
    pub default_source: String,
    /// System or transit account that offsets deposits and withdrawals.
    /// When unset, deposits and withdrawals produce a single entry.
    #[serde(default)]
    pub settlement_account: Option<AccountId>,
    /// Entries shown by divergence analysis.
    #[serde(default = "default_divergence_entry_limit")]
    pub divergence_entry_limit: u64,
    /// Records shown on the reconciliation dashboard.
    #[serde(default = "default_dashboard_recent_limit")]
    pub dashboard_recent_limit: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            default_source: default_source(),
            settlement_account: None,
            divergence_entry_limit: default_divergence_entry_limit(),
            dashboard_recent_limit: default_dashboard_recent_limit(),
        }
    }
}

fn default_currency() -> Currency {
    Currency::Brl
}

fn default_source() -> String {
    "api".to_string()
}

fn default_divergence_entry_limit() -> u64 {
    20
}

fn default_dashboard_recent_limit() -> u64 {
    10
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Output format.
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub default_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            default_filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "ledger=debug".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `LEDGER__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("LEDGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
