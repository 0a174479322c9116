//! Keel Core Library
//!
//! Shared functionality for the Keel financial aggregation engine:
//! - Data model for accounts, transactions, goals, and derived views
//! - Bank-link lifecycle state machine
//! - Pluggable bank-data provider backends (HTTP aggregator, sandbox)
//! - Categorized spending breakdown
//! - Balance-trend forecasting against savings goals
//! - Recurring ("gray") charge detection
//! - Pluggable narrative-insight backends (Ollama, mock)

pub mod detect;
pub mod error;
pub mod forecast;
pub mod insight;
pub mod link;
pub mod models;
pub mod provider;
pub mod spending;
pub mod store;

pub use detect::{DetectorConfig, GrayChargeDetector};
pub use error::{Error, Result};
pub use forecast::{ForecastConfig, ForecastEngine};
pub use insight::{InsightBackend, InsightClient, MockBackend, OllamaBackend};
pub use link::{BankConnection, LinkSessionManager, LinkStatus};
pub use models::{
    Account, AccountType, AnomalyReport, BalancePoint, Cadence, CategoryTotal, ForecastResult,
    ForecastSummary, Goal, RecurringCharge, Transaction,
};
pub use provider::{BankProvider, HttpProvider, ProviderClient, SandboxProvider};
pub use spending::compute_breakdown;
pub use store::TransactionStore;
