//! Pluggable bank-data provider abstraction
//!
//! This module provides a backend-agnostic interface to the aggregator that
//! issues link tokens, exchanges public tokens, and serves account/transaction
//! feeds.
//!
//! # Architecture
//!
//! - `BankProvider` trait: defines the interface for all provider operations
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `HttpProvider`, `SandboxProvider`
//!
//! # Configuration
//!
//! Environment variables:
//! - `BANK_PROVIDER`: Backend to use (http, sandbox). Default: sandbox
//! - `BANK_PROVIDER_HOST`: Aggregator base URL (required for http backend)
//! - `BANK_PROVIDER_CLIENT_ID` / `BANK_PROVIDER_SECRET`: API credentials

mod http;
mod sandbox;

pub use http::HttpProvider;
pub use sandbox::SandboxProvider;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Account, Transaction};

/// Trait defining the interface for all bank-data providers
#[async_trait]
pub trait BankProvider: Send + Sync {
    /// Issue a short-lived link token to start the account-linking flow
    async fn create_link_token(&self, user_id: &str) -> Result<String>;

    /// Exchange a public token for a durable access token
    async fn exchange_public_token(&self, public_token: &str) -> Result<String>;

    /// Fetch the account snapshot and transaction feed for a date window
    async fn fetch_feed(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Account>, Vec<Transaction>)>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete provider client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum ProviderClient {
    /// HTTP backend speaking the aggregator's JSON API
    Http(HttpProvider),
    /// Deterministic synthetic feed for tests and local development
    Sandbox(SandboxProvider),
}

impl ProviderClient {
    /// Create a provider client from environment variables
    ///
    /// Checks `BANK_PROVIDER` to determine which backend to use:
    /// - `http`: Uses BANK_PROVIDER_HOST and credential env vars
    /// - `sandbox` (default): Deterministic synthetic feed
    pub fn from_env() -> Self {
        let backend = std::env::var("BANK_PROVIDER").unwrap_or_else(|_| "sandbox".to_string());

        match backend.to_lowercase().as_str() {
            "http" => match HttpProvider::from_env() {
                Some(provider) => ProviderClient::Http(provider),
                None => {
                    tracing::warn!(
                        "BANK_PROVIDER=http but BANK_PROVIDER_HOST/credentials not set, \
                         falling back to sandbox"
                    );
                    ProviderClient::Sandbox(SandboxProvider::new())
                }
            },
            "sandbox" => ProviderClient::Sandbox(SandboxProvider::new()),
            _ => {
                tracing::warn!(backend = %backend, "Unknown BANK_PROVIDER, falling back to sandbox");
                ProviderClient::Sandbox(SandboxProvider::new())
            }
        }
    }

    /// Create a sandbox provider directly (for tests)
    pub fn sandbox() -> Self {
        ProviderClient::Sandbox(SandboxProvider::new())
    }
}

#[async_trait]
impl BankProvider for ProviderClient {
    async fn create_link_token(&self, user_id: &str) -> Result<String> {
        match self {
            ProviderClient::Http(b) => b.create_link_token(user_id).await,
            ProviderClient::Sandbox(b) => b.create_link_token(user_id).await,
        }
    }

    async fn exchange_public_token(&self, public_token: &str) -> Result<String> {
        match self {
            ProviderClient::Http(b) => b.exchange_public_token(public_token).await,
            ProviderClient::Sandbox(b) => b.exchange_public_token(public_token).await,
        }
    }

    async fn fetch_feed(
        &self,
        access_token: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Vec<Account>, Vec<Transaction>)> {
        match self {
            ProviderClient::Http(b) => b.fetch_feed(access_token, start, end).await,
            ProviderClient::Sandbox(b) => b.fetch_feed(access_token, start, end).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Http(b) => b.health_check().await,
            ProviderClient::Sandbox(b) => b.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Http(b) => b.host(),
            ProviderClient::Sandbox(b) => b.host(),
        }
    }
}
