//! Pluggable narrative-insight backend abstraction
//!
//! Turns a numeric summary (forecast result, recurring-charge findings) into
//! free-text commentary. The payload is always plain numeric/categorical
//! data — merchant names at most, never the raw transaction feed — and a
//! backend failure surfaces as `InsightUnavailable` so callers can degrade
//! to the numeric result instead of failing the whole operation.
//!
//! # Architecture
//!
//! - `InsightBackend` trait: defines the interface for all backends
//! - `InsightClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OllamaBackend`, `MockBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `INSIGHT_BACKEND`: Backend to use (ollama, mock). Default: ollama
//! - `OLLAMA_HOST`: Ollama server URL (required for ollama backend)
//! - `OLLAMA_MODEL`: Model name (default: llama3.2)

mod mock;
mod ollama;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ForecastSummary, RecurringCharge};

/// Trait defining the interface for all insight backends
#[async_trait]
pub trait InsightBackend: Send + Sync {
    /// Narrate a savings-goal forecast from its numeric summary
    async fn summarize_forecast(&self, summary: &ForecastSummary) -> Result<String>;

    /// Narrate a set of recurring-charge findings
    async fn summarize_recurring(&self, charges: &[RecurringCharge]) -> Result<String>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete insight client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum InsightClient {
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl InsightClient {
    /// Create an insight client from environment variables
    ///
    /// Checks `INSIGHT_BACKEND` to determine which backend to use:
    /// - `ollama` (default): Uses OLLAMA_HOST and OLLAMA_MODEL
    /// - `mock`: Creates a mock backend for testing
    ///
    /// Returns None if the required environment variables are not set.
    pub fn from_env() -> Option<Self> {
        let backend = std::env::var("INSIGHT_BACKEND").unwrap_or_else(|_| "ollama".to_string());

        match backend.to_lowercase().as_str() {
            "ollama" => OllamaBackend::from_env().map(InsightClient::Ollama),
            "mock" => Some(InsightClient::Mock(MockBackend::new())),
            _ => {
                tracing::warn!(backend = %backend, "Unknown INSIGHT_BACKEND, falling back to ollama");
                OllamaBackend::from_env().map(InsightClient::Ollama)
            }
        }
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        InsightClient::Mock(MockBackend::new())
    }
}

#[async_trait]
impl InsightBackend for InsightClient {
    async fn summarize_forecast(&self, summary: &ForecastSummary) -> Result<String> {
        match self {
            InsightClient::Ollama(b) => b.summarize_forecast(summary).await,
            InsightClient::Mock(b) => b.summarize_forecast(summary).await,
        }
    }

    async fn summarize_recurring(&self, charges: &[RecurringCharge]) -> Result<String> {
        match self {
            InsightClient::Ollama(b) => b.summarize_recurring(charges).await,
            InsightClient::Mock(b) => b.summarize_recurring(charges).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            InsightClient::Ollama(b) => b.health_check().await,
            InsightClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            InsightClient::Ollama(b) => b.model(),
            InsightClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            InsightClient::Ollama(b) => b.host(),
            InsightClient::Mock(b) => b.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_client_mock() {
        let client = InsightClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "mock://localhost");
    }

    #[tokio::test]
    async fn test_mock_health_check() {
        let client = InsightClient::mock();
        assert!(client.health_check().await);
    }
}
