//! Mock insight backend for testing
//!
//! Returns deterministic canned narratives, or fails every call when
//! constructed with `failing()` to exercise degradation paths.

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{ForecastSummary, RecurringCharge};

use super::InsightBackend;

/// Mock insight backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether calls succeed and health_check returns true
    pub healthy: bool,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self { healthy: true }
    }

    /// Create a mock backend whose calls all fail
    pub fn failing() -> Self {
        Self { healthy: false }
    }

    fn ensure_healthy(&self) -> Result<()> {
        if self.healthy {
            Ok(())
        } else {
            Err(Error::InsightUnavailable(
                "mock insight backend unavailable".to_string(),
            ))
        }
    }
}

#[async_trait]
impl InsightBackend for MockBackend {
    async fn summarize_forecast(&self, summary: &ForecastSummary) -> Result<String> {
        self.ensure_healthy()?;
        Ok(format!(
            "You're {} for your ${:.0} goal: projected balance ${:.2} by {}.",
            if summary.is_on_track {
                "on track"
            } else {
                "off track"
            },
            summary.target_amount,
            summary.projected_balance,
            summary.target_date,
        ))
    }

    async fn summarize_recurring(&self, charges: &[RecurringCharge]) -> Result<String> {
        self.ensure_healthy()?;
        if charges.is_empty() {
            return Ok("No recurring charges stood out in this window.".to_string());
        }
        Ok(format!(
            "Found {} recurring charge(s), led by {} at ${:.2}.",
            charges.len(),
            charges[0].merchant,
            charges[0].amount,
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
