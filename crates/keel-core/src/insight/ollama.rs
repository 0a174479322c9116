//! Ollama insight backend
//!
//! HTTP client for the Ollama generate API. Prompts are assembled locally
//! from the numeric summary; the model only ever sees aggregates and
//! merchant/cadence patterns.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ForecastSummary, RecurringCharge};

use super::InsightBackend;

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::InsightUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::InsightUnavailable(format!(
                "Ollama returned {}",
                status
            )));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| Error::InsightUnavailable(e.to_string()))?;

        debug!(model = %self.model, chars = body.response.len(), "Generated insight");
        Ok(body.response.trim().to_string())
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

fn forecast_prompt(summary: &ForecastSummary) -> String {
    let categories = summary
        .top_categories
        .iter()
        .map(|c| format!("{} (${:.0})", c.category, c.total))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Act as a smart, empathetic financial coach.\n\
         \n\
         User status:\n\
         - Current net balance: ${:.2}\n\
         - Goal: save ${:.2} by {}\n\
         - Projected trend: ${:.2} ({}), slope ${:.2}/day\n\
         \n\
         Their top spending areas recently: {}\n\
         \n\
         Write a 2-sentence insight. First sentence: react to their progress \
         (celebrate if on track, encourage if off track). Second sentence: give \
         specific advice referencing their actual top spending categories above.\n\
         Do not use markdown. Keep it conversational.",
        summary.current_balance,
        summary.target_amount,
        summary.target_date,
        summary.projected_balance,
        if summary.is_on_track {
            "ON TRACK"
        } else {
            "OFF TRACK"
        },
        summary.daily_trend,
        if categories.is_empty() {
            "none recorded".to_string()
        } else {
            categories
        },
    )
}

fn recurring_prompt(charges: &[RecurringCharge]) -> String {
    let findings = charges
        .iter()
        .map(|c| {
            format!(
                "- {} (${:.2}, {:?}, seen {} times)",
                c.merchant, c.amount, c.cadence, c.occurrences
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "These recurring charges were detected in a user's spending \
         (merchant, typical amount, cadence, occurrence count):\n\
         {}\n\
         \n\
         Write a brief, friendly summary flagging which of these look like \
         \"gray charges\" — subscriptions the user may have forgotten about — \
         and one specific, easy tip to save money. Keep it punchy, no \
         corporate speak, no markdown.",
        findings
    )
}

#[async_trait]
impl InsightBackend for OllamaBackend {
    async fn summarize_forecast(&self, summary: &ForecastSummary) -> Result<String> {
        self.generate(forecast_prompt(summary)).await
    }

    async fn summarize_recurring(&self, charges: &[RecurringCharge]) -> Result<String> {
        self.generate(recurring_prompt(charges)).await
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
