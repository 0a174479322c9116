//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod analysis;
pub mod link;
pub mod transactions;

// Re-export all handlers for use in router
pub use analysis::*;
pub use link::*;
pub use transactions::*;

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde::Serialize;

use keel_core::insight::InsightBackend;
use keel_core::provider::BankProvider;
use keel_core::store::TransactionStore;

use crate::{AppError, AppState};

/// Session key used when a request body omits `user_id`
pub(crate) fn default_user() -> String {
    "default".to_string()
}

/// Fetch a user's feed for the last `days` days into a session snapshot
///
/// Holds the user's session lock only long enough to read the access token;
/// the provider fetch itself runs unlocked so read-only requests for the
/// same user can overlap.
pub(crate) async fn feed_store(
    state: &AppState,
    user_id: &str,
    days: i64,
) -> Result<TransactionStore, AppError> {
    let session = state.sessions.session(user_id);
    let access_token = {
        let manager = session.lock().await;
        manager
            .access_token()
            .map_err(AppError::from_core)?
            .to_string()
    };

    let end = Utc::now().date_naive();
    let start = end - Duration::days(days);
    let (accounts, transactions) = state
        .provider
        .fetch_feed(&access_token, start, end)
        .await
        .map_err(AppError::from_core)?;

    Ok(TransactionStore::new(accounts, transactions))
}

/// Health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub provider_host: String,
    pub provider_healthy: bool,
    pub insight_configured: bool,
    pub insight_healthy: bool,
}

/// GET /api/health - Backend availability report
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider_healthy = state.provider.health_check().await;
    let insight_healthy = match &state.insight {
        Some(client) => client.health_check().await,
        None => false,
    };

    Json(HealthResponse {
        status: "ok",
        provider_host: state.provider.host().to_string(),
        provider_healthy,
        insight_configured: state.insight.is_some(),
        insight_healthy,
    })
}
