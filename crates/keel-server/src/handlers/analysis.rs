//! Forecast and recurring-charge analysis handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use keel_core::detect::GrayChargeDetector;
use keel_core::forecast::ForecastEngine;
use keel_core::models::{ForecastResult, Goal, RecurringCharge};

use crate::handlers::{default_user, feed_store};
use crate::{AppError, AppState};

const ANALYSIS_WINDOW_DAYS: i64 = 60;
const FORECAST_WINDOW_DAYS: i64 = 180;

#[derive(Deserialize)]
pub struct AnalyzeSpendingRequest {
    #[serde(default = "default_user")]
    pub user_id: String,
    // Goal fields are accepted but unused; the analysis covers the whole window
    #[serde(default)]
    #[allow(dead_code)]
    pub target_amount: Option<f64>,
    #[serde(default)]
    #[allow(dead_code)]
    pub target_date: Option<String>,
}

impl Default for AnalyzeSpendingRequest {
    fn default() -> Self {
        Self {
            user_id: default_user(),
            target_amount: None,
            target_date: None,
        }
    }
}

#[derive(Serialize)]
pub struct AnalyzeSpendingResponse {
    pub analysis: String,
    pub recurring_charges: Vec<RecurringCharge>,
}

/// POST /api/analyze-spending - Gray-charge scan with a narrative summary
pub async fn analyze_spending(
    State(state): State<Arc<AppState>>,
    body: Option<Json<AnalyzeSpendingRequest>>,
) -> Result<Json<AnalyzeSpendingResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();

    let store = feed_store(&state, &request.user_id, ANALYSIS_WINDOW_DAYS).await?;
    let detector = GrayChargeDetector::new();
    let report = detector
        .analyze(&store, state.insight.as_ref())
        .await
        .map_err(AppError::from_core)?;

    info!(
        user = %request.user_id,
        found = report.recurring_charges.len(),
        "Recurring-charge scan complete"
    );
    Ok(Json(AnalyzeSpendingResponse {
        analysis: report.narrative,
        recurring_charges: report.recurring_charges,
    }))
}

#[derive(Deserialize)]
pub struct ForecastRequest {
    #[serde(default = "default_user")]
    pub user_id: String,
    pub target_amount: f64,
    pub target_date: String,
}

/// POST /api/forecast - Project the balance trend toward a savings goal
pub async fn forecast_goal(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ForecastRequest>,
) -> Result<Json<ForecastResult>, AppError> {
    let goal = Goal::parse(request.target_amount, &request.target_date)
        .map_err(AppError::from_core)?;

    let store = feed_store(&state, &request.user_id, FORECAST_WINDOW_DAYS).await?;
    let engine = ForecastEngine::new();
    let result = engine
        .forecast(&store, &goal, state.insight.as_ref())
        .await
        .map_err(AppError::from_core)?;

    info!(
        user = %request.user_id,
        projected = result.projected_balance,
        on_track = result.is_on_track,
        "Forecast complete"
    );
    Ok(Json(result))
}
