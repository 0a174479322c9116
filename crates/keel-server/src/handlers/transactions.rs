//! Transaction feed and spending rollup handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use keel_core::models::{Account, CategoryTotal, Transaction};
use keel_core::spending::compute_breakdown;

use crate::handlers::{default_user, feed_store};
use crate::{AppError, AppState};

const FEED_WINDOW_DAYS: i64 = 30;
const BREAKDOWN_WINDOW_DAYS: i64 = 60;

#[derive(Deserialize)]
pub struct FeedRequest {
    #[serde(default = "default_user")]
    pub user_id: String,
}

impl Default for FeedRequest {
    fn default() -> Self {
        Self {
            user_id: default_user(),
        }
    }
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub accounts: Vec<Account>,
    pub transactions: Vec<Transaction>,
}

/// POST /api/transactions - Recent account snapshot and transaction feed
pub async fn fetch_transactions(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FeedRequest>>,
) -> Result<Json<FeedResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let store = feed_store(&state, &request.user_id, FEED_WINDOW_DAYS).await?;
    let (accounts, transactions) = store.into_parts();
    Ok(Json(FeedResponse {
        accounts,
        transactions,
    }))
}

#[derive(Serialize)]
pub struct BreakdownResponse {
    pub breakdown: Vec<CategoryTotal>,
}

/// POST /api/spending-breakdown - Top spending categories over the last 60 days
pub async fn spending_breakdown(
    State(state): State<Arc<AppState>>,
    body: Option<Json<FeedRequest>>,
) -> Result<Json<BreakdownResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let store = feed_store(&state, &request.user_id, BREAKDOWN_WINDOW_DAYS).await?;
    let breakdown = compute_breakdown(store.transactions());
    Ok(Json(BreakdownResponse { breakdown }))
}
