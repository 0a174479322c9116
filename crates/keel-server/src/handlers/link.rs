//! Bank-link lifecycle handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::handlers::default_user;
use crate::{AppError, AppState, SuccessResponse};

#[derive(Deserialize)]
pub struct LinkTokenRequest {
    #[serde(default = "default_user")]
    pub user_id: String,
}

impl Default for LinkTokenRequest {
    fn default() -> Self {
        Self {
            user_id: default_user(),
        }
    }
}

#[derive(Serialize)]
pub struct LinkTokenResponse {
    pub link_token: String,
}

/// POST /api/link-token - Start the account-linking flow
///
/// The body is optional; requests without one act on the default user.
pub async fn create_link_token(
    State(state): State<Arc<AppState>>,
    body: Option<Json<LinkTokenRequest>>,
) -> Result<Json<LinkTokenResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let user_id = request.user_id;

    let session = state.sessions.session(&user_id);
    let mut manager = session.lock().await;
    let link_token = manager
        .request_link_token(&state.provider)
        .await
        .map_err(AppError::from_core)?;

    info!(user = %user_id, "Issued link token");
    Ok(Json(LinkTokenResponse { link_token }))
}

#[derive(Deserialize)]
pub struct ExchangeTokenRequest {
    pub public_token: String,
    #[serde(default = "default_user")]
    pub user_id: String,
}

/// POST /api/exchange-token - Trade a public token for a durable connection
///
/// The per-user session lock is held for the whole exchange, so concurrent
/// duplicates queue behind the first and complete as no-ops.
pub async fn exchange_public_token(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ExchangeTokenRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let session = state.sessions.session(&request.user_id);
    let mut manager = session.lock().await;
    manager
        .exchange_public_token(&state.provider, &request.public_token)
        .await
        .map_err(AppError::from_core)?;

    info!(user = %request.user_id, "Bank connection established");
    Ok(Json(SuccessResponse { success: true }))
}
