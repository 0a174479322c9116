//! Keel Web Server
//!
//! Axum-based REST API for the Keel financial aggregation engine.
//!
//! Session model: one `LinkSessionManager` per user, created lazily and held
//! behind a per-user async mutex. A request locks only its own user's
//! session, so users proceed independently while a duplicate exchange for
//! the same user queues behind the first and then observes `Connected`.
//! Authentication is an external concern; `user_id` rides in each request
//! body.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use keel_core::insight::{InsightBackend, InsightClient};
use keel_core::link::LinkSessionManager;
use keel_core::provider::{BankProvider, ProviderClient};

mod handlers;

#[cfg(test)]
mod tests;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Lazily-created per-user link sessions
///
/// The outer mutex only guards map access; each session has its own async
/// mutex so provider calls for one user never block another user.
#[derive(Default)]
pub struct SessionRegistry {
    inner: Mutex<HashMap<String, Arc<tokio::sync::Mutex<LinkSessionManager>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the session for a user
    pub fn session(&self, user_id: &str) -> Arc<tokio::sync::Mutex<LinkSessionManager>> {
        let mut map = self.inner.lock().expect("session registry poisoned");
        map.entry(user_id.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(LinkSessionManager::new(user_id))))
            .clone()
    }
}

/// Shared application state
pub struct AppState {
    pub provider: ProviderClient,
    pub insight: Option<InsightClient>,
    pub sessions: SessionRegistry,
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router with backends resolved from the environment
pub fn create_router(config: ServerConfig) -> Router {
    let provider = ProviderClient::from_env();
    info!(host = %provider.host(), "Bank provider configured");

    let insight = InsightClient::from_env();
    match &insight {
        Some(client) => {
            info!(host = %client.host(), model = %client.model(), "Insight backend configured")
        }
        None => info!("Insight backend not configured (set OLLAMA_HOST to enable narratives)"),
    }

    create_router_with_backends(provider, insight, config)
}

/// Create the application router with explicit backends (for testing)
pub fn create_router_with_backends(
    provider: ProviderClient,
    insight: Option<InsightClient>,
    config: ServerConfig,
) -> Router {
    let state = Arc::new(AppState {
        provider,
        insight,
        sessions: SessionRegistry::new(),
    });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/link-token", post(handlers::create_link_token))
        .route("/exchange-token", post(handlers::exchange_public_token))
        .route("/transactions", post(handlers::fetch_transactions))
        .route("/spending-breakdown", post(handlers::spending_breakdown))
        .route("/analyze-spending", post(handlers::analyze_spending))
        .route("/forecast", post(handlers::forecast_goal))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(build_cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer from the configured origins
///
/// With no configured origins the layer stays restrictive (same-origin
/// only); explicit origins get GET/POST with JSON bodies.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::new();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// Start the server, blocking until shutdown
pub async fn serve(host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let app = create_router(config);

    let addr = format!("{}:{}", host, port);
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.to_string(),
            internal: None,
        }
    }

    /// Map a core error onto an HTTP status
    ///
    /// Precondition and validation failures are the caller's fault (400);
    /// provider trouble is upstream (502) and retryable.
    pub fn from_core(err: keel_core::Error) -> Self {
        use keel_core::Error;
        match err {
            Error::NotConnected | Error::InvalidGoal(_) | Error::InvalidTransition(_) => {
                Self::bad_request(&err.to_string())
            }
            Error::Provider(_) => {
                Self::bad_gateway("Bank provider is unavailable - please try again")
            }
            Error::InsightUnavailable(_) => {
                Self::bad_gateway("Insight service is unavailable - please try again")
            }
            other => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "An internal error occurred".to_string(),
                internal: Some(other.into()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
