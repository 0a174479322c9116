//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use keel_core::insight::InsightClient;
use keel_core::provider::ProviderClient;
use tower::ServiceExt;

fn setup_test_app() -> Router {
    let config = ServerConfig {
        allowed_origins: vec![],
    };
    create_router_with_backends(
        ProviderClient::sandbox(),
        Some(InsightClient::mock()),
        config,
    )
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Run the full link flow for a user so later requests find a connection
async fn connect_user(app: &Router, user_id: &str) {
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/link-token",
            serde_json::json!({"user_id": user_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    let link_token = json["link_token"].as_str().unwrap().to_string();
    assert!(!link_token.is_empty());

    let response = app
        .clone()
        .oneshot(post_json(
            "/api/exchange-token",
            serde_json::json!({"public_token": "public-test", "user_id": user_id}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["success"], true);
}

// ========== Health ==========

#[tokio::test]
async fn test_health() {
    let app = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["provider_healthy"], true);
    assert_eq!(json["insight_configured"], true);
    assert_eq!(json["insight_healthy"], true);
}

// ========== Link Flow ==========

#[tokio::test]
async fn test_link_and_exchange_flow() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;
}

#[tokio::test]
async fn test_link_token_without_body_uses_default_user() {
    let app = setup_test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/link-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["link_token"].as_str().unwrap().contains("default"));
}

#[tokio::test]
async fn test_exchange_without_link_token_is_rejected() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/exchange-token",
            serde_json::json!({"public_token": "public-test", "user_id": "bob"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_duplicate_exchange_is_idempotent() {
    let app = setup_test_app();
    connect_user(&app, "carol").await;

    // Second exchange succeeds without disturbing the connection
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/exchange-token",
            serde_json::json!({"public_token": "public-other", "user_id": "carol"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/api/transactions",
            serde_json::json!({"user_id": "carol"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let app = setup_test_app();
    connect_user(&app, "dave").await;

    // A different user is still disconnected
    let response = app
        .oneshot(post_json(
            "/api/transactions",
            serde_json::json!({"user_id": "erin"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Transactions ==========

#[tokio::test]
async fn test_fetch_transactions_requires_connection() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/transactions",
            serde_json::json!({"user_id": "nobody"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("connected"));
}

#[tokio::test]
async fn test_fetch_transactions_returns_feed() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/transactions",
            serde_json::json!({"user_id": "alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    let accounts = json["accounts"].as_array().unwrap();
    assert!(!accounts.is_empty());
    assert!(accounts.iter().any(|a| a["type"] == "depository"));

    let transactions = json["transactions"].as_array().unwrap();
    assert!(!transactions.is_empty());
    for tx in transactions {
        assert!(tx["date"].as_str().is_some());
        assert!(tx["amount"].as_f64().is_some());
    }
}

// ========== Spending Breakdown ==========

#[tokio::test]
async fn test_spending_breakdown_shape() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/spending-breakdown",
            serde_json::json!({"user_id": "alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    let breakdown = json["breakdown"].as_array().unwrap();
    assert!(!breakdown.is_empty());
    assert!(breakdown.len() <= 5);

    // Sorted by total descending, transfers excluded
    let totals: Vec<f64> = breakdown
        .iter()
        .map(|c| c["total"].as_f64().unwrap())
        .collect();
    for pair in totals.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    for entry in breakdown {
        let category = entry["category"].as_str().unwrap();
        assert_ne!(category, "Transfer");
        assert_ne!(category, "Transfer Out");
    }
}

// ========== Analyze Spending ==========

#[tokio::test]
async fn test_analyze_spending_finds_recurring_charges() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/analyze-spending",
            serde_json::json!({"user_id": "alice"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    assert!(!json["analysis"].as_str().unwrap().is_empty());
    let charges = json["recurring_charges"].as_array().unwrap();
    assert!(charges
        .iter()
        .any(|c| c["merchant"].as_str().unwrap().contains("STREAMLY")));
}

#[tokio::test]
async fn test_analyze_spending_accepts_goal_fields() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    // Goal fields in the body are tolerated even though the scan ignores them
    let response = app
        .oneshot(post_json(
            "/api/analyze-spending",
            serde_json::json!({
                "user_id": "alice",
                "target_amount": 5000.0,
                "target_date": "2027-01-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// ========== Forecast ==========

#[tokio::test]
async fn test_forecast_returns_projection() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/forecast",
            serde_json::json!({
                "user_id": "alice",
                "target_amount": 5000.0,
                "target_date": "2027-06-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;

    assert!(json["current_balance"].as_f64().is_some());
    assert!(json["projected_balance"].as_f64().is_some());
    assert!(json["is_on_track"].as_bool().is_some());
    assert!(!json["ai_insight"].as_str().unwrap().is_empty());

    let history = json["history"].as_array().unwrap();
    assert!(!history.is_empty());
    let last = history.last().unwrap();
    assert_eq!(last["date"].as_str().unwrap(), "2027-06-01");
    assert!(last["trend"].as_f64().is_some());
    // Future points carry no actual balance
    assert!(last.get("balance").is_none() || last["balance"].is_null());
}

#[tokio::test]
async fn test_forecast_rejects_negative_target() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/forecast",
            serde_json::json!({
                "user_id": "alice",
                "target_amount": -100.0,
                "target_date": "2027-06-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forecast_rejects_malformed_date() {
    let app = setup_test_app();
    connect_user(&app, "alice").await;

    let response = app
        .oneshot(post_json(
            "/api/forecast",
            serde_json::json!({
                "user_id": "alice",
                "target_amount": 5000.0,
                "target_date": "June 2027"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().is_some());
}

#[tokio::test]
async fn test_forecast_requires_connection() {
    let app = setup_test_app();

    let response = app
        .oneshot(post_json(
            "/api/forecast",
            serde_json::json!({
                "user_id": "nobody",
                "target_amount": 5000.0,
                "target_date": "2027-06-01"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
