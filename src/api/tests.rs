//! Integration tests for the gateway API endpoints.

use super::*;
use crate::gateway::API_KEY_HEADER;
use axum::http::StatusCode;
use axum_test::TestServer;
use mockito::Matcher;
use serde_json::json;

const MODEL: &str = "gemini-test";

fn generate_path() -> String {
    format!("/v1beta/models/{}:generateContent", MODEL)
}

fn reply_with_text(text: &str) -> String {
    json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    })
    .to_string()
}

fn test_state(upstream_url: &str, api_key: Option<&str>) -> AppState {
    let gateway = GeminiClient::new(
        reqwest::Client::new(),
        upstream_url,
        MODEL,
        api_key.map(str::to_string),
    );
    let quota = QuotaTracker::new(Arc::new(MemoryStore::new()));
    AppState::new(gateway, quota)
}

fn server_for(state: AppState) -> TestServer {
    TestServer::new(create_router_with_state(state)).unwrap()
}

// =========================================================================
// Health and settings
// =========================================================================

#[tokio::test]
async fn health_check_returns_ok() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    let response = server.get("/health").await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "app": "quillgate",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }));
}

#[tokio::test]
async fn settings_report_missing_key_without_leaking_it() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    let response = server.get("/api/settings").await;

    response.assert_status_ok();
    response.assert_json(&json!({
        "geminiConfigured": false,
        "model": MODEL,
        "dailyLimit": 50,
        "windowHours": 24
    }));
}

// =========================================================================
// /api/suggest
// =========================================================================

#[tokio::test]
async fn suggest_returns_upstream_text() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", generate_path().as_str())
        .match_header(API_KEY_HEADER, "secret")
        .with_status(200)
        .with_body(reply_with_text("The cat sat."))
        .create_async()
        .await;
    let server = server_for(test_state(&upstream.url(), Some("secret")));

    let response = server
        .post("/api/suggest")
        .json(&json!({"prompt": "Fix grammar: teh cat sat"}))
        .await;

    response.assert_status_ok();
    response.assert_json(&json!({"suggestion": "The cat sat."}));
    mock.assert_async().await;
}

#[tokio::test]
async fn suggest_without_prompt_returns_400_and_skips_upstream() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let server = server_for(test_state(&upstream.url(), Some("secret")));

    let response = server.post("/api/suggest").json(&json!({})).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Prompt"));
    mock.assert_async().await;
}

#[tokio::test]
async fn suggest_with_malformed_json_returns_400() {
    let server = server_for(test_state("http://127.0.0.1:9", Some("secret")));

    let response = server
        .post("/api/suggest")
        .bytes(axum::body::Bytes::from_static(b"{not json"))
        .content_type("application/json")
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn suggest_without_key_returns_generic_500() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    let response = server
        .post("/api/suggest")
        .json(&json!({"prompt": "hello"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"error": "Internal server error"}));
}

#[tokio::test]
async fn suggest_mirrors_upstream_status() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("POST", generate_path().as_str())
        .with_status(429)
        .with_body("quota exceeded upstream")
        .create_async()
        .await;
    let server = server_for(test_state(&upstream.url(), Some("secret")));

    let response = server
        .post("/api/suggest")
        .json(&json!({"prompt": "hello"}))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    response.assert_json(&json!({"error": "quota exceeded upstream"}));
}

#[tokio::test]
async fn suggest_with_unexpected_shape_returns_500() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("POST", generate_path().as_str())
        .with_status(200)
        .with_body(r#"{"candidates":[]}"#)
        .create_async()
        .await;
    let server = server_for(test_state(&upstream.url(), Some("secret")));

    let response = server
        .post("/api/suggest")
        .json(&json!({"prompt": "hello"}))
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({"error": "Internal server error"}));
}

// =========================================================================
// Quota endpoints
// =========================================================================

#[tokio::test]
async fn quota_status_starts_empty() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    let response = server.get("/api/quota/alice").await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["used"], 0);
    assert_eq!(body["remaining"], 50);
    assert!(body["resetTime"].is_string());
}

#[tokio::test]
async fn increment_then_check_reflects_usage() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    for _ in 0..3 {
        server.post("/api/quota/alice/increment").await.assert_status_ok();
    }

    let check = server.post("/api/quota/alice/check").add_query_param("limit", 3).await;
    check.assert_status_ok();
    let body: serde_json::Value = check.json();
    assert_eq!(body["allowed"], false);
    assert_eq!(body["remaining"], 0);

    let other = server.post("/api/quota/bob/check").add_query_param("limit", 3).await;
    assert_eq!(other.json::<serde_json::Value>()["allowed"], true);
}

#[tokio::test]
async fn quota_endpoints_reject_bad_limit_with_json_error() {
    let server = server_for(test_state("http://127.0.0.1:9", None));

    for response in [
        server.get("/api/quota/alice?limit=abc").await,
        server.post("/api/quota/alice/check?limit=abc").await,
        server.post("/api/quota/alice/increment?limit=-1").await,
    ] {
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert!(body["error"].is_string());
    }

    // The rejected increment must not have counted.
    let status = server.get("/api/quota/alice").await;
    assert_eq!(status.json::<serde_json::Value>()["used"], 0);
}

// =========================================================================
// /api/assist
// =========================================================================

#[tokio::test]
async fn assist_counts_successful_calls() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("POST", generate_path().as_str())
        .with_status(200)
        .with_body(reply_with_text("Better text."))
        .expect(2)
        .create_async()
        .await;
    let state = test_state(&upstream.url(), Some("secret"));
    let quota = state.quota.clone();
    let server = server_for(state);

    for expected_remaining in [49, 48] {
        let response = server
            .post("/api/assist/alice")
            .json(&json!({"prompt": "make this better"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["suggestion"], "Better text.");
        assert_eq!(body["remaining"], expected_remaining);
    }

    assert_eq!(quota.get_status("alice", 50).used, 2);
}

#[tokio::test]
async fn assist_does_not_count_upstream_failures() {
    let mut upstream = mockito::Server::new_async().await;
    upstream
        .mock("POST", generate_path().as_str())
        .with_status(429)
        .with_body("slow down")
        .create_async()
        .await;
    let state = test_state(&upstream.url(), Some("secret"));
    let quota = state.quota.clone();
    let server = server_for(state);

    let response = server
        .post("/api/assist/alice")
        .json(&json!({"prompt": "hello"}))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(quota.get_status("alice", 50).used, 0);
}

#[tokio::test]
async fn assist_rejects_when_quota_exhausted() {
    let mut upstream = mockito::Server::new_async().await;
    let mock = upstream
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;
    let state = test_state(&upstream.url(), Some("secret")).with_daily_limit(1);
    state.quota.increment_quota("alice");
    let server = server_for(state);

    let response = server
        .post("/api/assist/alice")
        .json(&json!({"prompt": "hello"}))
        .await;

    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("Quota"));
    assert!(body["resetTime"].is_string());
    mock.assert_async().await;
}

#[tokio::test]
async fn assist_without_prompt_returns_400() {
    let server = server_for(test_state("http://127.0.0.1:9", Some("secret")));

    let response = server
        .post("/api/assist/alice")
        .json(&json!({"prompt": "  "}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
