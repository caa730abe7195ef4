use api::{AppState, create_router};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode}
};
use config::Config;
use pipeline::{Orchestrator, RateLimiter};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GENERATE_PATH: &str = "/models/gemini-pro:generateContent";

async fn app(server: &MockServer, tweak: impl FnOnce(&mut Config)) -> Router {
    let mut config = Config::default();
    config.content.base_url = server.uri();
    config.content.api_key = Some("gemini-key".to_string());
    config.documents.base_url = format!("{}/generations", server.uri());
    config.documents.api_key = Some("gamma-key".to_string());
    config.documents.poll_attempts = 0;
    tweak(&mut config);

    let limiter = Arc::new(RateLimiter::from_config(&config.rate_limit));
    let orchestrator = tokio_test::assert_ok!(Orchestrator::from_config(&config, limiter));
    create_router(AppState::new(Arc::new(orchestrator)))
}

async fn mount_generators(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "# Welcome\n---\n# Muda"}]}}]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generations"))
        .and(body_partial_json(json!({"format": "presentation"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "deck-1",
            "url": "https://gamma.app/docs/deck-1"
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/generations"))
        .and(body_partial_json(json!({"format": "document"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "guide-1",
            "url": "https://gamma.app/docs/guide-1"
        })))
        .mount(server)
        .await;
}

fn form(email: &str) -> Value {
    json!({
        "formData": {
            "email": email,
            "topic": "waste-elimination",
            "level": "beginner",
            "duration": 60,
            "industry": "manufacturing"
        }
    })
}

fn generate_request(body: &Value, ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .header("x-forwarded-for", ip)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let server = MockServer::start().await;
    let app = app(&server, |_| {}).await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_generate_success() {
    let server = MockServer::start().await;
    mount_generators(&server).await;
    let app = app(&server, |_| {}).await;

    let response = app
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "5");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    assert!(response.headers().contains_key("x-ratelimit-reset"));

    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["slideDeckUrl"], "https://gamma.app/docs/deck-1");
    assert_eq!(body["instructorGuideUrl"], "https://gamma.app/docs/guide-1");
    assert_eq!(body["provisional"], false);
    assert_eq!(body["usage"]["generationsUsed"], 1);
    assert_eq!(body["usage"]["remainingGenerations"], 2);
    assert!(body["generationId"].is_string());
}

#[tokio::test]
async fn test_generate_rejects_invalid_form_without_consuming_budget() {
    let server = MockServer::start().await;
    let app = app(&server, |_| {}).await;

    let mut body = form("not-an-email");
    body["formData"]["duration"] = json!(45);
    let response = app
        .oneshot(generate_request(&body, "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "5");

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["details"]["fields"]["email"].is_array());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_generate_rejects_malformed_body() {
    let server = MockServer::start().await;
    let app = app(&server, |_| {}).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["details"]["fields"]["formData"].is_array());
}

#[tokio::test]
async fn test_generate_rate_limited_per_address() {
    let server = MockServer::start().await;
    mount_generators(&server).await;
    let app = app(&server, |c| {
        c.rate_limit.max_requests = 1;
        c.quota.max_free_generations = 10;
    })
    .await;

    let first = app
        .clone()
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .clone()
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(second.headers()["x-ratelimit-remaining"], "0");
    let body = body_json(second).await;
    assert_eq!(body["error"]["code"], "RATE_LIMIT_EXCEEDED");
    assert!(body["details"]["resetAt"].is_i64());

    let other_address = app
        .oneshot(generate_request(&form("lean@example.com"), "198.51.100.4"))
        .await
        .unwrap();
    assert_eq!(other_address.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generate_quota_exhausted() {
    let server = MockServer::start().await;
    mount_generators(&server).await;
    let app = app(&server, |c| c.quota.max_free_generations = 1).await;

    let first = app
        .clone()
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let second = app
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::FORBIDDEN);
    let body = body_json(second).await;
    assert_eq!(body["error"]["code"], "QUOTA_EXCEEDED");
    assert_eq!(body["details"]["generationsUsed"], 1);
}

#[tokio::test]
async fn test_generate_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend unavailable"))
        .mount(&server)
        .await;
    let app = app(&server, |_| {}).await;

    let response = app
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "4");
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
}

#[tokio::test]
async fn test_usage_requires_email() {
    let server = MockServer::start().await;
    let app = app(&server, |_| {}).await;

    let missing = app.clone().oneshot(get("/api/usage")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert!(missing.headers().contains_key("x-ratelimit-limit"));
    let body = body_json(missing).await;
    assert_eq!(body["error"]["message"], "Email parameter is required");

    let invalid = app.oneshot(get("/api/usage?email=nope")).await.unwrap();
    assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_usage_reports_quota_and_is_rate_limited() {
    let server = MockServer::start().await;
    let app = app(&server, |c| c.rate_limit.max_requests = 2).await;

    let first = app
        .clone()
        .oneshot(get("/api/usage?email=lean%40example.com"))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()["x-ratelimit-remaining"], "1");
    let body = body_json(first).await;
    assert_eq!(
        body,
        json!({
            "generationsUsed": 0,
            "maxGenerations": 3,
            "remainingGenerations": 3,
            "hasExceededLimit": false
        })
    );

    let second = app
        .clone()
        .oneshot(get("/api/usage?email=lean%40example.com"))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let third = app
        .oneshot(get("/api/usage?email=lean%40example.com"))
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let server = MockServer::start().await;
    let app = app(&server, |_| {}).await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unreachable_upstream_does_not_expose_api_key() {
    let server = MockServer::start().await;
    let app = app(&server, |c| {
        c.content.base_url = "http://127.0.0.1:1".to_string();
        c.content.api_key = Some("very-secret-key".to_string());
    })
    .await;

    let response = app
        .oneshot(generate_request(&form("lean@example.com"), "203.0.113.9"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "EXTERNAL_SERVICE_ERROR");
    assert!(!body.to_string().contains("very-secret-key"));
}
