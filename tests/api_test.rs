//! HTTP API tests
//!
//! Drives the router in-process with `tower::ServiceExt::oneshot`, so no
//! listener or network access is needed.

use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use prompt_reverse::config::ServiceConfig;
use prompt_reverse::server::{create_router, AppState};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceExt;

const SAMPLE: &str = "Step 1: Think. Step 2: Return JSON {\"a\":1}";

fn app_with(config: ServiceConfig) -> Router {
    create_router(Arc::new(AppState::new(config)))
}

fn app() -> Router {
    app_with(ServiceConfig::baseline())
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `POST /reverse` as if it arrived from `peer` with the given forwarded header
fn from_peer(peer: &str, forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/reverse")
        .header("content-type", "application/json");
    if let Some(forwarded) = forwarded_for {
        builder = builder.header("x-forwarded-for", forwarded);
    }
    let mut request = builder
        .body(Body::from(json!({ "output_text": SAMPLE }).to_string()))
        .unwrap();
    let addr: SocketAddr = format!("{}:40000", peer).parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

/// Drops the per-request fields so two analyses of one text compare equal
fn analysis_only(mut body: Value) -> Value {
    let fields = body.as_object_mut().unwrap();
    fields.remove("request_id");
    fields.remove("cached");
    body
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["app"], "Prompt Reverse Engineer");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_reverse_returns_analysis() {
    let app = app();
    let (status, body) = send(&app, post_json("/reverse", json!({ "output_text": SAMPLE }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cached"], false);
    assert!(!body["request_id"].as_str().unwrap().is_empty());
    let constraints = body["constraints_detected"].as_array().unwrap();
    assert!(constraints.contains(&json!("json_format")));
    assert!(constraints.contains(&json!("stepwise")));
    assert_eq!(body["reasoning_trace"].as_array().unwrap().len(), 7);
    let confidence = body["confidence_score"].as_f64().unwrap();
    assert!((0.03..=0.99).contains(&confidence));
}

#[tokio::test]
async fn test_repeat_request_is_served_from_cache() {
    let app = app();
    let payload = json!({ "output_text": SAMPLE, "deterministic": true, "seed": 7 });

    let (_, first) = send(&app, post_json("/reverse", payload.clone())).await;
    let (status, second) = send(&app, post_json("/reverse", payload)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_ne!(first["request_id"], second["request_id"]);
    assert_eq!(first["confidence_score"], second["confidence_score"]);
    assert_eq!(first["inferred_prompt"], second["inferred_prompt"]);
}

#[tokio::test]
async fn test_short_text_is_rejected() {
    let app = app();
    let (status, body) = send(&app, post_json("/reverse", json!({ "output_text": "too short" }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["detail"],
        "output_text must be at least 20 characters"
    );
}

#[tokio::test]
async fn test_negative_seed_is_rejected() {
    let app = app();
    let payload = json!({ "output_text": SAMPLE, "deterministic": true, "seed": -1 });
    let (status, body) = send(&app, post_json("/reverse", payload)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_malformed_json_has_detail() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/reverse")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert!(status.is_client_error());
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_batch_preserves_order() {
    let app = app();
    let first = "```python\ndef add(a,b): return a+b\n```";
    let second = "Therefore, moreover, hence in summary, this is formal.";
    let payload = json!({
        "items": [
            { "output_text": first },
            { "output_text": second }
        ]
    });
    let (status, body) = send(&app, post_json("/reverse/batch", payload)).await;

    assert_eq!(status, StatusCode::OK);
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["task_type"], "code");
    assert_eq!(results[1]["temperature_estimate"], "low");

    // Each item matches what /reverse returns for the same text on its own
    for (text, item) in [first, second].into_iter().zip(results) {
        let (status, single) =
            send(&crate::app(), post_json("/reverse", json!({ "output_text": text }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(analysis_only(item.clone()), analysis_only(single), "{}", text);
    }
}

#[tokio::test]
async fn test_rejected_batch_is_not_billed_or_cached() {
    let mut config = ServiceConfig::baseline();
    config.max_unique_texts_per_minute = 1;
    let state = Arc::new(AppState::new(config));
    let app = create_router(Arc::clone(&state));

    let payload = json!({
        "items": [
            { "output_text": "The first item explains the release notes." },
            { "output_text": "The second item summarizes the incident report." }
        ]
    });
    let (status, body) = send(&app, post_json("/reverse/batch", payload)).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "rate_limit_exceeded");
    assert_eq!(state.usage.call_count(), 0);
    assert!(state.usage.usage_log().is_empty());
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_batch_over_quota_is_not_billed() {
    let mut config = ServiceConfig::baseline();
    config.per_user_quota_per_minute = 2;
    let state = Arc::new(AppState::new(config));
    let app = create_router(Arc::clone(&state));

    let items: Vec<Value> = (0..3)
        .map(|i| json!({ "output_text": format!("Item number {} explains something useful.", i) }))
        .collect();
    let (status, body) = send(&app, post_json("/reverse/batch", json!({ "items": items }))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "quota_exceeded");
    assert_eq!(state.usage.call_count(), 0);
    assert!(state.cache.is_empty());
}

#[tokio::test]
async fn test_oversized_batch_is_rejected() {
    let mut config = ServiceConfig::baseline();
    config.max_batch_items = 2;
    let app = app_with(config);

    let items: Vec<Value> = (0..3)
        .map(|i| json!({ "output_text": format!("Item number {} explains something useful.", i) }))
        .collect();
    let (status, body) = send(&app, post_json("/reverse/batch", json!({ "items": items }))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"], "batch size exceeds limit of 2");
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let mut config = ServiceConfig::baseline();
    config.max_requests_per_minute = 2;
    let app = app_with(config);

    assert_eq!(send(&app, from_peer("198.51.100.1", None)).await.0, StatusCode::OK);
    assert_eq!(send(&app, from_peer("198.51.100.1", None)).await.0, StatusCode::OK);

    let (status, body) = send(&app, from_peer("198.51.100.1", None)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "rate_limit_exceeded");

    // Other clients keep their own window
    assert_eq!(send(&app, from_peer("198.51.100.2", None)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_shares_peer_window() {
    let mut config = ServiceConfig::baseline();
    config.max_requests_per_minute = 1;
    let app = app_with(config);

    assert_eq!(
        send(&app, from_peer("198.51.100.7", Some("10.0.0.0"))).await.0,
        StatusCode::OK
    );
    for i in 1..5 {
        let forwarded = format!("10.0.0.{}", i);
        let (status, body) = send(&app, from_peer("198.51.100.7", Some(&forwarded))).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "{}", forwarded);
        assert_eq!(body["detail"], "rate_limit_exceeded");
    }
}

#[tokio::test]
async fn test_trusted_forwarded_for_keys_each_client() {
    let mut config = ServiceConfig::baseline();
    config.max_requests_per_minute = 1;
    config.trust_forwarded_for = true;
    let app = app_with(config);

    // One proxy address, distinct clients behind it
    for i in 0..3 {
        let forwarded = format!("10.0.0.{}, 192.0.2.1", i);
        let (status, _) = send(&app, from_peer("192.0.2.1", Some(&forwarded))).await;
        assert_eq!(status, StatusCode::OK, "{}", forwarded);
    }
    let (status, _) = send(&app, from_peer("192.0.2.1", Some("10.0.0.0"))).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_user_quota() {
    let mut config = ServiceConfig::baseline();
    config.per_user_quota_per_minute = 1;
    let app = app_with(config);

    let request = || {
        Request::builder()
            .method("POST")
            .uri("/reverse")
            .header("content-type", "application/json")
            .header("x-user-id", "user-42")
            .body(Body::from(json!({ "output_text": SAMPLE }).to_string()))
            .unwrap()
    };

    assert_eq!(send(&app, request()).await.0, StatusCode::OK);
    let (status, body) = send(&app, request()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["detail"], "quota_exceeded");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/reverse")
        .header("content-type", "application/json")
        .header("x-request-id", "req-abc-123")
        .body(Body::from(json!({ "output_text": SAMPLE }).to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-abc-123");

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["request_id"], "req-abc-123");
}

#[tokio::test]
async fn test_metrics_track_endpoints() {
    let app = app();
    send(&app, post_json("/reverse", json!({ "output_text": SAMPLE }))).await;
    send(&app, post_json("/reverse", json!({ "output_text": SAMPLE }))).await;

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["/reverse"]["count"], 2);
    assert!(body["/reverse"]["avg_ms"].as_f64().unwrap() >= 0.0);
    assert!(body.get("/reverse/batch").is_none());
}
