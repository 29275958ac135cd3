use crate::api::{self, handlers::AppState};
use crate::core::models::Asin;
use crate::core::services::CachePolicy;
use crate::infrastructure::store::in_memory::InMemoryBackend;
use crate::tests::{StubApi, TestHarness, asin, create_test_harness, create_test_harness_with};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn router(h: &TestHarness<InMemoryBackend>, tracked: Vec<Asin>) -> Router {
    api::app(AppState {
        cache: h.cache.clone(),
        invalidation: h.invalidation.clone(),
        tracked: Arc::new(tracked),
    })
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let h = create_test_harness();
    let (status, body) = send(router(&h, vec![]), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("OK".to_string()));
}

#[tokio::test]
async fn test_resolve_returns_records_keyed_by_asin() {
    let h = create_test_harness();
    let (status, body) = send(router(&h, vec![]), get("/api/asins?asins=A1,A2")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["A1"]["title"], "Title A1");
    assert_eq!(body["A2"]["purchaseLink"], "https://www.amazon.com/link/A2");
    assert_eq!(body["A2"]["reviewCount"], 12);
    assert_eq!(h.api.product_calls(), 2);
}

#[tokio::test]
async fn test_resolve_defaults_to_tracked_set() {
    let h = create_test_harness();
    let (status, body) = send(router(&h, vec![asin("T1")]), get("/api/asins")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_object().unwrap().len(), 1);
    assert_eq!(body["T1"]["title"], "Title T1");
}

#[tokio::test]
async fn test_resolve_without_keys_is_bad_request() {
    let h = create_test_harness();
    let (status, body) = send(router(&h, vec![]), get("/api/asins")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("none are tracked"));
}

#[tokio::test]
async fn test_get_single_asin() {
    let api = StubApi::new();
    api.fail_product("GONE");
    let h = create_test_harness_with(InMemoryBackend::new(), api, CachePolicy::default());

    let (status, body) = send(router(&h, vec![]), get("/api/asins/A1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Title A1");

    let (status, _) = send(router(&h, vec![]), get("/api/asins/GONE")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalidate_endpoint_returns_fresh_data() {
    let h = create_test_harness();
    let (status, body) = send(
        router(&h, vec![]),
        post_json("/api/asins/invalidate", json!({ "asins": ["A1", "A2", "A1"] })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["invalidatedCount"], 2);
    assert_eq!(body["freshData"]["A1"]["title"], "Title A1");
}

#[tokio::test]
async fn test_invalidate_rejects_empty_list() {
    let h = create_test_harness();
    let (status, _) = send(router(&h, vec![]), post_json("/api/asins/invalidate", json!({ "asins": [] }))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.api.product_calls(), 0);
}

#[tokio::test]
async fn test_expire_endpoint_forces_refetch() {
    let h = create_test_harness();
    send(router(&h, vec![]), get("/api/asins?asins=A1")).await;

    let (status, body) = send(router(&h, vec![]), post_json("/api/asins/expire", json!({ "asins": ["A1"] }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["expiredCount"], 1);

    send(router(&h, vec![]), get("/api/asins?asins=A1")).await;
    assert_eq!(h.api.product_calls(), 2);
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let h = create_test_harness();
    let (status, body) = send(router(&h, vec![]), get("/api-docs/openapi.json")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/asins").is_some());
    assert!(body["paths"].get("/api/asins/invalidate").is_some());
}
