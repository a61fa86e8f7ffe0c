use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use stock_service::service::InventoryService;
use stock_service::store::MemoryStore;
use stock_service::{build_router, AppState};

fn app() -> (Arc<MemoryStore>, Router) {
    let store = Arc::new(MemoryStore::new());
    let inventory = InventoryService::new(store.clone(), "inventory:");
    (store, build_router(AppState::new(inventory, 1_000)))
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_backend() {
    let (store, app) = app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["store"], "memory");

    store.set_available(false);
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[tokio::test]
async fn set_then_get_round_trip() {
    let (_, app) = app();

    let (status, body) = send(
        &app,
        post_json("/inventory", json!({ "productId": "sku-1", "quantity": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "productId": "sku-1", "quantity": 12 }));

    let (status, body) = send(&app, get("/inventory/sku-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["quantity"], 12);
}

#[tokio::test]
async fn unknown_product_is_404() {
    let (_, app) = app();

    let (status, body) = send(&app, get("/inventory/missing")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = send(
        &app,
        post_json("/inventory/decrease", json!({ "productId": "missing", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn negative_quantity_is_400_and_keeps_record() {
    let (_, app) = app();
    send(&app, post_json("/inventory", json!({ "productId": "p", "quantity": 3 }))).await;

    let (status, body) = send(
        &app,
        post_json("/inventory", json!({ "productId": "p", "quantity": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");

    let (_, body) = send(&app, get("/inventory/p")).await;
    assert_eq!(body["data"]["quantity"], 3);
}

#[tokio::test]
async fn malformed_bodies_are_400_with_json_error() {
    let (_, app) = app();
    send(&app, post_json("/inventory", json!({ "productId": "p", "quantity": 5 }))).await;

    let bodies = [
        json!({ "productId": "p" }),
        json!({ "productId": "p", "quantity": "two" }),
        json!({ "productId": "p", "quantity": 1.5 }),
    ];
    for body in bodies {
        for uri in ["/inventory", "/inventory/decrease"] {
            let (status, resp) = send(&app, post_json(uri, body.clone())).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri} {body}");
            assert_eq!(resp["error"], "invalid_argument", "{uri} {body}");
            assert!(resp["message"].is_string(), "{uri} {body}");
        }
    }

    let (status, resp) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/inventory/decrease")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"productId\":"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["error"], "invalid_argument");

    let (_, body) = send(&app, get("/inventory/p")).await;
    assert_eq!(body["data"]["quantity"], 5);
}

#[tokio::test]
async fn decrease_until_insufficient() {
    let (_, app) = app();
    send(&app, post_json("/inventory", json!({ "productId": "p", "quantity": 10 }))).await;

    let (status, body) = send(
        &app,
        post_json("/inventory/decrease", json!({ "productId": "p", "quantity": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({ "productId": "p", "remaining": 0 }));

    let (status, body) = send(
        &app,
        post_json("/inventory/decrease", json!({ "productId": "p", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "insufficient_stock");
    assert_eq!(body["requested"], 1);
    assert_eq!(body["available"], 0);

    let (status, body) = send(
        &app,
        post_json("/inventory/decrease", json!({ "productId": "p", "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
}

#[tokio::test]
async fn store_outage_is_503() {
    let (store, app) = app();
    send(&app, post_json("/inventory", json!({ "productId": "p", "quantity": 10 }))).await;
    store.set_available(false);

    let (status, body) = send(
        &app,
        post_json("/inventory/decrease", json!({ "productId": "p", "quantity": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "store_unavailable");
}

#[tokio::test]
async fn seed_and_stress_endpoints() {
    let (store, app) = app();

    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/seed?count=20")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["seeded"], 20);
    assert_eq!(store.len(), 20);

    let (status, body) = send(
        &app,
        post_json(
            "/api/stress-test",
            json!({ "product_id": "stress-hot", "initial_stock": 30, "concurrency": 8, "attempts_per_worker": 5 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["report"]["conservation_holds"], true);
    assert_eq!(body["report"]["total_attempts"], 40);

    // Seeded catalogue stock is off limits to the drill
    let (_, before) = send(&app, get("/inventory/SKU-00000")).await;
    let (status, body) = send(
        &app,
        post_json("/api/stress-test", json!({ "product_id": "SKU-00000", "initial_stock": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_argument");
    let (_, after) = send(&app, get("/inventory/SKU-00000")).await;
    assert_eq!(after["data"], before["data"]);
}

#[tokio::test]
async fn metrics_track_outcomes() {
    let (_, app) = app();
    send(&app, post_json("/inventory", json!({ "productId": "p", "quantity": 1 }))).await;
    send(&app, get("/inventory/p")).await;
    send(&app, get("/inventory/nope")).await;

    let (status, body) = send(&app, get("/api/metrics/report")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sample_count"], 3);
    let outcomes: Vec<(String, String)> = body["aggregated"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| {
            (
                row["operation"].as_str().unwrap().to_string(),
                row["outcome"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    assert!(outcomes.contains(&("get_stock".to_string(), "not_found".to_string())));
    assert!(outcomes.contains(&("set_stock".to_string(), "ok".to_string())));

    let resp = app.clone().oneshot(get("/api/metrics/export/csv")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv");
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let csv = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(csv.lines().count(), 4);

    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/metrics")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 3);
}
