//! Integration tests for the HTTP surface.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

use api::AppState;
use broker::Broker;
use common::QUEUE_ORDER_CREATED;
use orders::InMemoryOrderStore;
use stock::InMemoryStockStore;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

async fn setup() -> (
    axum::Router,
    Arc<AppState<InMemoryOrderStore, InMemoryStockStore>>,
) {
    let broker = Arc::new(Broker::new());
    api::declare_topology(&broker).await.unwrap();

    let state = api::create_default_state(broker);
    let app = api::create_app(state.clone(), get_metrics_handle());
    (app, state)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn put_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup().await;

    let response = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_order_is_accepted_as_pending() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customer_id": 1,
                "items": [{"product_id": 10, "quantity": 2}]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_json(response).await;
    assert_eq!(json["order"]["status"], "PENDING_STOCK_CHECK");
    assert_eq!(json["order"]["customer_id"], 1);
    assert!(json["detail"].as_str().unwrap().contains("asynchronously"));

    // The admission event is waiting for the reconciliation consumer.
    assert_eq!(
        state.broker.queue_depth(QUEUE_ORDER_CREATED).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_create_order_with_empty_items_is_rejected() {
    let (app, state) = setup().await;

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({"customer_id": 1, "items": []}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert!(json["detail"].as_str().unwrap().contains("at least one item"));

    // No side effects: no order row, no event.
    assert_eq!(state.orders.list_orders().await.unwrap().len(), 0);
    assert_eq!(
        state.broker.queue_depth(QUEUE_ORDER_CREATED).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_create_order_without_customer_is_rejected() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({"items": [{"product_id": 10, "quantity": 2}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_create_order_with_zero_quantity_is_rejected() {
    let (app, _) = setup().await;

    let response = app
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customer_id": 1,
                "items": [{"product_id": 10, "quantity": 0}]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_get_missing_order_is_404() {
    let (app, _) = setup().await;

    let response = app.oneshot(get("/orders/999")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_order_listing_resolves_product_names() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            serde_json::json!({
                "name": "Widget",
                "price_cents": 1000,
                "stock_quantity": 5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = body_json(response).await;
    let product_id = product["product_id"].as_i64().unwrap();

    app.clone()
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customer_id": 1,
                "items": [
                    {"product_id": product_id, "quantity": 2},
                    {"product_id": 424242, "quantity": 1}
                ]
            }),
        ))
        .await
        .unwrap();

    let response = app.oneshot(get("/orders")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json[0]["items"][0]["name"], "Widget");
    assert_eq!(json[0]["items"][1]["name"], "Unknown Product (ID: 424242)");
}

#[tokio::test]
async fn test_manual_cancellation() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/orders",
            serde_json::json!({
                "customer_id": 1,
                "items": [{"product_id": 10, "quantity": 2}]
            }),
        ))
        .await
        .unwrap();
    let order_id = body_json(response).await["order"]["order_id"]
        .as_i64()
        .unwrap();

    let response = app
        .clone()
        .oneshot(put_json(
            &format!("/orders/{order_id}"),
            serde_json::json!({"status": "CANCELLED"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "CANCELLED");

    // Unknown status strings never reach the store.
    let response = app
        .oneshot(put_json(
            &format!("/orders/{order_id}"),
            serde_json::json!({"status": "SHIPPED"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_product_crud_roundtrip() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            serde_json::json!({
                "name": "Widget",
                "description": "A widget",
                "price_cents": 1000,
                "stock_quantity": 5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let product = body_json(response).await;
    let id = product["product_id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(put_json(
            &format!("/products/{id}"),
            serde_json::json!({"name": "Renamed"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["stock_quantity"], 5);

    let response = app
        .clone()
        .oneshot(get(&format!("/products/{id}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/products/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get(&format!("/products/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_product_validation() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            serde_json::json!({
                "name": "Widget",
                "price_cents": 0,
                "stock_quantity": 5
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(post_json(
            "/products",
            serde_json::json!({
                "name": "Widget",
                "price_cents": 1000,
                "stock_quantity": -1
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_manual_stock_adjustment() {
    let (app, _) = setup().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/products",
            serde_json::json!({
                "name": "Widget",
                "price_cents": 1000,
                "stock_quantity": 5
            }),
        ))
        .await
        .unwrap();
    let id = body_json(response).await["product_id"].as_i64().unwrap();

    let response = app
        .oneshot(put_json(
            &format!("/products/{id}/stock?stock_quantity=0"),
            serde_json::json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["stock_quantity"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup().await;

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
