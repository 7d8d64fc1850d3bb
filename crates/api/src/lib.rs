//! HTTP surface and process wiring for the reconciliation saga.
//!
//! One process hosts both services: the order endpoints and the stock
//! endpoints share an axum router, while the two consumer loops run as
//! background tasks over the injected broker. HTTP handling and message
//! consumption never share a transaction.

pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use broker::{Broker, BrokerError};
use common::{
    EXCHANGE_ORDER_EVENTS, EXCHANGE_STOCK_EVENTS, QUEUE_ORDER_CREATED, QUEUE_ORDER_STOCK_STATUS,
    ROUTING_KEY_ORDER_CREATED, ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED,
};
use orders::{InMemoryOrderStore, OrderService, OrderStore};
use stock::{InMemoryStockStore, StockService, StockStore};

use catalog::{LocalCatalog, ProductCatalog};

/// Shared application state accessible from all handlers.
pub struct AppState<O: OrderStore, S: StockStore> {
    pub orders: Arc<OrderService<O>>,
    pub stock: Arc<StockService<S>>,
    pub catalog: Arc<dyn ProductCatalog>,
    pub broker: Arc<Broker>,
}

/// Declares the exchanges, queues, and bindings the saga runs over.
///
/// Idempotent; run it before publishing or consuming. At startup this goes
/// through the configured retry policy so a slow broker delays the process
/// instead of killing it.
pub async fn declare_topology(broker: &Broker) -> Result<(), BrokerError> {
    broker.declare_exchange(EXCHANGE_ORDER_EVENTS).await;
    broker.declare_exchange(EXCHANGE_STOCK_EVENTS).await;

    broker.declare_queue(QUEUE_ORDER_CREATED).await;
    broker
        .bind_queue(
            QUEUE_ORDER_CREATED,
            EXCHANGE_ORDER_EVENTS,
            ROUTING_KEY_ORDER_CREATED,
        )
        .await?;

    broker.declare_queue(QUEUE_ORDER_STOCK_STATUS).await;
    for key in [ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED] {
        broker
            .bind_queue(QUEUE_ORDER_STOCK_STATUS, EXCHANGE_STOCK_EVENTS, key)
            .await?;
    }

    tracing::info!("broker topology declared");
    Ok(())
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<O: OrderStore + 'static, S: StockStore + 'static>(
    state: Arc<AppState<O, S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/orders", post(routes::orders::create::<O, S>))
        .route("/orders", get(routes::orders::list::<O, S>))
        .route("/orders/{id}", get(routes::orders::get::<O, S>))
        .route("/orders/{id}", put(routes::orders::update::<O, S>))
        .route("/orders/{id}", axum::routing::delete(routes::orders::delete::<O, S>))
        .route("/products", post(routes::products::create::<O, S>))
        .route("/products", get(routes::products::list::<O, S>))
        .route("/products/{id}", get(routes::products::get::<O, S>))
        .route("/products/{id}", put(routes::products::update::<O, S>))
        .route(
            "/products/{id}",
            axum::routing::delete(routes::products::delete::<O, S>),
        )
        .route(
            "/products/{id}/stock",
            put(routes::products::update_stock::<O, S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Builds application state over arbitrary store implementations.
///
/// Without a `catalog`, product names resolve against the in-process stock
/// ledger.
pub fn create_state<O: OrderStore + 'static, S: StockStore + 'static>(
    order_store: O,
    stock_store: S,
    broker: Arc<Broker>,
    catalog: Option<Arc<dyn ProductCatalog>>,
) -> Arc<AppState<O, S>> {
    let orders = Arc::new(OrderService::new(order_store, broker.clone()));
    let stock = Arc::new(StockService::new(stock_store, broker.clone()));
    let catalog = catalog.unwrap_or_else(|| Arc::new(LocalCatalog::new(stock.clone())));

    Arc::new(AppState {
        orders,
        stock,
        catalog,
        broker,
    })
}

/// Creates default state over in-memory stores.
pub fn create_default_state(
    broker: Arc<Broker>,
) -> Arc<AppState<InMemoryOrderStore, InMemoryStockStore>> {
    create_state(
        InMemoryOrderStore::new(),
        InMemoryStockStore::new(),
        broker,
        None,
    )
}

/// Spawns the two consumer loops of the saga.
///
/// Returns their join handles; the tasks run until the broker closes.
pub async fn spawn_listeners<O: OrderStore + 'static, S: StockStore + 'static>(
    state: &Arc<AppState<O, S>>,
) -> Result<(JoinHandle<()>, JoinHandle<()>), BrokerError> {
    let order_created = state.broker.consumer(QUEUE_ORDER_CREATED).await?;
    let stock_outcomes = state.broker.consumer(QUEUE_ORDER_STOCK_STATUS).await?;

    let reconciler = tokio::spawn(stock::run_order_created_listener(
        state.stock.clone(),
        order_created,
    ));
    let converger = tokio::spawn(orders::run_stock_outcome_listener(
        state.orders.clone(),
        stock_outcomes,
    ));

    Ok((reconciler, converger))
}
