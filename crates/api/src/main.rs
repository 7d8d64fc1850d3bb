//! API server entry point.

use std::sync::Arc;

use sqlx::PgPool;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use api::catalog::{HttpProductCatalog, ProductCatalog};
use api::config::Config;
use broker::Broker;
use orders::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use stock::{InMemoryStockStore, PostgresStockStore, StockStore};

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

async fn serve<O: OrderStore + 'static, S: StockStore + 'static>(
    config: Config,
    broker: Arc<Broker>,
    order_store: O,
    stock_store: S,
    metrics_handle: metrics_exporter_prometheus::PrometheusHandle,
) {
    let catalog: Option<Arc<dyn ProductCatalog>> = config
        .product_service_url
        .as_deref()
        .map(|url| Arc::new(HttpProductCatalog::new(url)) as Arc<dyn ProductCatalog>);

    let state = api::create_state(order_store, stock_store, broker.clone(), catalog);

    let (reconciler, converger) = api::spawn_listeners(&state)
        .await
        .expect("failed to start consumer loops");

    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Stop the consumer loops: they drain what is queued, then exit.
    broker.close().await;
    let _ = reconciler.await;
    let _ = converger.await;

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Create the broker and declare topology, retrying at a fixed interval
    let config = Config::from_env();
    let broker = Arc::new(Broker::new());
    config
        .broker_retry()
        .run(|_attempt| api::declare_topology(&broker))
        .await
        .expect("failed to declare broker topology");

    // 4. Pick stores: Postgres when DATABASE_URL is set, in-memory otherwise
    match config.database_url.clone() {
        Some(url) => {
            let pool = config
                .broker_retry()
                .run(|_attempt| PgPool::connect(&url))
                .await
                .expect("failed to connect to database");

            sqlx::migrate!("../../migrations")
                .run(&pool)
                .await
                .expect("failed to run migrations");
            tracing::info!("database migrations applied");

            serve(
                config,
                broker,
                PostgresOrderStore::new(pool.clone()),
                PostgresStockStore::new(pool),
                metrics_handle,
            )
            .await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory stores");
            serve(
                config,
                broker,
                InMemoryOrderStore::new(),
                InMemoryStockStore::new(),
                metrics_handle,
            )
            .await;
        }
    }
}
