//! Product catalog lookups for order enrichment.
//!
//! Order listings show product names next to line items. The catalog is an
//! external collaborator: a lookup failure degrades to a placeholder name
//! and never fails the request.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use serde::Deserialize;
use stock::{StockService, StockStore};
use thiserror::Error;

/// Errors from a catalog lookup.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("product catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-side seam over the product catalog.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Resolves a product's display name.
    async fn product_name(&self, id: ProductId) -> Result<String, CatalogError>;
}

/// Resolves a product name, falling back to a placeholder on any failure.
pub async fn display_name(catalog: &dyn ProductCatalog, id: ProductId) -> String {
    match catalog.product_name(id).await {
        Ok(name) => name,
        Err(error) => {
            tracing::warn!(product_id = %id, error = %error, "product lookup failed");
            format!("Unknown Product (ID: {id})")
        }
    }
}

/// Catalog served by the in-process stock ledger.
pub struct LocalCatalog<S: StockStore> {
    stock: Arc<StockService<S>>,
}

impl<S: StockStore> LocalCatalog<S> {
    pub fn new(stock: Arc<StockService<S>>) -> Self {
        Self { stock }
    }
}

#[async_trait]
impl<S: StockStore> ProductCatalog for LocalCatalog<S> {
    async fn product_name(&self, id: ProductId) -> Result<String, CatalogError> {
        match self.stock.get_product(id).await {
            Ok(Some(product)) => Ok(product.name),
            Ok(None) => Err(CatalogError::NotFound(id)),
            Err(error) => Err(CatalogError::Unavailable(error.to_string())),
        }
    }
}

#[derive(Deserialize)]
struct ProductRecord {
    name: String,
}

/// Catalog backed by a remote product service over HTTP.
pub struct HttpProductCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProductCatalog {
    /// Creates a client against `{base_url}/products/{id}`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn product_name(&self, id: ProductId) -> Result<String, CatalogError> {
        let url = format!("{}/products/{}", self.base_url.trim_end_matches('/'), id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(id));
        }
        if !response.status().is_success() {
            return Err(CatalogError::Unavailable(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let record: ProductRecord = response
            .json()
            .await
            .map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        Ok(record.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker::Broker;
    use common::EXCHANGE_STOCK_EVENTS;
    use stock::InMemoryStockStore;

    async fn local_catalog() -> (
        LocalCatalog<InMemoryStockStore>,
        Arc<StockService<InMemoryStockStore>>,
    ) {
        let broker = Arc::new(Broker::new());
        broker.declare_exchange(EXCHANGE_STOCK_EVENTS).await;
        let service = Arc::new(StockService::new(InMemoryStockStore::new(), broker));
        (LocalCatalog::new(service.clone()), service)
    }

    #[tokio::test]
    async fn local_catalog_resolves_names() {
        let (catalog, service) = local_catalog().await;
        service.store().seed(ProductId::new(10), 5).await;

        let name = catalog.product_name(ProductId::new(10)).await.unwrap();
        assert_eq!(name, "product-10");
    }

    #[tokio::test]
    async fn missing_product_degrades_to_placeholder() {
        let (catalog, _service) = local_catalog().await;

        let name = display_name(&catalog, ProductId::new(99)).await;
        assert_eq!(name, "Unknown Product (ID: 99)");
    }
}
