use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::ProductId;

use crate::error::StockStoreError;
use crate::model::{NewProduct, Product, ProductUpdate};
use crate::store::{Deduction, StockStore};

/// In-memory stock store.
///
/// The write lock over the map stands in for the database row lock: a
/// deduction's read-check-decrement runs entirely under it, so concurrent
/// deductions serialize exactly as they do against PostgreSQL.
#[derive(Clone, Default)]
pub struct InMemoryStockStore {
    products: Arc<RwLock<HashMap<ProductId, Product>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryStockStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product with a fixed id and quantity. Test helper.
    pub async fn seed(&self, id: ProductId, stock_quantity: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id,
            name: format!("product-{id}"),
            description: None,
            price_cents: 1000,
            stock_quantity,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        self.products.write().await.insert(id, product.clone());
        product
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn insert(&self, product: NewProduct) -> Result<Product, StockStoreError> {
        let id = ProductId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let record = Product {
            id,
            name: product.name,
            description: product.description,
            price_cents: product.price_cents,
            stock_quantity: product.stock_quantity,
            image_url: product.image_url,
            created_at: now,
            updated_at: now,
        };

        self.products.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StockStoreError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        let products = self.products.read().await;
        let mut all: Vec<_> = products.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    async fn update(
        &self,
        id: ProductId,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StockStoreError> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            if let Some(name) = changes.name {
                product.name = name;
            }
            if let Some(description) = changes.description {
                product.description = Some(description);
            }
            if let Some(price_cents) = changes.price_cents {
                product.price_cents = price_cents;
            }
            if let Some(stock_quantity) = changes.stock_quantity {
                product.stock_quantity = stock_quantity;
            }
            if let Some(image_url) = changes.image_url {
                product.image_url = Some(image_url);
            }
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn set_quantity(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> Result<Option<Product>, StockStoreError> {
        let mut products = self.products.write().await;
        Ok(products.get_mut(&id).map(|product| {
            product.stock_quantity = quantity;
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StockStoreError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn deduct(&self, id: ProductId, quantity: i64) -> Result<Deduction, StockStoreError> {
        let mut products = self.products.write().await;

        let Some(product) = products.get_mut(&id) else {
            return Ok(Deduction::NotFound);
        };

        if product.stock_quantity < quantity {
            return Ok(Deduction::Insufficient {
                available: product.stock_quantity,
            });
        }

        product.stock_quantity -= quantity;
        product.updated_at = Utc::now();
        Ok(Deduction::Deducted {
            remaining: product.stock_quantity,
        })
    }
}
