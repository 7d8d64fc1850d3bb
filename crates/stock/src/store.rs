use async_trait::async_trait;

use common::ProductId;

use crate::error::StockStoreError;
use crate::model::{NewProduct, Product, ProductUpdate};

/// Result of one locked read-check-decrement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deduction {
    /// The decrement committed; `remaining` is the quantity left.
    Deducted { remaining: i64 },
    /// The row holds less than requested; nothing committed.
    Insufficient { available: i64 },
    /// No product row exists under that id.
    NotFound,
}

/// Persistence seam for the stock ledger.
///
/// [`deduct`](StockStore::deduct) is the saga's only mutation path: one
/// transaction per line item that reads the row under an exclusive lock,
/// checks availability, and decrements. Concurrent deductions against the
/// same product serialize on that lock, so the quantity can never go
/// negative. The remaining operations are the catalog CRUD surface.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Inserts a new product with a server-assigned id.
    async fn insert(&self, product: NewProduct) -> Result<Product, StockStoreError>;

    /// Loads a product by id.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StockStoreError>;

    /// Lists all products, oldest first.
    async fn list(&self) -> Result<Vec<Product>, StockStoreError>;

    /// Applies a partial update. Returns None if the product does not exist.
    async fn update(
        &self,
        id: ProductId,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StockStoreError>;

    /// Sets the stock quantity directly (manual adjustment path).
    async fn set_quantity(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> Result<Option<Product>, StockStoreError>;

    /// Deletes a product. Returns false if it did not exist.
    async fn delete(&self, id: ProductId) -> Result<bool, StockStoreError>;

    /// Atomically deducts `quantity` units while holding the row lock.
    async fn deduct(&self, id: ProductId, quantity: i64) -> Result<Deduction, StockStoreError>;
}
