use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use common::ProductId;

use crate::error::StockStoreError;
use crate::model::{NewProduct, Product, ProductUpdate};
use crate::store::{Deduction, StockStore};

const PRODUCT_COLUMNS: &str =
    "product_id, name, description, price_cents, stock_quantity, image_url, created_at, updated_at";

/// PostgreSQL-backed stock store.
///
/// Deduction runs one transaction per call: `SELECT ... FOR UPDATE` takes the
/// row lock, the availability check and decrement happen under it, and the
/// lock is released at commit/rollback. The lock is never held across a
/// broker call.
#[derive(Clone)]
pub struct PostgresStockStore {
    pool: PgPool,
}

impl PostgresStockStore {
    /// Creates a new PostgreSQL stock store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_product(row: PgRow) -> Result<Product, StockStoreError> {
        Ok(Product {
            id: ProductId::new(row.try_get("product_id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price_cents: row.try_get("price_cents")?,
            stock_quantity: row.try_get("stock_quantity")?,
            image_url: row.try_get("image_url")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    async fn insert(&self, product: NewProduct) -> Result<Product, StockStoreError> {
        let row = sqlx::query(&format!(
            "INSERT INTO products (name, description, price_cents, stock_quantity, image_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(&product.image_url)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StockStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE product_id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn list(&self) -> Result<Vec<Product>, StockStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY product_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn update(
        &self,
        id: ProductId,
        changes: ProductUpdate,
    ) -> Result<Option<Product>, StockStoreError> {
        if changes.is_empty() {
            return self.get(id).await;
        }

        let mut updates = Vec::new();
        let mut param = 0;

        if changes.name.is_some() {
            param += 1;
            updates.push(format!("name = ${param}"));
        }
        if changes.description.is_some() {
            param += 1;
            updates.push(format!("description = ${param}"));
        }
        if changes.price_cents.is_some() {
            param += 1;
            updates.push(format!("price_cents = ${param}"));
        }
        if changes.stock_quantity.is_some() {
            param += 1;
            updates.push(format!("stock_quantity = ${param}"));
        }
        if changes.image_url.is_some() {
            param += 1;
            updates.push(format!("image_url = ${param}"));
        }

        let sql = format!(
            "UPDATE products SET {}, updated_at = NOW() WHERE product_id = ${} RETURNING {PRODUCT_COLUMNS}",
            updates.join(", "),
            param + 1
        );

        let mut query = sqlx::query(&sql);
        if let Some(name) = changes.name {
            query = query.bind(name);
        }
        if let Some(description) = changes.description {
            query = query.bind(description);
        }
        if let Some(price_cents) = changes.price_cents {
            query = query.bind(price_cents);
        }
        if let Some(stock_quantity) = changes.stock_quantity {
            query = query.bind(stock_quantity);
        }
        if let Some(image_url) = changes.image_url {
            query = query.bind(image_url);
        }

        let row = query.bind(id.as_i64()).fetch_optional(&self.pool).await?;
        row.map(Self::row_to_product).transpose()
    }

    async fn set_quantity(
        &self,
        id: ProductId,
        quantity: i64,
    ) -> Result<Option<Product>, StockStoreError> {
        let row = sqlx::query(&format!(
            "UPDATE products SET stock_quantity = $1, updated_at = NOW() \
             WHERE product_id = $2 RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(quantity)
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StockStoreError> {
        let result = sqlx::query("DELETE FROM products WHERE product_id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn deduct(&self, id: ProductId, quantity: i64) -> Result<Deduction, StockStoreError> {
        let mut tx = self.pool.begin().await?;

        // Blocks concurrent deductions against the same row until this
        // transaction settles.
        let available: Option<i64> = sqlx::query_scalar(
            "SELECT stock_quantity FROM products WHERE product_id = $1 FOR UPDATE",
        )
        .bind(id.as_i64())
        .fetch_optional(&mut *tx)
        .await?;

        match available {
            None => {
                tx.rollback().await?;
                Ok(Deduction::NotFound)
            }
            Some(available) if available < quantity => {
                tx.rollback().await?;
                Ok(Deduction::Insufficient { available })
            }
            Some(_) => {
                let remaining: i64 = sqlx::query_scalar(
                    "UPDATE products SET stock_quantity = stock_quantity - $1, updated_at = NOW() \
                     WHERE product_id = $2 RETURNING stock_quantity",
                )
                .bind(quantity)
                .bind(id.as_i64())
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok(Deduction::Deducted { remaining })
            }
        }
    }
}
