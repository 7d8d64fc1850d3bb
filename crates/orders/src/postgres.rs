use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use common::{CustomerId, OrderId, OrderLine, OrderStatus};

use crate::error::OrderStoreError;
use crate::model::Order;
use crate::store::{Finalize, NewOrder, OrderStore};

const ORDER_COLUMNS: &str = "order_id, customer_id, items, status, created_at, updated_at";

/// PostgreSQL-backed order store.
///
/// Line items live in a JSONB column; ids come from the BIGSERIAL sequence.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_order(row: PgRow) -> Result<Order, OrderStoreError> {
        let items_json: serde_json::Value = row.try_get("items")?;
        let items: Vec<OrderLine> = serde_json::from_value(items_json)?;

        let status: String = row.try_get("status")?;
        let status = status
            .parse::<OrderStatus>()
            .map_err(|e| OrderStoreError::UnknownStatus(e.0))?;

        Ok(Order {
            id: OrderId::new(row.try_get("order_id")?),
            customer_id: CustomerId::new(row.try_get("customer_id")?),
            items,
            status,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let items = serde_json::to_value(&order.items)?;

        let row = sqlx::query(&format!(
            "INSERT INTO orders (customer_id, items, status) \
             VALUES ($1, $2, $3) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order.customer_id.as_i64())
        .bind(items)
        .bind(OrderStatus::PendingStockCheck.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_order(row)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, OrderStoreError> {
        let row = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY order_id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn finalize(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Finalize, OrderStoreError> {
        // Conditional on the pending status so a duplicate or late event
        // cannot overwrite a terminal order.
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $1, updated_at = NOW() \
             WHERE order_id = $2 AND status = $3 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id.as_i64())
        .bind(OrderStatus::PendingStockCheck.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Finalize::Updated(Self::row_to_order(row)?)),
            None => match self.get(id).await? {
                Some(existing) => Ok(Finalize::AlreadySettled(existing.status)),
                None => Ok(Finalize::NotFound),
            },
        }
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError> {
        let row = sqlx::query(&format!(
            "UPDATE orders SET status = $1, updated_at = NOW() \
             WHERE order_id = $2 RETURNING {ORDER_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn delete(&self, id: OrderId) -> Result<bool, OrderStoreError> {
        let result = sqlx::query("DELETE FROM orders WHERE order_id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
