use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{OrderId, OrderStatus};

use crate::error::OrderStoreError;
use crate::model::Order;
use crate::store::{Finalize, NewOrder, OrderStore};

/// In-memory order store.
///
/// Assigns monotonic ids from an atomic counter and provides the same
/// interface as the PostgreSQL implementation. Used for tests and for
/// running the process without a database.
#[derive(Clone, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<OrderId, Order>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryOrderStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored orders.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn insert(&self, order: NewOrder) -> Result<Order, OrderStoreError> {
        let id = OrderId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let now = Utc::now();
        let record = Order {
            id,
            customer_id: order.customer_id,
            items: order.items,
            status: OrderStatus::PendingStockCheck,
            created_at: now,
            updated_at: now,
        };

        self.orders.write().await.insert(id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, OrderStoreError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Order>, OrderStoreError> {
        let orders = self.orders.read().await;
        let mut all: Vec<_> = orders.values().cloned().collect();
        all.sort_by_key(|o| o.id);
        Ok(all)
    }

    async fn finalize(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Finalize, OrderStoreError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(&id) {
            None => Ok(Finalize::NotFound),
            Some(order) if order.status != OrderStatus::PendingStockCheck => {
                Ok(Finalize::AlreadySettled(order.status))
            }
            Some(order) => {
                order.status = status;
                order.updated_at = Utc::now();
                Ok(Finalize::Updated(order.clone()))
            }
        }
    }

    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError> {
        let mut orders = self.orders.write().await;
        Ok(orders.get_mut(&id).map(|order| {
            order.status = status;
            order.updated_at = Utc::now();
            order.clone()
        }))
    }

    async fn delete(&self, id: OrderId) -> Result<bool, OrderStoreError> {
        Ok(self.orders.write().await.remove(&id).is_some())
    }
}
