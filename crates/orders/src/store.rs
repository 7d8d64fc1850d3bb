use async_trait::async_trait;

use common::{CustomerId, OrderId, OrderLine, OrderStatus};

use crate::error::OrderStoreError;
use crate::model::Order;

/// A validated order ready for insertion.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
}

/// Result of a conditional terminal-status update.
#[derive(Debug, Clone, PartialEq)]
pub enum Finalize {
    /// The order was pending and has been moved to the terminal status.
    Updated(Order),
    /// The order already carries a terminal status; nothing was changed.
    AlreadySettled(OrderStatus),
    /// No order exists under that id.
    NotFound,
}

/// Persistence seam for the order ledger.
///
/// All implementations must be thread-safe (Send + Sync). The conditional
/// [`finalize`](OrderStore::finalize) is the only path the saga uses to
/// mutate status, so repeated event delivery cannot resurrect a terminal
/// order.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts a new order with status PENDING_STOCK_CHECK and a
    /// server-assigned id.
    async fn insert(&self, order: NewOrder) -> Result<Order, OrderStoreError>;

    /// Loads an order by id.
    async fn get(&self, id: OrderId) -> Result<Option<Order>, OrderStoreError>;

    /// Lists all orders, oldest first.
    async fn list(&self) -> Result<Vec<Order>, OrderStoreError>;

    /// Moves a PENDING_STOCK_CHECK order to a terminal status.
    ///
    /// The update applies only while the order is still pending; anything
    /// else reports what was found instead of overwriting it.
    async fn finalize(&self, id: OrderId, status: OrderStatus)
    -> Result<Finalize, OrderStoreError>;

    /// Unconditionally sets an order's status (manual/operator path).
    async fn set_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Option<Order>, OrderStoreError>;

    /// Deletes an order. Returns false if it did not exist.
    async fn delete(&self, id: OrderId) -> Result<bool, OrderStoreError>;
}
