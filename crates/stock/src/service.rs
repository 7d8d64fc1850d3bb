//! Stock service: catalog operations and order reconciliation.

use std::sync::Arc;

use broker::{Broker, BrokerError, Message};
use chrono::Utc;
use common::{
    EXCHANGE_STOCK_EVENTS, ItemDisposition, ItemOutcome, OrderCreatedEvent, OutcomeStatus,
    ProductId, StockOutcomeEvent,
};

use crate::error::{ProductValidationError, StockError};
use crate::model::{NewProduct, Product, ProductUpdate};
use crate::store::{Deduction, StockStore};

/// Below this remaining quantity a restock warning is logged after a
/// successful deduction.
pub const RESTOCK_THRESHOLD: i64 = 5;

/// Service for the stock ledger.
pub struct StockService<S: StockStore> {
    store: S,
    broker: Arc<Broker>,
}

impl<S: StockStore> StockService<S> {
    /// Creates a new stock service.
    pub fn new(store: S, broker: Arc<Broker>) -> Self {
        Self { store, broker }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one reconciliation attempt for an order-created event.
    ///
    /// Line items are processed strictly in list order, one locked
    /// transaction each. An item that fails does not abort the rest, and
    /// items already deducted stay deducted even when a later item fails;
    /// the outcome event records both sides. Errors here are store faults
    /// only — insufficient stock and unknown products are outcomes, not
    /// errors.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn process_order_created(
        &self,
        event: &OrderCreatedEvent,
    ) -> Result<StockOutcomeEvent, StockError> {
        let started = std::time::Instant::now();
        let mut outcomes = Vec::with_capacity(event.items.len());
        let mut all_deducted = true;

        for line in &event.items {
            let outcome = match self.store.deduct(line.product_id, line.quantity).await? {
                Deduction::Deducted { remaining } => {
                    metrics::counter!("stock_deductions_total").increment(1);
                    tracing::info!(
                        product_id = %line.product_id,
                        quantity = line.quantity,
                        remaining,
                        "stock deducted"
                    );
                    if remaining < RESTOCK_THRESHOLD {
                        tracing::warn!(
                            product_id = %line.product_id,
                            remaining,
                            "restock needed"
                        );
                    }
                    ItemOutcome {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        status: ItemDisposition::Deducted,
                        message: "stock deducted".to_string(),
                    }
                }
                Deduction::Insufficient { available } => {
                    all_deducted = false;
                    metrics::counter!("stock_deduction_failures_total").increment(1);
                    tracing::warn!(
                        product_id = %line.product_id,
                        requested = line.quantity,
                        available,
                        "insufficient stock"
                    );
                    ItemOutcome {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        status: ItemDisposition::Failed,
                        message: format!(
                            "insufficient stock: requested {}, available {available}",
                            line.quantity
                        ),
                    }
                }
                Deduction::NotFound => {
                    all_deducted = false;
                    metrics::counter!("stock_deduction_failures_total").increment(1);
                    tracing::warn!(product_id = %line.product_id, "product not found");
                    ItemOutcome {
                        product_id: line.product_id,
                        quantity: line.quantity,
                        status: ItemDisposition::Failed,
                        message: "product not found".to_string(),
                    }
                }
            };
            outcomes.push(outcome);
        }

        let (status, message) = if all_deducted {
            (OutcomeStatus::Success, "stock deducted for all items")
        } else {
            (OutcomeStatus::Failure, "stock deduction failed for some items")
        };

        metrics::histogram!("stock_reconciliation_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        Ok(StockOutcomeEvent {
            order_id: event.order_id,
            items: outcomes,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Publishes a reconciliation outcome under its routing key.
    pub async fn publish_outcome(&self, outcome: &StockOutcomeEvent) -> Result<(), BrokerError> {
        let message = Message::json(outcome.routing_key(), outcome)?;
        self.broker.publish(EXCHANGE_STOCK_EVENTS, message).await?;
        tracing::info!(
            order_id = %outcome.order_id,
            routing_key = outcome.routing_key(),
            "published stock outcome"
        );
        Ok(())
    }

    // Catalog surface

    /// Creates a product after validating price and stock.
    #[tracing::instrument(skip(self, product))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product, StockError> {
        if product.price_cents <= 0 {
            return Err(ProductValidationError::InvalidPrice.into());
        }
        if product.stock_quantity < 0 {
            return Err(ProductValidationError::NegativeStock.into());
        }
        Ok(self.store.insert(product).await?)
    }

    /// Loads a product by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Option<Product>, StockError> {
        Ok(self.store.get(id).await?)
    }

    /// Lists all products.
    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<Product>, StockError> {
        Ok(self.store.list().await?)
    }

    /// Applies a partial product update.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        id: ProductId,
        changes: ProductUpdate,
    ) -> Result<Product, StockError> {
        if let Some(price_cents) = changes.price_cents
            && price_cents <= 0
        {
            return Err(ProductValidationError::InvalidPrice.into());
        }
        if let Some(stock_quantity) = changes.stock_quantity
            && stock_quantity < 0
        {
            return Err(ProductValidationError::NegativeStock.into());
        }

        self.store
            .update(id, changes)
            .await?
            .ok_or(StockError::NotFound(id))
    }

    /// Sets stock directly (manual adjustment, outside the saga's lock path).
    #[tracing::instrument(skip(self))]
    pub async fn set_stock(&self, id: ProductId, quantity: i64) -> Result<Product, StockError> {
        if quantity < 0 {
            return Err(ProductValidationError::NegativeStock.into());
        }

        let product = self
            .store
            .set_quantity(id, quantity)
            .await?
            .ok_or(StockError::NotFound(id))?;

        if product.stock_quantity < RESTOCK_THRESHOLD {
            tracing::warn!(
                product_id = %product.id,
                remaining = product.stock_quantity,
                "restock needed"
            );
        }
        Ok(product)
    }

    /// Deletes a product.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), StockError> {
        if !self.store.delete(id).await? {
            return Err(StockError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStockStore;
    use common::{
        CustomerId, OrderId, OrderLine, OrderStatus, QUEUE_ORDER_STOCK_STATUS,
        ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED,
    };

    async fn setup() -> (StockService<InMemoryStockStore>, Arc<Broker>) {
        let broker = Arc::new(Broker::new());
        broker.declare_exchange(EXCHANGE_STOCK_EVENTS).await;
        broker.declare_queue(QUEUE_ORDER_STOCK_STATUS).await;
        for key in [ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED] {
            broker
                .bind_queue(QUEUE_ORDER_STOCK_STATUS, EXCHANGE_STOCK_EVENTS, key)
                .await
                .unwrap();
        }

        let service = StockService::new(InMemoryStockStore::new(), broker.clone());
        (service, broker)
    }

    fn order_event(items: Vec<OrderLine>) -> OrderCreatedEvent {
        OrderCreatedEvent {
            order_id: OrderId::new(1),
            customer_id: CustomerId::new(1),
            items,
            status: OrderStatus::PendingStockCheck,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn all_items_deducted_yields_success() {
        let (service, _broker) = setup().await;
        service.store().seed(ProductId::new(10), 5).await;

        let outcome = service
            .process_order_created(&order_event(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].status, ItemDisposition::Deducted);
        assert_eq!(outcome.routing_key(), ROUTING_KEY_STOCK_DEDUCTED);

        let product = service.get_product(ProductId::new(10)).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 3);
    }

    #[tokio::test]
    async fn earlier_deductions_stay_committed_when_a_later_item_fails() {
        let (service, _broker) = setup().await;
        service.store().seed(ProductId::new(10), 5).await;
        service.store().seed(ProductId::new(11), 0).await;

        let outcome = service
            .process_order_created(&order_event(vec![
                OrderLine::new(10, 2),
                OrderLine::new(11, 1),
            ]))
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(outcome.items[0].status, ItemDisposition::Deducted);
        assert_eq!(outcome.items[1].status, ItemDisposition::Failed);
        assert_eq!(outcome.routing_key(), ROUTING_KEY_STOCK_FAILED);

        // The committed decrement for product 10 is not rolled back.
        let first = service.get_product(ProductId::new(10)).await.unwrap().unwrap();
        assert_eq!(first.stock_quantity, 3);
        let second = service.get_product(ProductId::new(11)).await.unwrap().unwrap();
        assert_eq!(second.stock_quantity, 0);
    }

    #[tokio::test]
    async fn unknown_product_is_a_failed_item_not_an_error() {
        let (service, _broker) = setup().await;

        let outcome = service
            .process_order_created(&order_event(vec![OrderLine::new(99, 1)]))
            .await
            .unwrap();

        assert_eq!(outcome.status, OutcomeStatus::Failure);
        assert_eq!(outcome.items[0].status, ItemDisposition::Failed);
        assert_eq!(outcome.items[0].message, "product not found");
    }

    #[tokio::test]
    async fn items_are_processed_in_list_order() {
        let (service, _broker) = setup().await;
        service.store().seed(ProductId::new(10), 3).await;

        // Both lines hit the same product; the first takes the stock and the
        // second fails, which only holds if processing is sequential.
        let outcome = service
            .process_order_created(&order_event(vec![
                OrderLine::new(10, 3),
                OrderLine::new(10, 1),
            ]))
            .await
            .unwrap();

        assert_eq!(outcome.items[0].status, ItemDisposition::Deducted);
        assert_eq!(outcome.items[1].status, ItemDisposition::Failed);
    }

    #[tokio::test]
    async fn publish_outcome_routes_by_status() {
        let (service, broker) = setup().await;
        service.store().seed(ProductId::new(10), 5).await;

        let outcome = service
            .process_order_created(&order_event(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();
        service.publish_outcome(&outcome).await.unwrap();

        let consumer = broker.consumer(QUEUE_ORDER_STOCK_STATUS).await.unwrap();
        let delivery = consumer.recv().await.unwrap();
        assert_eq!(delivery.message().routing_key, ROUTING_KEY_STOCK_DEDUCTED);
        let received: StockOutcomeEvent = delivery.decode().unwrap();
        delivery.ack().await;
        assert_eq!(received, outcome);
    }

    #[tokio::test]
    async fn product_validation_rejects_bad_writes() {
        let (service, _broker) = setup().await;

        let result = service
            .create_product(NewProduct {
                name: "Widget".to_string(),
                description: None,
                price_cents: 0,
                stock_quantity: 5,
                image_url: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(StockError::Validation(ProductValidationError::InvalidPrice))
        ));

        let result = service
            .create_product(NewProduct {
                name: "Widget".to_string(),
                description: None,
                price_cents: 1000,
                stock_quantity: -1,
                image_url: None,
            })
            .await;
        assert!(matches!(
            result,
            Err(StockError::Validation(ProductValidationError::NegativeStock))
        ));
    }

    #[tokio::test]
    async fn set_stock_rejects_negative_and_requires_existing() {
        let (service, _broker) = setup().await;
        service.store().seed(ProductId::new(10), 5).await;

        assert!(matches!(
            service.set_stock(ProductId::new(10), -1).await,
            Err(StockError::Validation(ProductValidationError::NegativeStock))
        ));
        assert!(matches!(
            service.set_stock(ProductId::new(99), 1).await,
            Err(StockError::NotFound(_))
        ));

        let updated = service.set_stock(ProductId::new(10), 2).await.unwrap();
        assert_eq!(updated.stock_quantity, 2);
    }
}
