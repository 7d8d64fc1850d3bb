//! Order service: admission, queries, manual updates, and convergence.

use std::sync::Arc;

use broker::{Broker, BrokerError, Message};
use common::{
    CustomerId, EXCHANGE_ORDER_EVENTS, OrderCreatedEvent, OrderId, OrderLine, OrderStatus,
    ROUTING_KEY_ORDER_CREATED, StockOutcomeEvent,
};

use crate::error::{OrderError, ValidationError};
use crate::model::Order;
use crate::store::{Finalize, NewOrder, OrderStore};

/// An incoming admission request, unvalidated.
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<OrderLine>,
}

/// Service for the order ledger.
///
/// Owns the store and the injected broker handle; admission and convergence
/// both go through here so status mutation stays in one place.
pub struct OrderService<S: OrderStore> {
    store: S,
    broker: Arc<Broker>,
}

impl<S: OrderStore> OrderService<S> {
    /// Creates a new order service.
    pub fn new(store: S, broker: Arc<Broker>) -> Self {
        Self { store, broker }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Admits an order: validate, persist as PENDING_STOCK_CHECK, publish
    /// `order.created`.
    ///
    /// Returns as soon as the order is durable; the caller never waits for
    /// reconciliation. Persist and publish are not atomic: if the publish
    /// fails after the insert committed, the order stays pending and the
    /// failure is logged.
    #[tracing::instrument(skip(self, request))]
    pub async fn place_order(&self, request: PlaceOrder) -> Result<Order, OrderError> {
        let new_order = validate(request)?;

        let order = self.store.insert(new_order).await?;
        metrics::counter!("orders_admitted_total").increment(1);
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            "order admitted, stock check pending"
        );

        if let Err(error) = self.publish_created(&order).await {
            metrics::counter!("order_created_publish_failures_total").increment(1);
            tracing::warn!(
                order_id = %order.id,
                error = %error,
                "failed to publish order.created after commit, order stays pending"
            );
        }

        Ok(order)
    }

    async fn publish_created(&self, order: &Order) -> Result<(), BrokerError> {
        let event = OrderCreatedEvent {
            order_id: order.id,
            customer_id: order.customer_id,
            items: order.items.clone(),
            status: order.status,
            created_at: order.created_at,
        };
        let message = Message::json(ROUTING_KEY_ORDER_CREATED, &event)?;
        self.broker.publish(EXCHANGE_ORDER_EVENTS, message).await?;
        Ok(())
    }

    /// Loads an order by id.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        Ok(self.store.get(id).await?)
    }

    /// Lists all orders.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list().await?)
    }

    /// Sets an order's status directly (operator path, e.g. cancellation).
    #[tracing::instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        let updated = self
            .store
            .set_status(id, status)
            .await?
            .ok_or(OrderError::NotFound(id))?;
        tracing::info!(order_id = %id, status = %status, "order status updated manually");
        Ok(updated)
    }

    /// Deletes an order.
    #[tracing::instrument(skip(self))]
    pub async fn delete_order(&self, id: OrderId) -> Result<(), OrderError> {
        if !self.store.delete(id).await? {
            return Err(OrderError::NotFound(id));
        }
        tracing::info!(order_id = %id, "order deleted");
        Ok(())
    }

    /// Converges an order to its terminal status from a stock outcome event.
    ///
    /// Safe under duplicate delivery: the store update is conditional on the
    /// order still being pending. A missing order is reported, not an error —
    /// the event is dropped either way.
    #[tracing::instrument(skip(self, event), fields(order_id = %event.order_id))]
    pub async fn apply_stock_outcome(
        &self,
        event: &StockOutcomeEvent,
    ) -> Result<Finalize, OrderError> {
        let status = event.status.as_order_status();
        let outcome = self.store.finalize(event.order_id, status).await?;

        match &outcome {
            Finalize::Updated(order) => {
                metrics::counter!("orders_converged_total").increment(1);
                tracing::info!(
                    order_id = %order.id,
                    status = %order.status,
                    "order converged to terminal status"
                );
            }
            Finalize::AlreadySettled(existing) => {
                tracing::debug!(
                    order_id = %event.order_id,
                    status = %existing,
                    "order already terminal, stock outcome ignored"
                );
            }
            Finalize::NotFound => {
                metrics::counter!("orphan_stock_outcomes_total").increment(1);
                tracing::warn!(
                    order_id = %event.order_id,
                    "stock outcome references unknown order, dropping event"
                );
            }
        }

        Ok(outcome)
    }
}

fn validate(request: PlaceOrder) -> Result<NewOrder, ValidationError> {
    let customer_id = request
        .customer_id
        .ok_or(ValidationError::MissingCustomerId)?;

    if request.items.is_empty() {
        return Err(ValidationError::NoItems);
    }
    for line in &request.items {
        if line.quantity <= 0 {
            return Err(ValidationError::InvalidQuantity {
                product_id: line.product_id,
                quantity: line.quantity,
            });
        }
    }

    Ok(NewOrder {
        customer_id,
        items: request.items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryOrderStore;
    use chrono::Utc;
    use common::{
        EXCHANGE_STOCK_EVENTS, ItemDisposition, ItemOutcome, OutcomeStatus, ProductId,
        QUEUE_ORDER_CREATED,
    };

    async fn setup() -> (OrderService<InMemoryOrderStore>, Arc<Broker>) {
        let broker = Arc::new(Broker::new());
        broker.declare_exchange(EXCHANGE_ORDER_EVENTS).await;
        broker.declare_exchange(EXCHANGE_STOCK_EVENTS).await;
        broker.declare_queue(QUEUE_ORDER_CREATED).await;
        broker
            .bind_queue(
                QUEUE_ORDER_CREATED,
                EXCHANGE_ORDER_EVENTS,
                ROUTING_KEY_ORDER_CREATED,
            )
            .await
            .unwrap();

        let service = OrderService::new(InMemoryOrderStore::new(), broker.clone());
        (service, broker)
    }

    fn request(items: Vec<OrderLine>) -> PlaceOrder {
        PlaceOrder {
            customer_id: Some(CustomerId::new(1)),
            items,
        }
    }

    fn outcome_event(order_id: OrderId, status: OutcomeStatus) -> StockOutcomeEvent {
        StockOutcomeEvent {
            order_id,
            items: vec![ItemOutcome {
                product_id: ProductId::new(10),
                quantity: 2,
                status: match status {
                    OutcomeStatus::Success => ItemDisposition::Deducted,
                    OutcomeStatus::Failure => ItemDisposition::Failed,
                },
                message: String::new(),
            }],
            status,
            message: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn admission_persists_pending_and_publishes() {
        let (service, broker) = setup().await;

        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::PendingStockCheck);

        let consumer = broker.consumer(QUEUE_ORDER_CREATED).await.unwrap();
        let delivery = consumer.recv().await.unwrap();
        let event: OrderCreatedEvent = delivery.decode().unwrap();
        delivery.ack().await;

        assert_eq!(event.order_id, order.id);
        assert_eq!(event.customer_id, CustomerId::new(1));
        assert_eq!(event.items, vec![OrderLine::new(10, 2)]);
        assert_eq!(event.status, OrderStatus::PendingStockCheck);
    }

    #[tokio::test]
    async fn admission_rejects_missing_customer() {
        let (service, broker) = setup().await;

        let result = service
            .place_order(PlaceOrder {
                customer_id: None,
                items: vec![OrderLine::new(10, 2)],
            })
            .await;

        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::MissingCustomerId))
        ));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(broker.queue_depth(QUEUE_ORDER_CREATED).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn admission_rejects_empty_items_without_side_effects() {
        let (service, broker) = setup().await;

        let result = service.place_order(request(vec![])).await;

        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::NoItems))
        ));
        assert_eq!(service.store().order_count().await, 0);
        assert_eq!(broker.queue_depth(QUEUE_ORDER_CREATED).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn admission_rejects_non_positive_quantity() {
        let (service, _broker) = setup().await;

        let result = service.place_order(request(vec![OrderLine::new(10, 0)])).await;

        assert!(matches!(
            result,
            Err(OrderError::Validation(ValidationError::InvalidQuantity {
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn admission_survives_publish_failure() {
        let (service, broker) = setup().await;
        broker.close().await;

        // The insert commits even though the publish fails; the order is
        // durably stuck in PENDING_STOCK_CHECK.
        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::PendingStockCheck);
        assert_eq!(service.store().order_count().await, 1);
    }

    #[tokio::test]
    async fn stock_outcome_confirms_order() {
        let (service, _broker) = setup().await;
        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        let outcome = service
            .apply_stock_outcome(&outcome_event(order.id, OutcomeStatus::Success))
            .await
            .unwrap();

        match outcome {
            Finalize::Updated(updated) => assert_eq!(updated.status, OrderStatus::Confirmed),
            other => panic!("expected Updated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stock_outcome_fails_order() {
        let (service, _broker) = setup().await;
        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        service
            .apply_stock_outcome(&outcome_event(order.id, OutcomeStatus::Failure))
            .await
            .unwrap();

        let stored = service.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn duplicate_stock_outcome_is_a_no_op() {
        let (service, _broker) = setup().await;
        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        let event = outcome_event(order.id, OutcomeStatus::Success);
        service.apply_stock_outcome(&event).await.unwrap();
        let second = service.apply_stock_outcome(&event).await.unwrap();

        assert_eq!(
            second,
            Finalize::AlreadySettled(OrderStatus::Confirmed)
        );
        let stored = service.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Confirmed);
    }

    #[tokio::test]
    async fn orphan_stock_outcome_is_dropped() {
        let (service, _broker) = setup().await;

        let outcome = service
            .apply_stock_outcome(&outcome_event(OrderId::new(404), OutcomeStatus::Success))
            .await
            .unwrap();

        assert_eq!(outcome, Finalize::NotFound);
    }

    #[tokio::test]
    async fn manual_update_and_delete() {
        let (service, _broker) = setup().await;
        let order = service
            .place_order(request(vec![OrderLine::new(10, 2)]))
            .await
            .unwrap();

        let cancelled = service
            .update_status(order.id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        service.delete_order(order.id).await.unwrap();
        assert!(matches!(
            service.delete_order(order.id).await,
            Err(OrderError::NotFound(_))
        ));
    }
}
