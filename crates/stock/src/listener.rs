//! Consumer loop for order-created events.

use std::sync::Arc;

use broker::{BrokerError, Consumer};
use common::OrderCreatedEvent;

use crate::service::StockService;
use crate::store::StockStore;

/// Consumes `order.created` deliveries and runs the reconciliation workflow.
///
/// One delivery at a time: deduct per item, publish exactly one outcome
/// event, then ack. A delivery that cannot be decoded, or that hits a store
/// or publish fault mid-flight, is rejected without requeue — reprocessing a
/// half-applied order would deduct stock twice, so the poisoned message goes
/// to the dead letters for an operator instead.
pub async fn run_order_created_listener<S: StockStore>(
    service: Arc<StockService<S>>,
    consumer: Consumer,
) {
    tracing::info!(
        queue = consumer.queue_name(),
        "listening for order created events"
    );

    loop {
        let delivery = match consumer.recv().await {
            Ok(delivery) => delivery,
            Err(BrokerError::Closed) => {
                tracing::info!("broker closed, order created listener stopping");
                break;
            }
            Err(error) => {
                tracing::error!(error = %error, "order created consumer failed");
                break;
            }
        };

        let event: OrderCreatedEvent = match delivery.decode() {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(error = %error, "undecodable order created event");
                delivery.reject(false).await;
                continue;
            }
        };

        tracing::info!(order_id = %event.order_id, "received order created event");

        match service.process_order_created(&event).await {
            Ok(outcome) => match service.publish_outcome(&outcome).await {
                Ok(()) => delivery.ack().await,
                Err(error) => {
                    tracing::error!(
                        order_id = %event.order_id,
                        error = %error,
                        "failed to publish stock outcome"
                    );
                    delivery.reject(false).await;
                }
            },
            Err(error) => {
                tracing::error!(
                    order_id = %event.order_id,
                    error = %error,
                    "reconciliation failed, dead-lettering event"
                );
                delivery.reject(false).await;
            }
        }
    }
}
