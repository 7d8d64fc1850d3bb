//! Consumer loop for stock outcome events.

use std::sync::Arc;

use broker::{BrokerError, Consumer};
use common::StockOutcomeEvent;

use crate::service::OrderService;
use crate::store::OrderStore;

/// Consumes `stock.deducted`/`stock.failed` deliveries and converges order
/// status.
///
/// Runs until the broker closes. A delivery is acknowledged once the
/// conditional status update has been applied (or found inapplicable); a
/// delivery that cannot be decoded or applied is rejected without requeue so
/// a poisoned message cannot wedge the loop.
pub async fn run_stock_outcome_listener<S: OrderStore>(
    service: Arc<OrderService<S>>,
    consumer: Consumer,
) {
    tracing::info!(
        queue = consumer.queue_name(),
        "listening for stock outcome events"
    );

    loop {
        let delivery = match consumer.recv().await {
            Ok(delivery) => delivery,
            Err(BrokerError::Closed) => {
                tracing::info!("broker closed, stock outcome listener stopping");
                break;
            }
            Err(error) => {
                tracing::error!(error = %error, "stock outcome consumer failed");
                break;
            }
        };

        let event: StockOutcomeEvent = match delivery.decode() {
            Ok(event) => event,
            Err(error) => {
                tracing::error!(error = %error, "undecodable stock outcome event");
                delivery.reject(false).await;
                continue;
            }
        };

        match service.apply_stock_outcome(&event).await {
            Ok(_) => delivery.ack().await,
            Err(error) => {
                tracing::error!(
                    order_id = %event.order_id,
                    error = %error,
                    "failed to apply stock outcome"
                );
                delivery.reject(false).await;
            }
        }
    }
}
