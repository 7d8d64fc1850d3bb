//! Shared types for the order/stock reconciliation saga.
//!
//! Both services (orders, stock) and the broker wiring depend on this crate:
//! identifier newtypes, the order lifecycle enum, the wire-format events that
//! cross the broker, and the exchange/queue/routing-key topology constants.

pub mod events;
pub mod ids;
pub mod status;
pub mod topology;

pub use events::{
    ItemDisposition, ItemOutcome, OrderCreatedEvent, OrderLine, OutcomeStatus, StockOutcomeEvent,
};
pub use ids::{CustomerId, OrderId, ProductId};
pub use status::OrderStatus;
pub use topology::{
    EXCHANGE_ORDER_EVENTS, EXCHANGE_STOCK_EVENTS, QUEUE_ORDER_CREATED, QUEUE_ORDER_STOCK_STATUS,
    ROUTING_KEY_ORDER_CREATED, ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED,
};
