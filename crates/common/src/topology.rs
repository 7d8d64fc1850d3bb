//! Broker topology shared by publisher and consumer sides.
//!
//! ```text
//! order_events (topic) ── order.created ──► order_created_queue
//! stock_events (topic) ─┬─ stock.deducted ─┬► order_stock_status_queue
//!                       └─ stock.failed ───┘
//! ```

/// Exchange the order service publishes admission events on.
pub const EXCHANGE_ORDER_EVENTS: &str = "order_events";

/// Exchange the stock service publishes reconciliation outcomes on.
pub const EXCHANGE_STOCK_EVENTS: &str = "stock_events";

/// Routing key for [`crate::OrderCreatedEvent`].
pub const ROUTING_KEY_ORDER_CREATED: &str = "order.created";

/// Routing key for a fully deducted [`crate::StockOutcomeEvent`].
pub const ROUTING_KEY_STOCK_DEDUCTED: &str = "stock.deducted";

/// Routing key for a failed [`crate::StockOutcomeEvent`].
pub const ROUTING_KEY_STOCK_FAILED: &str = "stock.failed";

/// Queue the stock service consumes admission events from.
pub const QUEUE_ORDER_CREATED: &str = "order_created_queue";

/// Queue the order service consumes reconciliation outcomes from.
pub const QUEUE_ORDER_STOCK_STATUS: &str = "order_stock_status_queue";
