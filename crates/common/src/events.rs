//! Wire-format events exchanged between the two services.
//!
//! Both event bodies travel as UTF-8 JSON with persistent delivery. The field
//! names and string forms here are the wire contract; changing them breaks
//! consumers that were bound before the change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CustomerId, OrderId, ProductId};
use crate::status::OrderStatus;
use crate::topology::{ROUTING_KEY_STOCK_DEDUCTED, ROUTING_KEY_STOCK_FAILED};

/// One ordered line: which product and how many units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl OrderLine {
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Published once per admitted order on the `order_events` exchange.
///
/// Carries the full admission payload so the stock service never has to call
/// back into the order ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

/// How a single line item fared during stock deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemDisposition {
    /// The quantity was decremented and committed.
    Deducted,
    /// The row was missing or held insufficient stock; nothing committed.
    Failed,
}

/// Per-item outcome inside a [`StockOutcomeEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub product_id: ProductId,
    pub quantity: i64,
    pub status: ItemDisposition,
    pub message: String,
}

/// Aggregate outcome of a reconciliation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// Every line item was deducted.
    Success,
    /// At least one line item failed; earlier deductions stay committed.
    Failure,
}

impl OutcomeStatus {
    /// The terminal order status this outcome converges to.
    pub fn as_order_status(&self) -> OrderStatus {
        match self {
            OutcomeStatus::Success => OrderStatus::Confirmed,
            OutcomeStatus::Failure => OrderStatus::Failed,
        }
    }
}

/// Published once per consumed [`OrderCreatedEvent`] on the `stock_events`
/// exchange, summarizing every line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockOutcomeEvent {
    pub order_id: OrderId,
    pub items: Vec<ItemOutcome>,
    pub status: OutcomeStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl StockOutcomeEvent {
    /// The routing key this event is published under.
    pub fn routing_key(&self) -> &'static str {
        match self.status {
            OutcomeStatus::Success => ROUTING_KEY_STOCK_DEDUCTED,
            OutcomeStatus::Failure => ROUTING_KEY_STOCK_FAILED,
        }
    }
}
