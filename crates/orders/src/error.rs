use thiserror::Error;

use common::{OrderId, ProductId};

/// Admission request rejected before any side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("customer_id is required")]
    MissingCustomerId,

    #[error("order must contain at least one item")]
    NoItems,

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity {
        product_id: ProductId,
        quantity: i64,
    },
}

/// Errors from an [`crate::OrderStore`] implementation.
#[derive(Debug, Error)]
pub enum OrderStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown order status in store: {0}")]
    UnknownStatus(String),
}

/// Errors surfaced by the order service.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("order not found: {0}")]
    NotFound(OrderId),

    #[error("order store error: {0}")]
    Store(#[from] OrderStoreError),
}
