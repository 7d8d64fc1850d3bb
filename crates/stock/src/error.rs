use thiserror::Error;

use broker::BrokerError;
use common::ProductId;

/// Product write rejected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductValidationError {
    #[error("price must be positive")]
    InvalidPrice,

    #[error("stock quantity cannot be negative")]
    NegativeStock,
}

/// Errors from a [`crate::StockStore`] implementation.
#[derive(Debug, Error)]
pub enum StockStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors surfaced by the stock service.
#[derive(Debug, Error)]
pub enum StockError {
    #[error(transparent)]
    Validation(#[from] ProductValidationError),

    #[error("product not found: {0}")]
    NotFound(ProductId),

    #[error("stock store error: {0}")]
    Store(#[from] StockStoreError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
}
