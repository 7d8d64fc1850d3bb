//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders::{OrderError, OrderStoreError};
use stock::{StockError, StockStoreError};

/// API-level error type that maps to HTTP responses.
///
/// Response bodies carry a `detail` field, matching the shape admission
/// clients are written against.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Request failed validation; no side effects happened.
    Validation(String),
    /// Malformed request (unparsable ids, unknown status strings).
    BadRequest(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "detail": detail });
        (status, axum::Json(body)).into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(_) => ApiError::Validation(err.to_string()),
            OrderError::NotFound(_) => ApiError::NotFound(err.to_string()),
            OrderError::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::Validation(_) => ApiError::Validation(err.to_string()),
            StockError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StockError::Store(_) | StockError::Broker(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(err: OrderStoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StockStoreError> for ApiError {
    fn from(err: StockStoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
