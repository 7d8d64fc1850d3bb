use thiserror::Error;

/// Errors that can occur when interacting with the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Publish or bind referenced an exchange that was never declared.
    #[error("exchange not found: {0}")]
    ExchangeNotFound(String),

    /// Bind or consume referenced a queue that was never declared.
    #[error("queue not found: {0}")]
    QueueNotFound(String),

    /// The broker has been shut down; no further publishes or receives.
    #[error("broker is closed")]
    Closed,

    /// A message payload could not be encoded or decoded.
    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;
