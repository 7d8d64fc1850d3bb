//! Order lifecycle states.

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Automatic transitions:
/// ```text
/// PendingStockCheck ──┬──► Confirmed
///                     └──► Failed
/// ```
/// `Cancelled` is reached only through the manual status update path, never
/// by the reconciliation saga.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order accepted, stock deduction not yet resolved.
    #[default]
    PendingStockCheck,

    /// Every line item was deducted from stock (terminal state).
    Confirmed,

    /// At least one line item could not be deducted (terminal state).
    Failed,

    /// Order was cancelled manually (terminal state).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if no further automatic transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Returns the wire/database form of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingStockCheck => "PENDING_STOCK_CHECK",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl std::fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl std::str::FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_STOCK_CHECK" => Ok(OrderStatus::PendingStockCheck),
            "CONFIRMED" => Ok(OrderStatus::Confirmed),
            "FAILED" => Ok(OrderStatus::Failed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
