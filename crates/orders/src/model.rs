use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use common::{CustomerId, OrderId, OrderLine, OrderStatus};

/// An order as recorded by the order ledger.
///
/// Owned exclusively by this crate: created by admission, finalized by
/// convergence, and touched otherwise only through the manual status and
/// delete paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub items: Vec<OrderLine>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
