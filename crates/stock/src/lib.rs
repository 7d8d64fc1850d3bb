//! Stock ledger and the reconciliation workflow of the saga.
//!
//! The ledger owns the products table; the only mutation path the saga uses
//! is [`StockStore::deduct`], a read-check-decrement inside one transaction
//! holding the row lock. The order-created listener drives one deduction per
//! line item, strictly in list order, and publishes exactly one outcome event
//! per consumed order event.

pub mod error;
pub mod listener;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod service;
pub mod store;

pub use error::{ProductValidationError, StockError, StockStoreError};
pub use listener::run_order_created_listener;
pub use memory::InMemoryStockStore;
pub use model::{NewProduct, Product, ProductUpdate};
pub use postgres::PostgresStockStore;
pub use service::{RESTOCK_THRESHOLD, StockService};
pub use store::{Deduction, StockStore};
