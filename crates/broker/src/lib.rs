//! Durable topic-routed publish/subscribe fabric.
//!
//! The broker owns named topic exchanges and named queues. Queues bind to an
//! exchange with a topic pattern (`*` matches one dot-separated segment, `#`
//! matches any number). Published messages are copied into every queue whose
//! binding matches the routing key and stay there until a consumer settles
//! them: [`Delivery::ack`] removes a message for good, [`Delivery::reject`]
//! either requeues it at the front or moves it to the queue's dead-letter
//! store, and a delivery dropped without being settled is requeued with the
//! redelivered flag set. That gives consumers at-least-once semantics with an
//! explicit acknowledgment step, which is what the reconciliation workflows
//! are written against.
//!
//! The broker handle is created by the process at startup and injected into
//! every publisher and consumer; nothing here lives in module-level state.

pub mod broker;
pub mod error;
pub mod message;
pub mod retry;
pub mod routing;

mod queue;

pub use broker::Broker;
pub use error::{BrokerError, Result};
pub use message::{CONTENT_TYPE_JSON, Message, MessageId};
pub use queue::{Consumer, Delivery};
pub use retry::RetryPolicy;
pub use routing::topic_matches;
