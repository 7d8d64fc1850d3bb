//! The in-process broker fabric: exchanges, queues, bindings.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::{BrokerError, Result};
use crate::message::Message;
use crate::queue::{Consumer, QueueState};
use crate::routing::topic_matches;

struct Binding {
    pattern: String,
    queue: String,
}

#[derive(Default)]
struct Topology {
    exchanges: HashMap<String, Vec<Binding>>,
    queues: HashMap<String, Arc<QueueState>>,
}

/// Topic-routed message fabric shared by every service in the process.
///
/// Created once at startup and passed around as `Arc<Broker>`; all topology
/// (exchanges, queues, bindings) is declared explicitly before publishing.
pub struct Broker {
    topology: RwLock<Topology>,
    closed: Arc<AtomicBool>,
}

impl Broker {
    /// Creates an empty broker with no topology.
    pub fn new() -> Self {
        Self {
            topology: RwLock::new(Topology::default()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Declares a topic exchange. Declaring an existing exchange is a no-op.
    pub async fn declare_exchange(&self, name: &str) {
        self.topology
            .write()
            .await
            .exchanges
            .entry(name.to_string())
            .or_default();
    }

    /// Declares a durable queue. Declaring an existing queue is a no-op.
    pub async fn declare_queue(&self, name: &str) {
        self.topology
            .write()
            .await
            .queues
            .entry(name.to_string())
            .or_insert_with(|| QueueState::new(name));
    }

    /// Binds a queue to an exchange under a topic pattern.
    ///
    /// Both the queue and the exchange must have been declared. Binding the
    /// same pattern twice is a no-op.
    pub async fn bind_queue(&self, queue: &str, exchange: &str, pattern: &str) -> Result<()> {
        let mut topology = self.topology.write().await;

        if !topology.queues.contains_key(queue) {
            return Err(BrokerError::QueueNotFound(queue.to_string()));
        }
        let bindings = topology
            .exchanges
            .get_mut(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        if !bindings
            .iter()
            .any(|b| b.pattern == pattern && b.queue == queue)
        {
            bindings.push(Binding {
                pattern: pattern.to_string(),
                queue: queue.to_string(),
            });
        }
        Ok(())
    }

    /// Publishes a message to an exchange.
    ///
    /// The message is copied into every queue whose binding pattern matches
    /// the routing key. Returns how many queues received it; a message that
    /// matches no binding is dropped, as a topic exchange does.
    pub async fn publish(&self, exchange: &str, message: Message) -> Result<usize> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }

        let topology = self.topology.read().await;
        let bindings = topology
            .exchanges
            .get(exchange)
            .ok_or_else(|| BrokerError::ExchangeNotFound(exchange.to_string()))?;

        let mut matched = 0;
        for binding in bindings {
            if topic_matches(&binding.pattern, &message.routing_key)
                && let Some(queue) = topology.queues.get(&binding.queue)
            {
                queue.enqueue(message.clone());
                matched += 1;
            }
        }

        metrics::counter!("broker_messages_published_total").increment(1);
        if matched == 0 {
            tracing::debug!(
                exchange = %exchange,
                routing_key = %message.routing_key,
                "message matched no bindings, dropped"
            );
        } else {
            tracing::debug!(
                exchange = %exchange,
                routing_key = %message.routing_key,
                queues = matched,
                "message routed"
            );
        }
        Ok(matched)
    }

    /// Creates a consumer for a declared queue.
    pub async fn consumer(&self, queue: &str) -> Result<Consumer> {
        let topology = self.topology.read().await;
        let state = topology
            .queues
            .get(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        Ok(Consumer::new(state.clone(), self.closed.clone()))
    }

    /// Number of ready (unconsumed) messages in a queue.
    pub async fn queue_depth(&self, queue: &str) -> Result<usize> {
        let topology = self.topology.read().await;
        let state = topology
            .queues
            .get(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        Ok(state.depth())
    }

    /// Messages rejected without requeue on a queue.
    pub async fn dead_letters(&self, queue: &str) -> Result<Vec<Message>> {
        let topology = self.topology.read().await;
        let state = topology
            .queues
            .get(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        Ok(state.dead_letters())
    }

    /// Shuts the broker down.
    ///
    /// Further publishes fail with [`BrokerError::Closed`]; consumers drain
    /// whatever is already queued, then their `recv` returns the same error.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let topology = self.topology.read().await;
        for queue in topology.queues.values() {
            queue.wake_all();
        }
    }

    /// True once [`close`](Broker::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
