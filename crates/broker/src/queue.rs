//! Queue state, consumers, and delivery settlement.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use tokio::sync::Notify;

use crate::error::{BrokerError, Result};
use crate::message::Message;

#[derive(Debug)]
pub(crate) struct QueuedMessage {
    pub(crate) message: Message,
    pub(crate) redelivered: bool,
}

/// Internal state of one durable queue.
#[derive(Debug)]
pub(crate) struct QueueState {
    pub(crate) name: String,
    ready: Mutex<VecDeque<QueuedMessage>>,
    dead: Mutex<Vec<Message>>,
    notify: Notify,
}

impl QueueState {
    pub(crate) fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            ready: Mutex::new(VecDeque::new()),
            dead: Mutex::new(Vec::new()),
            notify: Notify::new(),
        })
    }

    pub(crate) fn enqueue(&self, message: Message) {
        self.ready.lock().unwrap().push_back(QueuedMessage {
            message,
            redelivered: false,
        });
        self.notify.notify_one();
    }

    /// Puts a message back at the head of the queue, flagged as redelivered.
    pub(crate) fn requeue_front(&self, message: Message) {
        self.ready.lock().unwrap().push_front(QueuedMessage {
            message,
            redelivered: true,
        });
        self.notify.notify_one();
    }

    pub(crate) fn dead_letter(&self, message: Message) {
        self.dead.lock().unwrap().push(message);
    }

    pub(crate) fn depth(&self) -> usize {
        self.ready.lock().unwrap().len()
    }

    pub(crate) fn dead_letters(&self) -> Vec<Message> {
        self.dead.lock().unwrap().clone()
    }

    pub(crate) fn wake_all(&self) {
        self.notify.notify_waiters();
    }

    fn pop(&self) -> Option<QueuedMessage> {
        self.ready.lock().unwrap().pop_front()
    }
}

/// Receiving end of a queue.
///
/// `recv` blocks until a message is available or the broker is closed. Each
/// delivery must be settled explicitly; see [`Delivery`].
pub struct Consumer {
    queue: Arc<QueueState>,
    closed: Arc<AtomicBool>,
}

impl Consumer {
    pub(crate) fn new(queue: Arc<QueueState>, closed: Arc<AtomicBool>) -> Self {
        Self { queue, closed }
    }

    /// The name of the queue this consumer is bound to.
    pub fn queue_name(&self) -> &str {
        &self.queue.name
    }

    /// Waits for the next delivery.
    ///
    /// Returns [`BrokerError::Closed`] once the broker shuts down and the
    /// queue has been drained of ready messages.
    pub async fn recv(&self) -> Result<Delivery> {
        loop {
            let notified = self.queue.notify.notified();

            if let Some(next) = self.queue.pop() {
                return Ok(Delivery {
                    message: next.message,
                    redelivered: next.redelivered,
                    queue: self.queue.clone(),
                    settled: false,
                });
            }

            if self.closed.load(Ordering::SeqCst) {
                return Err(BrokerError::Closed);
            }

            notified.await;
        }
    }

    /// Returns the next delivery if one is ready, without waiting.
    pub fn try_recv(&self) -> Option<Delivery> {
        self.queue.pop().map(|next| Delivery {
            message: next.message,
            redelivered: next.redelivered,
            queue: self.queue.clone(),
            settled: false,
        })
    }
}

/// A single received message awaiting settlement.
///
/// Exactly one of [`ack`](Delivery::ack) or [`reject`](Delivery::reject) must
/// be called. A delivery dropped unsettled goes back to the head of its queue
/// with the redelivered flag set, so a crashed consumer never loses messages.
#[derive(Debug)]
pub struct Delivery {
    message: Message,
    redelivered: bool,
    queue: Arc<QueueState>,
    settled: bool,
}

impl Delivery {
    /// The delivered message.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// True if this message was delivered before and not acknowledged.
    pub fn redelivered(&self) -> bool {
        self.redelivered
    }

    /// Decodes the JSON payload into a typed body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        self.message.decode()
    }

    /// Acknowledges the message, removing it from the queue for good.
    pub async fn ack(mut self) {
        self.settled = true;
    }

    /// Rejects the message.
    ///
    /// With `requeue` the message goes back to the head of the queue for
    /// redelivery; without it the message is dead-lettered and leaves normal
    /// delivery entirely.
    pub async fn reject(mut self, requeue: bool) {
        self.settled = true;
        if requeue {
            self.queue.requeue_front(self.message.clone());
        } else {
            tracing::warn!(
                queue = %self.queue.name,
                message_id = %self.message.id,
                routing_key = %self.message.routing_key,
                "message dead-lettered"
            );
            metrics::counter!("broker_messages_dead_lettered_total").increment(1);
            self.queue.dead_letter(self.message.clone());
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        if !self.settled {
            self.queue.requeue_front(self.message.clone());
        }
    }
}
