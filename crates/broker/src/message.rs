use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::Result;

/// Declared content type for JSON message bodies.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Unique identifier for a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new random message ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as it travels through an exchange into bound queues.
///
/// The payload is an opaque byte body; the content type says how to read it.
/// The persistent flag marks messages that must survive a broker restart;
/// every event the saga publishes sets it.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub routing_key: String,
    pub content_type: String,
    pub persistent: bool,
    pub published_at: DateTime<Utc>,
    pub payload: Vec<u8>,
}

impl Message {
    /// Builds a persistent JSON message from a serializable body.
    pub fn json<T: Serialize>(routing_key: impl Into<String>, body: &T) -> Result<Self> {
        Ok(Self {
            id: MessageId::new(),
            routing_key: routing_key.into(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            persistent: true,
            published_at: Utc::now(),
            payload: serde_json::to_vec(body)?,
        })
    }

    /// Builds a persistent message from raw bytes.
    pub fn from_bytes(routing_key: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: MessageId::new(),
            routing_key: routing_key.into(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            persistent: true,
            published_at: Utc::now(),
            payload,
        }
    }

    /// Decodes the JSON payload into a typed body.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}
