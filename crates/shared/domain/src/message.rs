//! Message queue payload types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A queue message.
///
/// `receipt_handle` is empty on messages built for sending and is filled in by
/// the queue on receive. It identifies one delivery and is only valid while the
/// lease granted by that receive lasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub body: String,
    #[serde(default)]
    pub receipt_handle: String,
}

impl Message {
    /// Create an outgoing message
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: String::new(),
        }
    }

    /// Create a delivered message carrying its receipt handle
    pub fn received(body: impl Into<String>, receipt_handle: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            receipt_handle: receipt_handle.into(),
        }
    }

    /// Encode a user identifier as a message body (JSON string).
    pub fn from_user_id(id: &Uuid) -> DomainResult<Self> {
        let body = serde_json::to_string(id)
            .map_err(|e| DomainError::malformed_payload(e.to_string()))?;
        Ok(Self::new(body))
    }

    /// Decode the body back into a user identifier.
    pub fn user_id(&self) -> DomainResult<Uuid> {
        serde_json::from_str(&self.body).map_err(|e| {
            DomainError::malformed_payload(format!("expected a user id, got {:?}: {}", self.body, e))
        })
    }
}

/// Options for a single receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveMessageOptions {
    /// Upper bound on messages returned; the queue may return fewer, or none
    pub max_number_of_messages: u32,
}

impl Default for ReceiveMessageOptions {
    fn default() -> Self {
        Self {
            max_number_of_messages: 1,
        }
    }
}
