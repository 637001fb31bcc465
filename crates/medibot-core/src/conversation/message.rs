//! Conversation message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// Message typed by the user.
    User,
    /// Message produced by the assistant, or synthesized on its behalf.
    Assistant,
}

/// Client-local rating of an assistant reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Feedback {
    Positive,
    Negative,
}

/// Retrieval metadata attached to assistant messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    /// Whether earlier turns of the conversation informed the reply
    pub has_context: bool,
    /// Citations, in the order the server listed them
    pub sources: Vec<String>,
    /// Server-side generation time in seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation_time: Option<f64>,
}

/// A single message in the local conversation list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Locally unique, strictly increasing id
    pub id: u64,
    pub role: MessageRole,
    pub text: String,
    /// Client time for outgoing messages, server time for replayed history
    pub timestamp: DateTime<Utc>,
    /// Present only on assistant messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
    /// Set on the synthetic reply appended when an exchange fails
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn user(id: u64, text: impl Into<String>) -> Self {
        Self {
            id,
            role: MessageRole::User,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
            feedback: None,
            is_error: false,
        }
    }

    pub fn assistant(id: u64, text: impl Into<String>, metadata: MessageMetadata) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: Some(metadata),
            feedback: None,
            is_error: false,
        }
    }

    /// The synthetic assistant reply shown when an exchange fails.
    pub fn error(id: u64, text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::assistant(id, text, MessageMetadata::default())
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }
}

/// Hands out message ids that are strictly increasing and never reused.
///
/// Ids are seeded from the wall clock in milliseconds so that they also sort
/// after ids handed out by an earlier process, then advance by one per call.
#[derive(Debug)]
pub struct MessageIdGenerator {
    next: AtomicU64,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        let seed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(1);
        Self::starting_at(seed)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for MessageIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
