//! Session client trait.
//!
//! Defines the remote operations the conversation controller depends on.
//! `medibot-interaction` provides the HTTP implementation.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Optional metadata of a remote history record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    #[serde(
        default,
        rename = "hasContext",
        alias = "has_context",
        alias = "conversation_context_used"
    )]
    pub has_context: bool,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default, rename = "generationTime", alias = "generation_time")]
    pub generation_time: Option<f64>,
}

/// A history record as the server stores it, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    /// RFC 3339 or naive ISO-8601
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<RemoteMetadata>,
}

impl RemoteMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            timestamp: None,
            metadata: None,
        }
    }
}

/// Result of a successful message exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct SendReply {
    pub response: String,
    pub has_context: bool,
    pub sources: Vec<String>,
    /// Seconds spent generating the reply
    pub generation_time: f64,
    /// The session the server filed the exchange under. Differs from the
    /// id that was sent when the server allocated or rotated the session.
    pub session_id: String,
}

/// Remote operations on conversation sessions.
///
/// Each call is an independent request; implementations apply their own
/// bounded timeout and report its expiry as a network failure.
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Whether the server still recognizes the session.
    ///
    /// Fails closed: any network or protocol error yields `false`.
    async fn check_active(&self, session_id: &str) -> bool;

    /// Full history of the session, oldest to newest.
    async fn fetch_history(&self, session_id: &str) -> Result<Vec<RemoteMessage>>;

    /// Sends a user message. Without a session id the server allocates one.
    async fn send_message(&self, session_id: Option<&str>, text: &str) -> Result<SendReply>;

    /// Starts a fresh conversation server-side and returns its session id.
    async fn start_new_conversation(&self) -> Result<String>;

    /// Wipes the remote history while keeping the session id valid.
    ///
    /// `Ok(false)` means the server did not clear anything (including the
    /// case where there was nothing to clear).
    async fn clear_conversation(&self, session_id: &str) -> Result<bool>;
}
