//! Conversation state held by the controller.

use super::message::Message;
use crate::error::MedibotError;
use crate::session::{SessionInfo, SessionStatus};
use serde::Serialize;

/// Activity within the `Ready` phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Activity {
    Idle,
    /// A send, new-conversation or clear request is in flight.
    Sending,
}

/// Lifecycle phase of a conversation controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecyclePhase {
    Uninitialized,
    Initializing,
    Ready(Activity),
    /// Initialization could not reach a consistent local state; retry
    /// `initialize()` to leave it.
    Error,
}

impl LifecyclePhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Ready(Activity::Idle))
    }
}

/// Read-only snapshot of a conversation, as handed to the UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub session_info: SessionInfo,
    pub session_status: SessionStatus,
    pub phase: LifecyclePhase,
    /// True while exactly one request is in flight
    pub is_loading: bool,
    /// True once a real (non-welcome) exchange has completed
    pub started: bool,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            session_info: SessionInfo::none(),
            session_status: SessionStatus::None,
            phase: LifecyclePhase::Uninitialized,
            is_loading: false,
            started: false,
        }
    }
}

impl ConversationState {
    pub fn find_message(&self, id: u64) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }
}

/// How a new-conversation request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum NewConversationOutcome {
    /// The server allocated a fresh session.
    Started { session_id: String },
    /// The server could not be reached; local history was reset anyway.
    /// `kept_session` is the stale id still held, if the policy kept it.
    Degraded {
        error: MedibotError,
        kept_session: Option<String>,
    },
}
