//! Session domain model.
//!
//! A session is a server-issued token scoping one conversation's history.
//! The client never stores more than its id; validity is derived by asking
//! the server.

use serde::{Deserialize, Serialize};

/// Projection of the current session as seen by the UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Whether a session id is currently held
    pub has_session: bool,
    /// The held session id, if any
    pub session_id: Option<String>,
}

impl SessionInfo {
    /// A projection holding no session.
    pub fn none() -> Self {
        Self::default()
    }

    /// A projection holding the given session id.
    pub fn with_id(session_id: impl Into<String>) -> Self {
        Self {
            has_session: true,
            session_id: Some(session_id.into()),
        }
    }

    /// Builds the projection from an optional id.
    pub fn from_optional(session_id: Option<String>) -> Self {
        match session_id {
            Some(id) => Self::with_id(id),
            None => Self::none(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Last eight characters of the id, as shown in the status bar.
    pub fn short_id(&self) -> Option<&str> {
        self.session_id.as_deref().map(|id| {
            let start = id
                .char_indices()
                .rev()
                .nth(7)
                .map(|(idx, _)| idx)
                .unwrap_or(0);
            &id[start..]
        })
    }
}

/// Derived validity of the held session.
///
/// Never persisted; recomputed whenever the server is asked about the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// No session id is held
    #[default]
    None,
    /// The server confirmed the session (validity check or successful exchange)
    Active,
    /// The server no longer recognizes the session
    Expired,
}
