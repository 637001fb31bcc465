//! Wire types of the MediBot backend.
//!
//! Fields the client never reads are still declared where the backend always
//! sends them, so the types double as documentation of the protocol. Every
//! field the client does not depend on is `#[serde(default)]`.

use medibot_core::conversation::RemoteMessage;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub max_chunks: u32,
}

/// Response of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub conversation_context_used: bool,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub generation_time: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response of `GET /api/sessions/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    #[serde(default)]
    pub session_id: String,
    pub exists: bool,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub last_activity: Option<String>,
}

/// Response of `GET /api/sessions/{id}/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHistoryResponse {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<RemoteMessage>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Response of `POST /api/sessions/new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionCreateResponse {
    pub session_id: String,
    #[serde(default)]
    pub message: String,
}

/// Response of `DELETE /api/sessions/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearResponse {
    #[serde(default)]
    pub success: bool,
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Error body FastAPI-style backends return on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: serde_json::Value,
}
