//! Client configuration model.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_WELCOME_MESSAGE: &str = "Hello! I'm MediBot, your AI Health Assistant. I can help you with health questions and provide medical information. How can I assist you today?";
pub const DEFAULT_ERROR_MESSAGE: &str = "Sorry, I couldn't process your request. Please try again.";

/// What to do with the held session id when starting a new conversation
/// fails on the network.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NewConversationFallback {
    /// Keep the stale id; the next send continues the old server session.
    #[default]
    KeepSession,
    /// Forget the id locally; the next send lets the server allocate one.
    DiscardSession,
}

/// Root of `config.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    /// Retrieval depth forwarded with every chat request
    pub max_chunks: u32,
    /// Longest message the backend accepts
    pub max_message_chars: usize,
    pub welcome_message: String,
    pub error_message: String,
    pub on_new_conversation_failure: NewConversationFallback,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: 60,
            max_chunks: 3,
            max_message_chars: 1000,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            error_message: DEFAULT_ERROR_MESSAGE.to_string(),
            on_new_conversation_failure: NewConversationFallback::default(),
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            api_base_url = "https://medibot.example.org"
            on_new_conversation_failure = "discard_session"
            "#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://medibot.example.org");
        assert_eq!(
            config.on_new_conversation_failure,
            NewConversationFallback::DiscardSession
        );
        assert_eq!(config.max_chunks, 3);
        assert_eq!(config.welcome_message, DEFAULT_WELCOME_MESSAGE);
    }

    #[test]
    fn test_zero_timeout_is_clamped() {
        let config = ClientConfig {
            request_timeout_secs: 0,
            ..ClientConfig::default()
        };
        assert_eq!(config.request_timeout(), Duration::from_secs(1));
    }
}
