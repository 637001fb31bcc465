//! Error types for the MediBot client.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire MediBot client.
///
/// The first four variants form the conversation error taxonomy; the rest
/// cover the local storage and configuration layers.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MedibotError {
    /// No usable response: transport error, timeout or undecodable body
    #[error("Network failure: {0}")]
    Network(String),

    /// The server no longer recognizes the session id
    #[error("Session '{session_id}' is no longer valid")]
    SessionInvalid { session_id: String },

    /// The session is valid but the server rejected the request
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The caller violated the controller contract (e.g. send while sending)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MedibotError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a SessionInvalid error
    pub fn session_invalid(session_id: impl Into<String>) -> Self {
        Self::SessionInvalid {
            session_id: session_id.into(),
        }
    }

    /// Creates a Server error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Creates a Precondition error
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Network error
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Check if this is a SessionInvalid error
    pub fn is_session_invalid(&self) -> bool {
        matches!(self, Self::SessionInvalid { .. })
    }

    /// Check if this is a Server error
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    /// Check if this is a Precondition error
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Precondition(_))
    }

    /// Whether the error came from talking to the remote service.
    ///
    /// These are the errors the controller recovers from locally instead of
    /// returning them to the caller.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::SessionInvalid { .. } | Self::Server { .. }
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for MedibotError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for MedibotError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for MedibotError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for MedibotError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from String (for error messages)
impl From<String> for MedibotError {
    fn from(err: String) -> Self {
        Self::Internal(err)
    }
}

/// A type alias for `Result<T, MedibotError>`.
pub type Result<T> = std::result::Result<T, MedibotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_classified() {
        assert!(MedibotError::network("timed out").is_remote());
        assert!(MedibotError::session_invalid("abc").is_remote());
        assert!(MedibotError::server(500, "boom").is_remote());
        assert!(!MedibotError::precondition("busy").is_remote());
        assert!(!MedibotError::io("disk full").is_remote());

        assert!(MedibotError::server(500, "boom").is_server());
        assert!(!MedibotError::session_invalid("abc").is_server());
    }

    #[test]
    fn test_display_includes_context() {
        let err = MedibotError::server(503, "model unavailable");
        assert_eq!(err.to_string(), "Server error (503): model unavailable");

        let err = MedibotError::session_invalid("abc");
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_io_error_conversion_keeps_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MedibotError = io.into();
        match err {
            MedibotError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {:?}", other),
        }
    }
}
