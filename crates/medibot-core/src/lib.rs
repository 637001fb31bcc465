//! Core domain of the MediBot conversation client.
//!
//! Holds the session and conversation models, the traits the outer crates
//! implement (`SessionStore`, `SessionClient`), and the
//! `ConversationController` that ties them together.

pub mod config;
pub mod conversation;
pub mod error;
pub mod session;

// Re-export common error type
pub use error::{MedibotError, Result};
