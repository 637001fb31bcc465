//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `message`: Local message model (`Message`, `MessageRole`, `Feedback`)
//! - `client`: Remote session operations (`SessionClient`) and their records
//! - `reconciler`: Remote history → local messages (`HistoryReconciler`)
//! - `state`: Snapshot handed to the UI (`ConversationState`)
//! - `controller`: Session lifecycle state machine (`ConversationController`)

mod client;
mod controller;
mod message;
mod reconciler;
mod state;


pub use client::{RemoteMessage, RemoteMetadata, SendReply, SessionClient};
pub use controller::ConversationController;
pub use message::{Feedback, Message, MessageIdGenerator, MessageMetadata, MessageRole};
pub use reconciler::HistoryReconciler;
pub use state::{Activity, ConversationState, LifecyclePhase, NewConversationOutcome};
