//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Session projection (`SessionInfo`) and derived `SessionStatus`
//! - `store`: Durable slot for the current session id (`SessionStore`)

mod model;
mod store;

pub use model::{SessionInfo, SessionStatus};
pub use store::{InMemorySessionStore, SessionStore};
