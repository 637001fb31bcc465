//! Filesystem-backed implementations for the MediBot client.

pub mod config_service;
pub mod paths;
pub mod storage;
pub mod toml_session_store;

pub use crate::config_service::ConfigService;
pub use crate::paths::MedibotPaths;
pub use crate::toml_session_store::TomlSessionStore;
