//! HTTP access to the MediBot backend.

pub mod dto;
pub mod http_session_client;

pub use crate::http_session_client::HttpSessionClient;
