//! Configuration service implementation.
//!
//! Loads [`ClientConfig`] from `~/.config/medibot/config.toml`, then applies
//! environment overrides:
//!
//! - `MEDIBOT_API_URL`: backend base URL
//! - `MEDIBOT_TIMEOUT_SECS`: per-request timeout in seconds

use crate::paths::{MedibotPaths, ServiceType};
use crate::storage::AtomicTomlFile;
use medibot_core::config::ClientConfig;
use medibot_core::error::{MedibotError, Result};
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

pub const ENV_API_URL: &str = "MEDIBOT_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "MEDIBOT_TIMEOUT_SECS";

/// Configuration service that loads and caches the client configuration.
///
/// A missing file yields the defaults. A file that cannot be read or parsed
/// is logged and also yields the defaults, so a bad config never prevents
/// the client from starting.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigService {
    /// Uses the default config location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses an explicit config file, as given by `--config`.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> ClientConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(cached) = read_lock.as_ref() {
                return cached.clone();
            }
        }

        let mut loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("[ConfigService] Falling back to default config: {}", e);
                ClientConfig::default()
            }
        };
        apply_env_overrides(&mut loaded, |key| std::env::var(key).ok());

        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = Some(loaded.clone());
        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(PoisonError::into_inner);
        *write_lock = None;
    }

    /// Returns the config file path this service reads.
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => MedibotPaths::default().get_path(ServiceType::Config),
        }
    }

    fn load_config(&self) -> Result<ClientConfig> {
        let path = self.config_path()?;
        let file = AtomicTomlFile::<ClientConfig>::new(path.clone());
        let config = file.load().map_err(MedibotError::from)?;

        match config {
            Some(config) => {
                tracing::debug!("[ConfigService] Loaded config from {}", path.display());
                Ok(config)
            }
            None => {
                tracing::debug!(
                    "[ConfigService] No config at {}, using defaults",
                    path.display()
                );
                Ok(ClientConfig::default())
            }
        }
    }
}

/// Applies environment overrides to `config`.
///
/// `lookup` resolves a variable name; blank values are ignored, as are
/// timeouts that do not parse as whole seconds.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
        config.api_base_url = url.trim().to_string();
    }

    if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
        match raw.trim().parse::<u64>() {
            Ok(secs) => config.request_timeout_secs = secs,
            Err(_) => tracing::warn!(
                "[ConfigService] Ignoring invalid {}={:?}",
                ENV_TIMEOUT_SECS,
                raw
            ),
        }
    }
}
