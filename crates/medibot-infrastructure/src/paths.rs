//! Path management for medibot files.
//!
//! ```text
//! ~/.config/medibot/           # Config directory (platform config dir)
//! ├── config.toml              # Client configuration
//! └── session.toml             # Current session id slot
//! ```

use medibot_core::MedibotError;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "medibot";

/// Files managed by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// Client configuration (`config.toml`)
    Config,
    /// Current session id slot (`session.toml`)
    Session,
}

impl ServiceType {
    fn file_name(self) -> &'static str {
        match self {
            ServiceType::Config => "config.toml",
            ServiceType::Session => "session.toml",
        }
    }
}

/// Resolves medibot file locations.
///
/// Uses the platform config directory (XDG on Linux, `~/Library/Application
/// Support` on macOS, `%APPDATA%` on Windows) unless a base directory is
/// given.
#[derive(Debug, Clone, Default)]
pub struct MedibotPaths {
    base_override: Option<PathBuf>,
}

impl MedibotPaths {
    pub fn new(base_override: Option<PathBuf>) -> Self {
        Self { base_override }
    }

    /// Returns the medibot configuration directory.
    pub fn config_dir(&self) -> Result<PathBuf, MedibotError> {
        if let Some(base) = &self.base_override {
            return Ok(base.clone());
        }
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or_else(|| MedibotError::config("Cannot find the platform config directory"))
    }

    /// Returns the path of the given file.
    pub fn get_path(&self, service: ServiceType) -> Result<PathBuf, MedibotError> {
        Ok(self.config_dir()?.join(service.file_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_is_used_verbatim() {
        let paths = MedibotPaths::new(Some(PathBuf::from("/tmp/medibot-test")));
        assert_eq!(
            paths.get_path(ServiceType::Session).unwrap(),
            PathBuf::from("/tmp/medibot-test/session.toml")
        );
        assert_eq!(
            paths.get_path(ServiceType::Config).unwrap(),
            PathBuf::from("/tmp/medibot-test/config.toml")
        );
    }

    #[test]
    fn test_default_dir_ends_with_app_name() {
        if let Ok(dir) = MedibotPaths::default().config_dir() {
            assert!(dir.ends_with(APP_DIR_NAME));
        }
    }
}
