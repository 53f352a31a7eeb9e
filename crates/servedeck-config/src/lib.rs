//! # servedeck-config
//!
//! TOML configuration types, hierarchy loading, and validation for servedeck.
//! Depends only on `servedeck-paths`.

mod loading;
mod validation;

pub mod errors;
pub mod types;

pub use errors::ConfigError;
pub use loading::{load_hierarchy, load_hierarchy_from, merge_configs};
pub use types::{BackendConfig, ConfirmConfig, DeckConfig, PollingConfig};
pub use validation::{MAX_MIN_REQUEST_INTERVAL_MS, validate_config};

use servedeck_paths::DeckPaths;
use std::path::PathBuf;

impl DeckConfig {
    /// Load configuration from the hierarchy of config files.
    ///
    /// See [`loading::load_hierarchy`] for details.
    pub fn load_hierarchy() -> Result<Self, ConfigError> {
        loading::load_hierarchy()
    }

    /// Validate the configuration.
    ///
    /// See [`validation::validate_config`] for details.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validation::validate_config(self)
    }

    /// Backend socket: `[backend] socket_path` if set, otherwise the default
    /// under `~/.servedeck/`.
    pub fn socket_path(&self, paths: &DeckPaths) -> PathBuf {
        self.backend
            .socket_path
            .clone()
            .unwrap_or_else(|| paths.backend_socket())
    }

    /// Whether `delete` should prompt before running.
    pub fn confirm_delete(&self) -> bool {
        self.confirm.delete.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_socket_path_defaults_to_deck_dir() {
        let paths = DeckPaths::from_dir(PathBuf::from("/home/user/.servedeck"));
        let config = DeckConfig::default();
        assert_eq!(
            config.socket_path(&paths),
            Path::new("/home/user/.servedeck/backend.sock")
        );
    }

    #[test]
    fn test_socket_path_override() {
        let paths = DeckPaths::from_dir(PathBuf::from("/home/user/.servedeck"));
        let mut config = DeckConfig::default();
        config.backend.socket_path = Some(PathBuf::from("/run/deck.sock"));
        assert_eq!(config.socket_path(&paths), Path::new("/run/deck.sock"));
    }

    #[test]
    fn test_confirm_delete_default_true() {
        assert!(DeckConfig::default().confirm_delete());
        let mut config = DeckConfig::default();
        config.confirm.delete = Some(false);
        assert!(!config.confirm_delete());
    }
}
