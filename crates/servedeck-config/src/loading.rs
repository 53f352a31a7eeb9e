//! Configuration loading and merging logic.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in the following order (later sources override earlier ones):
//! 1. **Hardcoded defaults** - Built-in fallback values
//! 2. **User config** - `~/.servedeck/config.toml`
//! 3. **Project config** - `./.servedeck/config.toml`
//! 4. **CLI arguments** - Command-line flags (highest priority)

use crate::errors::ConfigError;
use crate::types::{BackendConfig, ConfirmConfig, DeckConfig, PollingConfig};
use crate::validation::validate_config;
use servedeck_paths::DeckPaths;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Load configuration from the hierarchy of config files.
///
/// # Errors
///
/// Returns an error if a config file fails to parse or validation fails.
/// Missing config files are not errors.
pub fn load_hierarchy() -> Result<DeckConfig, ConfigError> {
    let paths = DeckPaths::resolve()?;
    let project_root = std::env::current_dir()?;
    load_hierarchy_from(&paths, &project_root)
}

/// Same as [`load_hierarchy`] with explicit user and project locations.
pub fn load_hierarchy_from(
    paths: &DeckPaths,
    project_root: &Path,
) -> Result<DeckConfig, ConfigError> {
    let mut config = DeckConfig::default();

    for path in [
        paths.user_config(),
        DeckPaths::project_config(project_root),
    ] {
        match load_config_file(&path) {
            Ok(file_config) => {
                debug!(
                    event = "config.file.load_completed",
                    path = %path.display()
                );
                config = merge_configs(config, file_config);
            }
            Err(e) if e.is_file_not_found() => {}
            Err(e) => return Err(e),
        }
    }

    validate_config(&config)?;

    Ok(config)
}

/// Load a configuration file from the given path.
fn load_config_file(path: &Path) -> Result<DeckConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| ConfigError::ConfigParseError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Merge two configurations, with override_config taking precedence.
///
/// Override values replace base values only if present.
pub fn merge_configs(base: DeckConfig, override_config: DeckConfig) -> DeckConfig {
    DeckConfig {
        backend: BackendConfig {
            socket_path: override_config
                .backend
                .socket_path
                .or(base.backend.socket_path),
        },
        polling: PollingConfig::merge(&base.polling, &override_config.polling),
        confirm: ConfirmConfig {
            delete: override_config.confirm.delete.or(base.confirm.delete),
        },
    }
}
