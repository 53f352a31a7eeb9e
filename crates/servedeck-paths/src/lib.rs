use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("home directory not found, set the $HOME environment variable")]
    HomeNotFound,
}

/// Centralized path construction for the `~/.servedeck/` directory layout.
///
/// Single source of truth for every path under `~/.servedeck/`. Use `resolve()`
/// in production code and `from_dir()` in tests.
#[derive(Debug, Clone)]
pub struct DeckPaths {
    deck_dir: PathBuf,
}

impl DeckPaths {
    /// Resolve paths from the user's home directory (`~/.servedeck`).
    pub fn resolve() -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::HomeNotFound)?;
        Ok(Self {
            deck_dir: home.join(".servedeck"),
        })
    }

    /// Create paths from an explicit base directory. Use in tests.
    pub fn from_dir(deck_dir: PathBuf) -> Self {
        Self { deck_dir }
    }

    /// The base `~/.servedeck` directory.
    pub fn deck_dir(&self) -> &Path {
        &self.deck_dir
    }

    /// Unix socket the backend process listens on.
    pub fn backend_socket(&self) -> PathBuf {
        self.deck_dir.join("backend.sock")
    }

    pub fn user_config(&self) -> PathBuf {
        self.deck_dir.join("config.toml")
    }

    /// Project-level config: `<project_root>/.servedeck/config.toml`.
    pub fn project_config(project_root: &Path) -> PathBuf {
        project_root.join(".servedeck").join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_paths() -> DeckPaths {
        DeckPaths::from_dir(PathBuf::from("/home/user/.servedeck"))
    }

    #[test]
    fn test_resolve_returns_ok_when_home_set() {
        // HOME is set in CI and dev environments
        let result = DeckPaths::resolve();
        assert!(result.is_ok());
        let paths = result.unwrap();
        assert!(paths.deck_dir().to_string_lossy().contains(".servedeck"));
    }

    #[test]
    fn test_from_dir() {
        let paths = DeckPaths::from_dir(PathBuf::from("/tmp/test-deck"));
        assert_eq!(paths.deck_dir(), Path::new("/tmp/test-deck"));
    }

    #[test]
    fn test_backend_socket() {
        assert_eq!(
            test_paths().backend_socket(),
            PathBuf::from("/home/user/.servedeck/backend.sock")
        );
    }

    #[test]
    fn test_user_config() {
        assert_eq!(
            test_paths().user_config(),
            PathBuf::from("/home/user/.servedeck/config.toml")
        );
    }

    #[test]
    fn test_project_config() {
        assert_eq!(
            DeckPaths::project_config(Path::new("/work/app")),
            PathBuf::from("/work/app/.servedeck/config.toml")
        );
    }
}
