//! Storage configuration and path management.
//!
//! All file paths live behind [`StorageConfig`] so tests can point the whole
//! application at a temp directory with [`StorageConfig::with_root`].
//!
//! Layout (default root `~/.playtime/`):
//!
//! ```text
//! ~/.playtime/
//! ├── history.json   play history document
//! ├── config.toml    data source configuration
//! └── logs/          rolling log files
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct StorageConfig {
    root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            root: home.join(".playtime"),
        }
    }
}

impl StorageConfig {
    /// Creates a StorageConfig with a custom root directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to history.json (the play history document).
    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.json")
    }

    /// Path to config.toml (data source settings).
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    /// Path to logs/ directory.
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Ensures the root directory and standard subdirectories exist.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs_err::create_dir_all(&self.root)?;
        fs_err::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_root_is_under_home() {
        let config = StorageConfig::default();
        assert!(config.root().ends_with(".playtime"));
    }

    #[test]
    fn paths_are_relative_to_root() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().to_path_buf());

        assert_eq!(config.history_file(), temp.path().join("history.json"));
        assert_eq!(config.config_file(), temp.path().join("config.toml"));
        assert_eq!(config.logs_dir(), temp.path().join("logs"));
    }

    #[test]
    fn ensure_dirs_creates_layout() {
        let temp = TempDir::new().unwrap();
        let config = StorageConfig::with_root(temp.path().join("nested"));

        config.ensure_dirs().unwrap();

        assert!(config.root().is_dir());
        assert!(config.logs_dir().is_dir());
    }
}
