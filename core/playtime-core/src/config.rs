//! Data source configuration (`config.toml`).
//!
//! ```toml
//! [steam]
//! enabled = true
//! api_key = "..."
//! steam_id = "76561198000000000"
//! timeout_secs = 10
//! scrape_file = "/path/to/scraped-games.json"
//!
//! [multimc]
//! enabled = true
//! instances_dir = "/home/me/MultiMC/instances"
//! ```
//!
//! A missing file yields the defaults; a malformed one is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub steam_id: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub scrape_file: Option<PathBuf>,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            steam_id: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            scrape_file: None,
        }
    }
}

impl SteamConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.steam_id.is_empty()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MultiMcConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub instances_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MultiMcConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instances_dir: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl MultiMcConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub steam: SteamConfig,
    #[serde(default)]
    pub multimc: MultiMcConfig,
}

/// Loads `config.toml`, returning defaults if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<TrackerConfig, ConfigError> {
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }

    let content = fs_err::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str::<TrackerConfig>(&content).map_err(|err| ConfigError::Malformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let config = load_config(&temp_dir.path().join("missing.toml")).expect("load config");

        assert!(config.steam.enabled);
        assert!(!config.steam.is_configured());
        assert_eq!(config.steam.timeout(), Duration::from_secs(10));
        assert!(config.multimc.instances_dir.is_none());
    }

    #[test]
    fn parses_both_sections() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(
            &path,
            r#"
[steam]
api_key = "KEY"
steam_id = "7656"
timeout_secs = 3

[multimc]
enabled = false
instances_dir = "/games/MultiMC/instances"
"#,
        )
        .expect("write config");

        let config = load_config(&path).expect("load config");
        assert!(config.steam.is_configured());
        assert_eq!(config.steam.timeout_secs, 3);
        assert!(!config.multimc.enabled);
        assert_eq!(
            config.multimc.instances_dir,
            Some(PathBuf::from("/games/MultiMC/instances"))
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("config.toml");
        fs_err::write(&path, "[steam\napi_key = ").expect("write config");

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Malformed { .. })
        ));
    }
}
