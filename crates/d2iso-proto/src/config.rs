use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the appliance web service.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Seconds between `/api/status` polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Seconds between `/api/archive` refreshes.
    #[serde(default = "default_archive_refresh_secs")]
    pub archive_refresh_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show the keybinding bar at the bottom.
    #[serde(default = "default_show_keys")]
    pub show_keys: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            poll_interval_secs: default_poll_interval_secs(),
            archive_refresh_secs: default_archive_refresh_secs(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_keys: default_show_keys(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_archive_refresh_secs() -> u64 {
    60
}

fn default_show_keys() -> bool {
    true
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.backend.poll_interval_secs, 5);
        assert_eq!(config.backend.archive_refresh_secs, 60);
        assert!(config.ui.show_keys);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str("[backend]\nbase_url = \"http://nas:5000\"\n").unwrap();
        assert_eq!(config.backend.base_url, "http://nas:5000");
        assert_eq!(config.backend.poll_interval_secs, 5);
    }
}
