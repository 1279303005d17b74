use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lastfm::DEFAULT_API_URL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub allowed_tags: Vec<String>,
    pub denied_tags: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: 15,
            allowed_tags: Vec::new(),
            denied_tags: Vec::new(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&contents)
                .with_context(|| format!("invalid config at {}", config_path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, json)?;

        Ok(())
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not find config directory")?;
        Ok(config_dir.join("track-tagger").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            anyhow::bail!("A Last.fm API key is required (--api-key or LASTFM_API_KEY)");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("Request timeout must be at least one second");
        }
        Ok(())
    }
}

pub fn load_config() -> Result<Config> {
    Config::load()
}

pub fn save_config(config: &Config) -> Result<PathBuf> {
    config.save()
}

/// Check the batch directory before anything runs
pub fn validate_directory(input: &str) -> Result<PathBuf> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        anyhow::bail!("No music directory given");
    }

    let path = PathBuf::from(trimmed);
    if !path.exists() {
        anyhow::bail!("Directory does not exist: {}", path.display());
    }
    if !path.is_dir() {
        anyhow::bail!("Not a directory: {}", path.display());
    }
    Ok(path)
}
