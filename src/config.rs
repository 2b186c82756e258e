//! Shell configuration

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Image opened when none is given on the command line.
    pub image_path: Option<PathBuf>,
    /// Partition table slot to mount; the first FAT16 entry when unset.
    pub partition_index: Option<usize>,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
    /// Directory `save` writes into when given a bare name.
    pub save_dir: Option<PathBuf>,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            image_path: None,
            partition_index: None,
            log_level: "info".to_string(),
            save_dir: None,
        }
    }
}

impl ShellConfig {
    /// Get the user config directory path
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rusty-fat16"))
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        Self::user_config_dir().map(|dir| dir.join(CONFIG_FILE))
    }

    /// Load from the user config directory, then `./config.json`, falling
    /// back to defaults.
    pub fn load() -> Self {
        if let Some(user_config) = Self::user_config_path() {
            if let Ok(config) = Self::load_from_path(&user_config) {
                return config;
            }
        }

        if let Ok(config) = Self::load_from_path(CONFIG_FILE) {
            return config;
        }

        Self::default()
    }

    /// Save configuration to the user config directory
    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let dir = Self::user_config_dir()
            .ok_or_else(|| anyhow::anyhow!("could not determine user config directory"))?;
        fs::create_dir_all(&dir)?;
        let path = dir.join(CONFIG_FILE);
        self.save_to_path(&path)?;
        Ok(path)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ShellConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Parsed `log_level`, `Info` when unrecognised.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }

    /// Where `save <name>` writes when no host path is given.
    pub fn save_target(&self, name: &str) -> PathBuf {
        match &self.save_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}
