use anyhow::{Context, Result};
use calsync_core::SyncOptions;
use calsync_core::diff::DeletionFuse;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory holding the event and credential records
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Local user the CLI acts as
    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub sync: SyncSection,
}

/// Optional `[sync]` table. Anything left out keeps the engine default.
#[derive(Debug, Default, Deserialize)]
pub struct SyncSection {
    pub push_concurrency: Option<usize>,
    /// Human-readable, e.g. "30s"
    pub remote_timeout: Option<String>,
    pub default_color: Option<String>,
    pub deletion_fuse: Option<DeletionFuse>,
}

fn default_data_dir() -> String {
    dirs::data_dir()
        .map(|d| d.join("calsync").to_string_lossy().into_owned())
        .unwrap_or_else(|| "~/.calsync".to_string())
}

fn default_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "me".to_string())
}

impl Config {
    pub fn data_path(&self) -> PathBuf {
        expand_path(&self.data_dir)
    }

    pub fn sync_options(&self) -> Result<SyncOptions> {
        let mut options = SyncOptions::default();

        if let Some(n) = self.sync.push_concurrency {
            options.push_concurrency = n.max(1);
        }
        if let Some(ref timeout) = self.sync.remote_timeout {
            options.remote_timeout = humantime::parse_duration(timeout)
                .with_context(|| format!("Invalid remote_timeout \"{}\"", timeout))?;
        }
        if let Some(ref color) = self.sync.default_color {
            options.default_color = color.clone();
        }
        if let Some(fuse) = self.sync.deletion_fuse {
            options.deletion_fuse = fuse;
        }

        Ok(options)
    }
}

/// Get the config directory path (~/.config/calsync)
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("calsync");
    Ok(config_dir)
}

/// Load ~/.config/calsync/config.toml, or defaults when it does not exist.
pub fn load_config() -> Result<Config> {
    load_config_from(&config_dir()?.join("config.toml"))
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let contents = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?
    } else {
        String::new()
    };

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

    Ok(config)
}

/// Expand ~ in paths to the home directory
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
