use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::{
    track::DEFAULT_MAX_BLOCKS,
    video::{DEFAULT_BLOCK_SIZE_SEC, DEFAULT_DURATION_SEC},
};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub database: Database,
    pub defaults: Defaults,
    pub http: HttpConfig,
    pub metadata: MetadataConfig,
}

impl Config {
    /// Loads the config file, or the defaults when the file does not exist.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            log::debug!("no config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = toml::from_str(&contents).with_context(|| "Failed to parse config TOML")?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Database {
    pub in_memory: bool,
    pub path: PathBuf,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            in_memory: false,
            path: PathBuf::from("blockdeck.db"),
        }
    }
}

/// Values used by the add operation when the caller leaves them out
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Defaults {
    pub duration_sec: u32,
    pub block_size_sec: u32,
    /// upper bound on the blocks of a single track
    pub max_blocks: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            duration_sec: DEFAULT_DURATION_SEC,
            block_size_sec: DEFAULT_BLOCK_SIZE_SEC,
            max_blocks: DEFAULT_MAX_BLOCKS,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MetadataConfig {
    /// look up the display title when a video is added without one
    pub fetch_titles: bool,
    pub oembed_endpoint: String,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            fetch_titles: true,
            oembed_endpoint: "https://www.youtube.com/oembed".to_string(),
        }
    }
}
