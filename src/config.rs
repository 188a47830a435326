//! Configuration management for blocksync

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default minimum reusable chunk size in bytes.
///
/// Matches at or below this size are not worth a seek into the seed unless
/// they terminate the file; the value is a heuristic, not wire protocol.
pub const DEFAULT_MIN_CHUNK_SIZE: u64 = 1024;

/// Default number of scanner workers (0 = auto-detect CPU count)
pub const DEFAULT_JOBS: usize = 0;

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of parallel scanner workers (0 = auto-detect CPU count)
    pub jobs: usize,

    /// Show a progress bar
    pub progress: bool,

    /// Verbose logging level (0-3)
    pub verbose: u8,

    /// Minimum reusable chunk size in bytes
    pub min_chunk_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            progress: true,
            verbose: 0,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the default config file
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("reading config: {}", e)))?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("creating config dir: {}", e)))?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("serializing config: {}", e)))?;
        std::fs::write(path, contents).map_err(|e| Error::config(format!("writing config: {}", e)))?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("blocksync").join("config.toml"))
            .ok_or_else(|| Error::config("could not determine config directory"))
    }

    /// Get the effective number of workers (resolves 0 to CPU count)
    pub fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }
}
