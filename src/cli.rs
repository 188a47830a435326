//! CLI argument parsing for blocksync

use clap::Parser;
use std::path::PathBuf;

/// blocksync - differential file downloader speaking the zsync protocol
#[derive(Parser, Debug)]
#[command(name = "blocksync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path or URL of the .zsync control document
    pub control: String,

    /// Seed file to reuse blocks from [default: the control's Filename]
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// Output path [default: <Filename>.part]
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Remote file URL, overriding the control's URL header
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Number of scanner workers [default: auto]
    #[arg(short = 'j', long, default_value = "0")]
    pub jobs: usize,

    /// Show a progress bar
    #[arg(short = 'P', long)]
    pub progress: bool,

    /// Minimum reusable chunk size in bytes
    #[arg(long, default_value_t = crate::config::DEFAULT_MIN_CHUNK_SIZE)]
    pub min_chunk_size: u64,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long)]
    pub json: bool,

    /// Configuration file path
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    /// Convert CLI args to Config, merging with file config
    pub fn to_config(&self) -> crate::config::Config {
        let mut config = if let Some(ref path) = self.config {
            crate::config::Config::load_from(path).unwrap_or_default()
        } else {
            crate::config::Config::load().unwrap_or_default()
        };

        // CLI args override config file
        config.jobs = self.jobs;
        config.progress = self.progress;
        config.verbose = self.verbose;
        config.min_chunk_size = self.min_chunk_size;

        config
    }
}
