//! blocksync - differential file downloader speaking the zsync protocol

use blocksync::cli::Cli;
use blocksync::control::{read_control, Control};
use blocksync::progress::{ConsoleProgress, NoProgress, ProgressReporter};
use blocksync::sync::Synchronizer;
use clap::Parser;
use human_bytes::human_bytes;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use url::Url;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.json);

    let config = cli.to_config();
    let control = fetch_control(&cli.control)?;

    tracing::info!(
        filename = %control.filename,
        length = control.file_length,
        block_size = control.block_size,
        blocks = control.block_count(),
        "control parsed"
    );

    let seed = cli
        .input
        .clone()
        .unwrap_or_else(|| PathBuf::from(&control.filename));
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.part", control.filename)));

    let mut synchronizer = Synchronizer::new(control)
        .with_jobs(config.effective_jobs())
        .with_min_chunk_size(config.min_chunk_size);
    if let Some(ref url) = cli.url {
        Url::parse(url).map_err(|e| anyhow::anyhow!("invalid URL {:?}: {}", url, e))?;
        synchronizer = synchronizer.with_url(url.clone());
    }

    let mut output = File::create(&output_path)?;

    let console = config.progress.then(ConsoleProgress::new);
    let progress: &dyn ProgressReporter = match &console {
        Some(bar) => bar,
        None => &NoProgress,
    };

    let summary = synchronizer.sync(&seed, &mut output, progress)?;
    if let Some(bar) = &console {
        bar.finish();
    }

    tracing::info!(
        output = %output_path.display(),
        reused = %human_bytes(summary.bytes_reused as f64),
        fetched = %human_bytes(summary.bytes_fetched as f64),
        savings = format!("{:.1}%", summary.savings_percent()),
        "sync complete"
    );

    Ok(())
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = match verbose {
        0 => EnvFilter::new("blocksync=info"),
        1 => EnvFilter::new("blocksync=debug"),
        2 => EnvFilter::new("blocksync=trace"),
        _ => EnvFilter::new("trace"),
    };

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

/// Read the control document from a local path or fetch it with a plain GET
fn fetch_control(location: &str) -> anyhow::Result<Control> {
    if location.starts_with("http://") || location.starts_with("https://") {
        tracing::debug!(url = %location, "fetching control document");
        let response = reqwest::blocking::get(location)?.error_for_status()?;
        let body = response.bytes()?;
        Ok(read_control(body.as_ref())?)
    } else {
        let file = File::open(location)
            .map_err(|e| anyhow::anyhow!("opening control {:?}: {}", location, e))?;
        Ok(read_control(file)?)
    }
}
