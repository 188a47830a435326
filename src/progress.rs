//! Progress reporting for blocksync

use indicatif::{ProgressBar, ProgressStyle};

/// Observer for sync progress
///
/// `add_bytes` is the write-through hook: the chunk copy loop reports every
/// run of bytes it moves. A no-op implementation costs one virtual dispatch
/// per call and nothing else.
pub trait ProgressReporter {
    /// Describe the current phase
    fn set_description(&self, label: &str);

    /// Set the total number of bytes the phase will process
    fn set_total(&self, value: u64);

    /// Set the absolute position within the phase
    fn set_progress(&self, value: u64);

    /// Record bytes written through the reconstruction multiplexer
    fn add_bytes(&self, n: u64);
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn set_description(&self, _label: &str) {}
    fn set_total(&self, _value: u64) {}
    fn set_progress(&self, _value: u64) {}
    fn add_bytes(&self, _n: u64) {}
}

/// Terminal progress bar
pub struct ConsoleProgress {
    bar: ProgressBar,
}

impl ConsoleProgress {
    /// Create a byte-denominated progress bar
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg:.dim} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})")
                .unwrap()
                .progress_chars("=>-"),
        );
        Self { bar }
    }

    /// Finish and clear the bar
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn set_description(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn set_total(&self, value: u64) {
        self.bar.set_length(value);
    }

    fn set_progress(&self, value: u64) {
        self.bar.set_position(value);
    }

    fn add_bytes(&self, n: u64) {
        self.bar.inc(n);
    }
}
