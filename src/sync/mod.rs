//! Sync engine and orchestration
//!
//! Ties the pipeline together: scan the seed against the control's checksum
//! index, map the matches, plan the missing ranges, then write the target
//! in order and verify the end-to-end SHA-1.

mod writer;

use crate::config::DEFAULT_MIN_CHUNK_SIZE;
use crate::control::Control;
use crate::error::Result;
use crate::mapper::ChunkMapper;
use crate::progress::ProgressReporter;
use crate::scan;
use crate::types::{ChunkInfo, SyncSummary};
use std::io::{Seek, Write};
use std::path::Path;

/// The differential reconstruction engine
///
/// Owns the parsed control (and with it the checksum index, shared
/// read-only across scanner workers) and the tunables of a single sync.
pub struct Synchronizer {
    control: Control,
    url: String,
    jobs: usize,
    min_chunk_size: u64,
}

impl Synchronizer {
    /// Create a synchronizer for `control`, fetching missing ranges from
    /// the control's own URL header
    pub fn new(control: Control) -> Self {
        let url = control.url.clone();
        Self {
            control,
            url,
            jobs: 0,
            min_chunk_size: DEFAULT_MIN_CHUNK_SIZE,
        }
    }

    /// Override the remote file URL (the control's URL header is often
    /// relative to the control's own location)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the number of scanner workers (0 = auto-detect CPU count)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Set the minimum reusable chunk size
    pub fn with_min_chunk_size(mut self, min_chunk_size: u64) -> Self {
        self.min_chunk_size = min_chunk_size;
        self
    }

    /// The parsed control this synchronizer works from
    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Scan the seed for reusable chunks without reconstructing anything.
    ///
    /// The returned set is unordered across workers and not yet
    /// deduplicated; feed it through a [`ChunkMapper`] to plan a sync.
    pub fn find_reusable_chunks(&self, seed: &Path) -> Result<Vec<ChunkInfo>> {
        scan::find_reusable_chunks(
            seed,
            &self.control.index,
            u64::from(self.control.block_size),
            self.control.file_length,
            self.effective_jobs(),
        )
    }

    /// Reconstruct the target into `output`, reusing what the seed offers
    /// and fetching the rest from the origin.
    ///
    /// Chunks are written in ascending target order through a multiplexer
    /// feeding an SHA-1 accumulator and the progress sink; a final hash
    /// mismatch fails the sync after the output has been written.
    pub fn sync(
        &self,
        seed: &Path,
        output: &mut (impl Write + Seek),
        progress: &dyn ProgressReporter,
    ) -> Result<SyncSummary> {
        progress.set_description("searching reusable chunks");
        progress.set_total(self.control.file_length);

        let matches = self.find_reusable_chunks(seed)?;

        let mut mapper =
            ChunkMapper::with_min_chunk_size(self.control.file_length, self.min_chunk_size);
        mapper.extend(matches);

        let mapped = mapper.mapped_chunks();
        let missing = mapper.missing_chunks();

        let bytes_reused: u64 = mapped.iter().map(|c| c.size).sum();
        let bytes_fetched: u64 = missing.iter().map(|c| c.size).sum();
        let summary = SyncSummary {
            reusable_chunks: mapped.len(),
            bytes_reused,
            fetched_chunks: missing.len(),
            bytes_fetched,
            file_length: self.control.file_length,
        };

        tracing::info!(
            chunks = summary.reusable_chunks,
            reused_kib = summary.bytes_reused / 1024,
            percent = format!("{:.0}%", summary.savings_percent()),
            "reusable chunks found"
        );

        let mut plan: Vec<ChunkInfo> = mapped;
        plan.extend(missing);
        plan.sort_by_key(|chunk| chunk.target_offset);

        writer::write_chunks(
            seed,
            &self.url,
            self.control.file_length,
            &self.control.sha1,
            &plan,
            output,
            progress,
        )?;

        progress.set_progress(self.control.file_length);
        Ok(summary)
    }

    fn effective_jobs(&self) -> usize {
        if self.jobs == 0 {
            num_cpus::get()
        } else {
            self.jobs
        }
    }
}
