//! Core domain types for blocksync

use serde::{Deserialize, Serialize};

/// Where the bytes of a chunk come from during reconstruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkOrigin {
    /// Copy from the local seed file
    Seed,

    /// Fetch from the remote origin with a range request
    Remote,
}

/// A contiguous run of bytes to be placed into the output file
///
/// Matches emitted by the scanner carry [`ChunkOrigin::Seed`]; the gaps
/// computed by the chunk mapper carry [`ChunkOrigin::Remote`] with
/// `source_offset == target_offset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Number of bytes in this chunk
    pub size: u64,

    /// Which byte source satisfies this chunk
    pub source: ChunkOrigin,

    /// Offset of the chunk in its source
    pub source_offset: u64,

    /// Offset of the chunk in the target file
    pub target_offset: u64,
}

/// Checksum record for a single target block, as read from the control
///
/// `weak` is the little-endian internal form of the wire checksum; only the
/// most significant `weak_bytes` bytes are populated when the control
/// truncates the weak checksum. `strong` holds the truncated MD4 in its
/// first `strong_bytes` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockChecksum {
    /// Block index in the target file (offset in blocks, not bytes)
    pub block_index: u32,

    /// Weak rolling checksum, internal representation
    pub weak: u32,

    /// Truncated strong checksum, zero-filled past the truncation point
    pub strong: [u8; 16],
}

/// Statistics for a completed sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    /// Reusable chunks copied from the seed
    pub reusable_chunks: usize,

    /// Bytes copied from the seed
    pub bytes_reused: u64,

    /// Missing chunks fetched over HTTP
    pub fetched_chunks: usize,

    /// Bytes fetched over HTTP
    pub bytes_fetched: u64,

    /// Total length of the reconstructed file
    pub file_length: u64,
}

impl SyncSummary {
    /// Share of the target that was served from the seed
    pub fn savings_percent(&self) -> f64 {
        if self.file_length == 0 {
            0.0
        } else {
            (self.bytes_reused as f64 / self.file_length as f64) * 100.0
        }
    }
}
