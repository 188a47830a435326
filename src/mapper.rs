//! Chunk mapper
//!
//! Collects the scanner's match stream keyed by target offset, resolves
//! duplicates, filters out matches too small to be worth a seek, and
//! computes the complementary set of target ranges that must be fetched
//! from the origin. Retained and missing chunks together tile the target
//! exactly.

use crate::config::DEFAULT_MIN_CHUNK_SIZE;
use crate::types::{ChunkInfo, ChunkOrigin};
use std::collections::HashMap;

/// Accumulates matches by target offset and derives the fetch plan
#[derive(Debug)]
pub struct ChunkMapper {
    file_size: u64,
    min_chunk_size: u64,
    chunks: HashMap<u64, ChunkInfo>,
}

impl ChunkMapper {
    /// Create a mapper for a target of `file_size` bytes with the default
    /// minimum chunk size
    pub fn new(file_size: u64) -> Self {
        Self::with_min_chunk_size(file_size, DEFAULT_MIN_CHUNK_SIZE)
    }

    /// Create a mapper with an explicit minimum chunk size.
    ///
    /// Matches of `min_chunk_size` bytes or fewer are dropped unless they
    /// terminate exactly at the end of the target; the threshold is a seek
    /// heuristic, not part of the wire protocol.
    pub fn with_min_chunk_size(file_size: u64, min_chunk_size: u64) -> Self {
        Self {
            file_size,
            min_chunk_size,
            chunks: HashMap::new(),
        }
    }

    /// Record one match.
    ///
    /// On duplicate target offsets the record with `source_offset ==
    /// target_offset` wins; otherwise the first record is kept.
    pub fn add(&mut self, chunk: ChunkInfo) {
        match self.chunks.get_mut(&chunk.target_offset) {
            Some(existing) => {
                if chunk.source_offset == chunk.target_offset {
                    *existing = chunk;
                }
            }
            None => {
                self.chunks.insert(chunk.target_offset, chunk);
            }
        }
    }

    /// Record a batch of matches
    pub fn extend(&mut self, chunks: impl IntoIterator<Item = ChunkInfo>) {
        for chunk in chunks {
            self.add(chunk);
        }
    }

    /// Retained matches, sorted ascending by target offset
    pub fn mapped_chunks(&self) -> Vec<ChunkInfo> {
        let mut list: Vec<ChunkInfo> = self
            .chunks
            .values()
            .filter(|chunk| {
                chunk.size > self.min_chunk_size
                    || chunk.target_offset + chunk.size == self.file_size
            })
            .copied()
            .collect();
        list.sort_by_key(|chunk| chunk.target_offset);
        list
    }

    /// The complement of the retained matches: every target range not
    /// covered by a mapped chunk, to be fetched from the origin
    pub fn missing_chunks(&self) -> Vec<ChunkInfo> {
        let mapped = self.mapped_chunks();
        let mut missing = Vec::new();

        let mut past_end = 0u64;
        for chunk in &mapped {
            if past_end != chunk.target_offset {
                missing.push(ChunkInfo {
                    size: chunk.target_offset - past_end,
                    source: ChunkOrigin::Remote,
                    source_offset: past_end,
                    target_offset: past_end,
                });
            }
            past_end = chunk.target_offset + chunk.size;
        }

        if past_end != self.file_size {
            missing.push(ChunkInfo {
                size: self.file_size - past_end,
                source: ChunkOrigin::Remote,
                source_offset: past_end,
                target_offset: past_end,
            });
        }

        missing
    }
}
