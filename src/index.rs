//! Checksum index
//!
//! Two-level lookup table over the control's block checksums. The outer key
//! is the most significant half of the internal weak checksum, which is the
//! wire-order prefix: controls that truncate the weak checksum below four
//! bytes keep exactly that half populated. Most scan positions miss at the
//! outer lookup, keeping the hot path to one hash probe.
//!
//! Candidates surviving the weak probe are narrowed by prefix comparison
//! over the stored (truncated) strong checksum; a residual false positive
//! is caught by the end-to-end SHA-1 gate.

use crate::types::BlockChecksum;
use std::collections::HashMap;

/// Immutable lookup table from weak checksum to candidate blocks
///
/// Built once from the parsed control and shared read-only across all
/// scanner workers. Buckets preserve ascending block order.
#[derive(Debug, Clone)]
pub struct ChecksumIndex {
    buckets: HashMap<u16, Vec<BlockChecksum>>,
    weak_mask: u32,
    strong_len: usize,
    block_count: usize,
}

impl ChecksumIndex {
    /// Build the index from the control's checksum records.
    ///
    /// `weak_bytes` and `strong_bytes` are the control's declared hash
    /// lengths; they determine which bytes of each checksum are significant.
    pub fn new(records: Vec<BlockChecksum>, weak_bytes: u8, strong_bytes: u8) -> Self {
        let weak_mask = weak_mask(weak_bytes);
        let strong_len = usize::from(strong_bytes).min(16);
        let block_count = records.len();

        let mut buckets: HashMap<u16, Vec<BlockChecksum>> = HashMap::new();
        for record in records {
            buckets
                .entry(bucket_key(record.weak, weak_mask))
                .or_default()
                .push(record);
        }

        Self {
            buckets,
            weak_mask,
            strong_len,
            block_count,
        }
    }

    /// Number of blocks the control describes
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// True when the control describes an empty file
    pub fn is_empty(&self) -> bool {
        self.block_count == 0
    }

    /// Number of significant strong-checksum bytes
    pub fn strong_len(&self) -> usize {
        self.strong_len
    }

    /// Look up the bucket for a window's weak checksum
    pub fn find_by_weak(&self, weak: u32) -> Option<&[BlockChecksum]> {
        self.buckets
            .get(&bucket_key(weak, self.weak_mask))
            .map(Vec::as_slice)
    }

    /// Narrow a bucket to the records whose stored strong checksum matches
    /// the supplied digest prefix-wise
    pub fn find_strong_in_bucket<'a>(
        &self,
        strong: &[u8; 16],
        bucket: &'a [BlockChecksum],
    ) -> Vec<&'a BlockChecksum> {
        bucket
            .iter()
            .filter(|record| record.strong[..self.strong_len] == strong[..self.strong_len])
            .collect()
    }

    /// Truncated strong checksums in block order, for the block verifier
    pub fn strong_checksums(&self) -> Vec<[u8; 16]> {
        let mut records: Vec<&BlockChecksum> = self.buckets.values().flatten().collect();
        records.sort_by_key(|record| record.block_index);
        records.iter().map(|record| record.strong).collect()
    }
}

/// Mask selecting the significant bytes of an internal weak checksum
fn weak_mask(weak_bytes: u8) -> u32 {
    if weak_bytes >= 4 {
        u32::MAX
    } else {
        u32::MAX << (8 * (4 - u32::from(weak_bytes)))
    }
}

fn bucket_key(weak: u32, mask: u32) -> u16 {
    ((weak & mask) >> 16) as u16
}
