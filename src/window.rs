//! Hashed scan window
//!
//! A fixed-size ring buffer holding the block currently under the scanner,
//! with a co-maintained rolling weak hash. Bytes written while the ring is
//! filling prime the hash; once the ring is at capacity every written byte
//! evicts the oldest one and slides the hash.

use crate::rollsum::RollingHash;
use md4::{Digest, Md4};

/// Ring buffer of `block_size` bytes plus rolling-hash state
#[derive(Debug)]
pub struct HashedWindow {
    buf: Vec<u8>,
    head: usize,
    len: usize,
    hash: RollingHash,
}

impl HashedWindow {
    /// Create an empty window of `block_size` bytes
    pub fn new(block_size: usize) -> Self {
        Self {
            buf: vec![0; block_size],
            head: 0,
            len: 0,
            hash: RollingHash::new(block_size),
        }
    }

    /// Window capacity in bytes
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Number of bytes currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// True until the first byte is written
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append bytes, evicting the oldest bytes once capacity is exceeded.
    ///
    /// Works for both the block-at-a-time fills that prime a scan range and
    /// the byte-at-a-time slides of the scan loop; the rolling hash tracks
    /// the window content either way.
    pub fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.push(byte);
        }
    }

    fn push(&mut self, byte: u8) {
        let capacity = self.buf.len();
        if self.len == capacity {
            let evicted = self.buf[self.head];
            self.buf[self.head] = byte;
            self.head = (self.head + 1) % capacity;
            self.hash.slide(byte, evicted);
        } else {
            let remaining = (capacity - self.len) as u16;
            let tail = (self.head + self.len) % capacity;
            self.buf[tail] = byte;
            self.len += 1;
            self.hash.append(byte, remaining);
        }
    }

    /// Current window content as up to two contiguous slices, oldest first
    pub fn as_slices(&self) -> (&[u8], &[u8]) {
        let capacity = self.buf.len();
        let end = self.head + self.len;
        if end <= capacity {
            (&self.buf[self.head..end], &[])
        } else {
            (&self.buf[self.head..], &self.buf[..end - capacity])
        }
    }

    /// Weak rolling checksum of the current content
    pub fn weak_sum(&self) -> u32 {
        self.hash.sum()
    }

    /// Weak checksum in its little-endian serialized form
    pub fn weak_sum_bytes(&self) -> [u8; 4] {
        self.hash.sum_bytes()
    }

    /// Weak checksum as lowercase hex, for diagnostics
    pub fn weak_sum_hex(&self) -> String {
        hex::encode(self.weak_sum_bytes())
    }

    /// MD4 of the current content
    ///
    /// The protocol truncates this to the control's `strong_bytes`; callers
    /// compare prefixes, so the full digest is returned here.
    pub fn strong_sum(&self) -> [u8; 16] {
        let (front, back) = self.as_slices();
        let mut md4 = Md4::new();
        md4.update(front);
        md4.update(back);
        md4.finalize().into()
    }

    /// Strong checksum as lowercase hex, for diagnostics
    pub fn strong_sum_hex(&self) -> String {
        hex::encode(self.strong_sum())
    }

    /// Clear the buffer and the hash state
    pub fn reset(&mut self) {
        self.head = 0;
        self.len = 0;
        self.hash.reset();
    }
}
