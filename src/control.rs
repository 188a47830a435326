//! Control document parser
//!
//! A `.zsync` control document is a text header of `Key: Value` lines
//! terminated by a blank line, followed by a packed binary table of one
//! checksum record per target block. Weak checksums are stored big-endian
//! on the wire and reversed into the little-endian internal representation
//! on load; strong checksums are stored verbatim, truncated to the declared
//! length.

use crate::error::{Error, Result};
use crate::index::ChecksumIndex;
use crate::types::BlockChecksum;
use crate::verify::BlockVerifier;
use std::io::{BufRead, BufReader, Read};

/// The `Hash-Lengths` triple from the control header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashLengths {
    /// Consecutive weak matches required before trusting a candidate (1 or 2).
    ///
    /// Validated but not acted on: the scanner always confirms with the
    /// strong checksum on the first weak hit.
    pub consecutive_matches: u8,

    /// Significant bytes of each weak checksum (1..=4)
    pub weak_bytes: u8,

    /// Significant bytes of each strong checksum (3..=16)
    pub strong_bytes: u8,
}

/// Parsed control document: header fields plus the checksum index
#[derive(Debug, Clone)]
pub struct Control {
    /// `zsync` header value (producer version)
    pub version: String,

    /// Name of the target file
    pub filename: String,

    /// Modification time string, verbatim
    pub mtime: String,

    /// Target block size in bytes
    pub block_size: u32,

    /// Target file length in bytes
    pub file_length: u64,

    /// Declared hash lengths
    pub hash_lengths: HashLengths,

    /// Remote file URL (may be relative to the control's own location)
    pub url: String,

    /// Expected hex SHA-1 of the whole target file
    pub sha1: String,

    /// Lookup table over the block checksums
    pub index: ChecksumIndex,
}

impl Control {
    /// Number of blocks in the checksum table
    pub fn block_count(&self) -> usize {
        self.index.block_count()
    }

    /// Block verifier over this control's strong checksums
    pub fn verifier(&self) -> BlockVerifier {
        BlockVerifier::new(
            self.block_size as usize,
            self.index.strong_len(),
            self.index.strong_checksums(),
        )
    }
}

#[derive(Default)]
struct HeaderFields {
    version: String,
    filename: String,
    mtime: String,
    block_size: Option<u32>,
    file_length: Option<u64>,
    hash_lengths: Option<HashLengths>,
    url: String,
    sha1: String,
}

/// Parse a control document from an ordered byte stream
pub fn read_control(input: impl Read) -> Result<Control> {
    let mut reader = BufReader::new(input);
    let header = read_header(&mut reader)?;

    let block_size = header
        .block_size
        .ok_or_else(|| Error::control("missing or invalid Blocksize header"))?;
    let file_length = header
        .file_length
        .ok_or_else(|| Error::control("missing or invalid Length header"))?;
    let hash_lengths = header
        .hash_lengths
        .ok_or_else(|| Error::control("missing Hash-Lengths header"))?;

    let blocks = file_length.div_ceil(u64::from(block_size));
    let records = read_checksums(
        &mut reader,
        blocks,
        usize::from(hash_lengths.weak_bytes),
        usize::from(hash_lengths.strong_bytes),
    )?;

    tracing::debug!(
        filename = %header.filename,
        block_size,
        file_length,
        blocks,
        "control parsed"
    );

    Ok(Control {
        version: header.version,
        filename: header.filename,
        mtime: header.mtime,
        block_size,
        file_length,
        hash_lengths,
        url: header.url,
        sha1: header.sha1,
        index: ChecksumIndex::new(records, hash_lengths.weak_bytes, hash_lengths.strong_bytes),
    })
}

fn read_header(reader: &mut impl BufRead) -> Result<HeaderFields> {
    let mut fields = HeaderFields::default();
    let mut line = String::new();

    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| Error::control(format!("reading header: {}", e)))?;
        if n == 0 {
            return Err(Error::control("header not terminated by a blank line"));
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            break;
        }

        let (key, value) = match trimmed.split_once(':') {
            Some((key, value)) => (key.to_ascii_lowercase(), value.trim()),
            None => (trimmed.to_ascii_lowercase(), ""),
        };
        set_header_value(&mut fields, &key, value)?;
    }

    Ok(fields)
}

fn set_header_value(fields: &mut HeaderFields, key: &str, value: &str) -> Result<()> {
    match key {
        "zsync" => fields.version = value.to_string(),
        "filename" => fields.filename = value.to_string(),
        "mtime" => fields.mtime = value.to_string(),
        "blocksize" => {
            let parsed: u32 = value
                .parse()
                .map_err(|_| Error::control(format!("invalid Blocksize value: {:?}", value)))?;
            if parsed == 0 {
                return Err(Error::control("Blocksize must be positive"));
            }
            fields.block_size = Some(parsed);
        }
        "length" => {
            let parsed: u64 = value
                .parse()
                .map_err(|_| Error::control(format!("invalid Length value: {:?}", value)))?;
            fields.file_length = Some(parsed);
        }
        "hash-lengths" => fields.hash_lengths = Some(parse_hash_lengths(value)?),
        "url" => fields.url = value.to_string(),
        "sha-1" => fields.sha1 = value.to_string(),
        other => tracing::warn!(key = %other, "ignoring unknown control key"),
    }
    Ok(())
}

fn parse_hash_lengths(value: &str) -> Result<HashLengths> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(Error::control(format!(
            "invalid Hash-Lengths entry {:?}, expected three comma-separated integers",
            value
        )));
    }

    let mut numbers = [0u8; 3];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|_| Error::control(format!("invalid Hash-Lengths entry {:?}", value)))?;
    }

    let lengths = HashLengths {
        consecutive_matches: numbers[0],
        weak_bytes: numbers[1],
        strong_bytes: numbers[2],
    };

    if !(1..=2).contains(&lengths.consecutive_matches) {
        return Err(Error::UnsupportedHashLengths {
            message: format!(
                "consecutive matches must be in [1, 2], got {}",
                lengths.consecutive_matches
            ),
        });
    }
    if !(1..=4).contains(&lengths.weak_bytes) {
        return Err(Error::UnsupportedHashLengths {
            message: format!("weak checksum bytes must be in [1, 4], got {}", lengths.weak_bytes),
        });
    }
    if !(3..=16).contains(&lengths.strong_bytes) {
        return Err(Error::UnsupportedHashLengths {
            message: format!(
                "strong checksum bytes must be in [3, 16], got {}",
                lengths.strong_bytes
            ),
        });
    }

    Ok(lengths)
}

fn read_checksums(
    reader: &mut impl Read,
    blocks: u64,
    weak_bytes: usize,
    strong_bytes: usize,
) -> Result<Vec<BlockChecksum>> {
    let mut records = Vec::with_capacity(blocks as usize);
    let mut wire = [0u8; 4];

    for block in 0..blocks {
        reader
            .read_exact(&mut wire[..weak_bytes])
            .map_err(|_| Error::control(format!("truncated checksum table at block {}", block)))?;

        // reverse the big-endian wire bytes into the little-endian internal
        // form; truncated checksums populate the most significant bytes
        let mut internal = [0u8; 4];
        for (i, &byte) in wire[..weak_bytes].iter().enumerate() {
            internal[3 - i] = byte;
        }

        let mut strong = [0u8; 16];
        reader
            .read_exact(&mut strong[..strong_bytes])
            .map_err(|_| Error::control(format!("truncated checksum table at block {}", block)))?;

        records.push(BlockChecksum {
            block_index: block as u32,
            weak: u32::from_le_bytes(internal),
            strong,
        });
    }

    Ok(records)
}
