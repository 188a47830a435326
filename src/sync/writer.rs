//! Reconstruction writer
//!
//! Walks the planned chunks in target-offset order, copies each one from
//! its source into the output, and feeds every byte through an SHA-1
//! accumulator and the progress sink. Missing chunks are requested from the
//! origin whole, so one range request covers the entire fetch. After the
//! last chunk the accumulated SHA-1 must match the control's declared
//! value.

use crate::error::{Error, Result};
use crate::progress::ProgressReporter;
use crate::source::HttpRangeSource;
use crate::types::{ChunkInfo, ChunkOrigin};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Write `chunks` (sorted by target offset, tiling the whole target) into
/// `output` and verify the end-to-end SHA-1
pub(crate) fn write_chunks(
    seed: &Path,
    url: &str,
    file_length: u64,
    expected_sha1: &str,
    chunks: &[ChunkInfo],
    output: &mut (impl Write + Seek),
    progress: &dyn ProgressReporter,
) -> Result<()> {
    let mut seed_file = File::open(seed)
        .map_err(|e| Error::seed_io(format!("opening {}", seed.display()), e))?;
    let mut remote = HttpRangeSource::new(url, file_length);
    let mut hasher = Sha1::new();
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];

    progress.set_description("merging chunks");
    progress.set_total(file_length);

    for chunk in chunks {
        output
            .seek(SeekFrom::Start(chunk.target_offset))
            .map_err(|e| Error::output_io("seeking output", e))?;

        match chunk.source {
            ChunkOrigin::Seed => {
                seed_file
                    .seek(SeekFrom::Start(chunk.source_offset))
                    .map_err(|e| Error::seed_io("seeking seed", e))?;
                copy_chunk(
                    &mut seed_file,
                    &mut *output,
                    &mut hasher,
                    progress,
                    chunk.size,
                    &mut buf,
                    &|e| Error::seed_io("reading seed chunk", e),
                )?;
            }
            ChunkOrigin::Remote => {
                remote
                    .seek(SeekFrom::Start(chunk.source_offset))
                    .map_err(|e| Error::remote(url, e.to_string()))?;
                // request the whole chunk in advance to avoid small requests
                remote.request(chunk.size)?;
                copy_chunk(
                    &mut remote,
                    &mut *output,
                    &mut hasher,
                    progress,
                    chunk.size,
                    &mut buf,
                    &|e| remote_read_error(url, e),
                )?;
            }
        }
    }

    output
        .flush()
        .map_err(|e| Error::output_io("flushing output", e))?;

    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected_sha1) {
        return Err(Error::ChecksumMismatch {
            expected: expected_sha1.to_string(),
            actual,
        });
    }

    tracing::debug!(sha1 = %actual, "output checksum verified");
    Ok(())
}

/// Copy exactly `size` bytes from `reader` into the output, the SHA-1
/// accumulator, and the progress sink
fn copy_chunk(
    reader: &mut impl Read,
    output: &mut impl Write,
    hasher: &mut Sha1,
    progress: &dyn ProgressReporter,
    size: u64,
    buf: &mut [u8],
    map_read_err: &dyn Fn(io::Error) -> Error,
) -> Result<()> {
    let mut remaining = size;
    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        let n = reader.read(&mut buf[..want]).map_err(map_read_err)?;
        if n == 0 {
            return Err(map_read_err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "source ended before the chunk was complete",
            )));
        }

        output
            .write_all(&buf[..n])
            .map_err(|e| Error::output_io("writing chunk", e))?;
        hasher.update(&buf[..n]);
        progress.add_bytes(n as u64);
        remaining -= n as u64;
    }
    Ok(())
}

/// Map a mid-body read failure; an error raised by the range request itself
/// already carries the right kind and is unwrapped rather than rewrapped
fn remote_read_error(url: &str, e: io::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(inner) => inner,
        Err(e) => Error::remote(url, e.to_string()),
    }
}
