//! Seed scanner
//!
//! Slides a block-sized window over the seed file, probing the checksum
//! index with the rolling weak sum at every byte offset and confirming
//! candidates with the strong sum. On a confirmed match the scanner jumps a
//! whole block; otherwise it advances one byte. Windows crossing the end of
//! the seed are zero-padded so their sums match what the control's producer
//! computed for the (possibly short) final target block.
//!
//! In parallel mode the seed is partitioned into one range per worker; each
//! worker owns its own file handle and window, shares the index read-only,
//! and publishes matches on a bounded channel drained by the coordinator.
//! Workers do not probe anchors past their range end, so matches spanning a
//! boundary can be missed and are fetched over HTTP instead.

use crate::error::{Error, Result};
use crate::index::ChecksumIndex;
use crate::types::{ChunkInfo, ChunkOrigin};
use crate::window::HashedWindow;
use crossbeam_channel::Sender;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Capacity of the worker-to-coordinator match channel
const MATCH_CHANNEL_CAPACITY: usize = 1024;

/// Scan the seed for target blocks that can be reused.
///
/// `jobs` bounds the worker count; it is further capped by the number of
/// seed blocks. The returned matches are unordered across workers; within
/// one worker they appear in ascending seed offset.
pub fn find_reusable_chunks(
    seed: &Path,
    index: &ChecksumIndex,
    block_size: u64,
    file_length: u64,
    jobs: usize,
) -> Result<Vec<ChunkInfo>> {
    let seed_len = std::fs::metadata(seed)
        .map_err(|e| Error::seed_io(format!("reading metadata of {}", seed.display()), e))?
        .len();

    if seed_len == 0 || index.is_empty() {
        return Ok(Vec::new());
    }

    let seed_blocks = seed_len.div_ceil(block_size);
    let workers = (jobs.max(1) as u64).min(seed_blocks);
    let range_len = (seed_blocks / workers) * block_size;

    tracing::debug!(seed_len, seed_blocks, workers, range_len, "scanning seed");

    let (tx, rx) = crossbeam_channel::bounded::<ChunkInfo>(MATCH_CHANNEL_CAPACITY);
    let mut matches = Vec::new();

    std::thread::scope(|scope| -> Result<()> {
        let mut handles = Vec::with_capacity(workers as usize);

        for worker in 0..workers {
            let begin = worker * range_len;
            let is_final = worker == workers - 1;
            let end = if is_final { seed_len } else { begin + range_len };
            // the final worker also probes the zero-padded window anchored
            // at the last block boundary
            let horizon = if is_final {
                (seed_len / block_size) * block_size
            } else {
                end - block_size
            };

            let tx = tx.clone();
            handles.push(scope.spawn(move || -> Result<()> {
                let file = File::open(seed)
                    .map_err(|e| Error::seed_io(format!("opening {}", seed.display()), e))?;
                scan_range(file, begin, horizon, block_size, file_length, index, &tx)
            }));
        }
        drop(tx);

        for chunk in rx.iter() {
            matches.push(chunk);
        }

        for handle in handles {
            handle
                .join()
                .map_err(|_| Error::seed_io("scanner worker panicked", std::io::Error::other("panic")))??;
        }
        Ok(())
    })?;

    tracing::debug!(matches = matches.len(), "seed scan complete");
    Ok(matches)
}

/// Scan one worker's range, probing every window anchored in `[begin, horizon]`
fn scan_range(
    mut file: File,
    begin: u64,
    horizon: u64,
    block_size: u64,
    file_length: u64,
    index: &ChecksumIndex,
    tx: &Sender<ChunkInfo>,
) -> Result<()> {
    file.seek(SeekFrom::Start(begin))
        .map_err(|e| Error::seed_io("seeking seed", e))?;
    let mut input = BufReader::new(file);

    let mut window = HashedWindow::new(block_size as usize);
    let mut scratch = vec![0u8; block_size as usize];
    fill_block(&mut input, &mut window, &mut scratch)?;

    let mut offset = begin;
    loop {
        if offset > horizon {
            break;
        }

        if let Some(bucket) = index.find_by_weak(window.weak_sum()) {
            let strong = window.strong_sum();
            let hits = index.find_strong_in_bucket(&strong, bucket);
            if !hits.is_empty() {
                for record in hits {
                    let target_offset = u64::from(record.block_index) * block_size;
                    // chop zero-filled chunks at the end of the target
                    let size = block_size.min(file_length.saturating_sub(target_offset));
                    if size == 0 {
                        continue;
                    }

                    let chunk = ChunkInfo {
                        size,
                        source: ChunkOrigin::Seed,
                        source_offset: offset,
                        target_offset,
                    };
                    if tx.send(chunk).is_err() {
                        // coordinator went away; terminate quietly
                        return Ok(());
                    }
                }

                // consume a whole block, sliding so the hash stays consistent
                offset += block_size;
                if offset > horizon {
                    break;
                }
                fill_block(&mut input, &mut window, &mut scratch)?;
                continue;
            }
        }

        // no match at this anchor: slide a single byte
        offset += 1;
        if offset > horizon {
            break;
        }
        advance_byte(&mut input, &mut window)?;
    }

    Ok(())
}

/// Slide a full block into the window, zero-padding past end of file
fn fill_block(
    input: &mut impl Read,
    window: &mut HashedWindow,
    scratch: &mut [u8],
) -> Result<()> {
    let mut filled = 0;
    while filled < scratch.len() {
        let n = input
            .read(&mut scratch[filled..])
            .map_err(|e| Error::seed_io("reading seed block", e))?;
        if n == 0 {
            break;
        }
        filled += n;
    }

    window.write(&scratch[..filled]);
    if filled < scratch.len() {
        scratch[filled..].fill(0);
        window.write(&scratch[filled..]);
    }
    Ok(())
}

/// Slide one byte into the window, zero-padding past end of file
fn advance_byte(input: &mut impl Read, window: &mut HashedWindow) -> Result<()> {
    let mut byte = [0u8; 1];
    let n = input
        .read(&mut byte)
        .map_err(|e| Error::seed_io("reading seed byte", e))?;
    if n == 0 {
        byte[0] = 0;
    }
    window.write(&byte);
    Ok(())
}
