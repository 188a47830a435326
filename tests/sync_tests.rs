//! End-to-end sync tests against an in-process range server

mod common;

use blocksync::control::read_control;
use blocksync::mapper::ChunkMapper;
use blocksync::progress::NoProgress;
use blocksync::sync::Synchronizer;
use blocksync::Error;
use common::{build_control, build_control_with_sha1, sample_file, spawn_server, ServerMode};
use std::io::Cursor;
use std::path::PathBuf;

const BLOCK_SIZE: u32 = 2048;
const CHARS: &[u8] = b"0123456789";

fn write_seed(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, data).expect("write seed");
    path
}

fn synchronizer_for(target: &[u8], url: &str) -> Synchronizer {
    let document = build_control(target, BLOCK_SIZE, 2, 3, url);
    let control = read_control(&document[..]).expect("parse control");
    Synchronizer::new(control).with_jobs(4)
}

#[test]
fn test_identity_sync_fetches_nothing() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &target);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    assert_eq!(output.get_ref(), &target);
    assert_eq!(server.hits(), 0);
    assert_eq!(summary.reusable_chunks, 3);
    assert_eq!(summary.bytes_fetched, 0);
    assert_eq!(summary.bytes_reused, target.len() as u64);
}

#[test]
fn test_first_chunk_changed() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"x123456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.reusable_chunks, 2);
    assert_eq!(summary.bytes_fetched, 2048);
    assert_eq!(server.hits(), 1);
}

#[test]
fn test_second_chunk_changed() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"0x23456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.reusable_chunks, 2);
    assert_eq!(summary.bytes_fetched, 2048);
}

#[test]
fn test_third_chunk_changed() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"01x3456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.reusable_chunks, 2);
    assert_eq!(summary.bytes_fetched, 60);
}

#[test]
fn test_displaced_seed_still_reconstructs() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(CHARS, 2048 * 2 + 70, 1);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    // the one-byte shift interacts with block boundaries; whatever the
    // scanner salvages, the output must still be exact
    assert_eq!(output.get_ref(), &target);
    assert_eq!(
        summary.bytes_reused + summary.bytes_fetched,
        target.len() as u64
    );
}

#[test]
fn test_bad_sha1_fails_after_full_write() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &target);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let document = build_control_with_sha1(
        &target,
        BLOCK_SIZE,
        2,
        3,
        &server.url,
        "0000000000000000000000000000000000000000",
    );
    let control = read_control(&document[..]).expect("parse control");

    let mut output = Cursor::new(Vec::new());
    let err = Synchronizer::new(control)
        .with_jobs(2)
        .sync(&seed, &mut output, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, Error::ChecksumMismatch { .. }));
    // the mismatch is only detectable after the whole output was written
    assert_eq!(output.get_ref().len(), target.len());
}

#[test]
fn test_uneven_parallel_workload() {
    let jobs = num_cpus::get();
    let target = sample_file(CHARS, 2048 * jobs + 500, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &target);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let synchronizer = synchronizer_for(&target, &server.url).with_jobs(jobs);

    let matches = synchronizer.find_reusable_chunks(&seed).expect("scan");
    let mut mapper = ChunkMapper::new(target.len() as u64);
    mapper.extend(matches);
    let mapped = mapper.mapped_chunks();

    assert_eq!(mapped.len(), jobs + 1);
    let last = mapped.last().unwrap();
    assert_eq!(last.target_offset, 2048 * jobs as u64);
    assert_eq!(last.size, 500);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer.sync(&seed, &mut output, &NoProgress).expect("sync");
    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.bytes_fetched, 0);
    assert_eq!(server.hits(), 0);
}

#[test]
fn test_parallelism_invariance() {
    let target = sample_file(CHARS, 2048 * 8 + 100, 0);
    let mut seed_data = target.clone();
    // damage one block in the middle of the seed
    seed_data[2048 * 3 + 17] ^= 0xff;
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);

    let scan = |jobs: usize| {
        synchronizer_for(&target, "http://unused.invalid/file")
            .with_jobs(jobs)
            .find_reusable_chunks(&seed)
            .expect("scan")
    };
    let mut single = scan(1);
    let mut multi = scan(4);

    let key = |c: &blocksync::ChunkInfo| (c.target_offset, c.source_offset, c.size);
    single.sort_by_key(key);
    multi.sort_by_key(key);
    assert_eq!(single, multi);
}

#[test]
fn test_min_chunk_size_is_tunable() {
    // with 512-byte blocks every match is at or below the default 1024-byte
    // threshold, so only the tail survives the default filter
    let target = sample_file(CHARS, 512 * 4 + 100, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &target);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let document = build_control(&target, 512, 2, 3, &server.url);

    let strict = Synchronizer::new(read_control(&document[..]).unwrap()).with_jobs(1);
    let mut output = Cursor::new(Vec::new());
    let summary = strict.sync(&seed, &mut output, &NoProgress).expect("sync");
    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.reusable_chunks, 1);
    assert!(summary.bytes_fetched > 0);

    let lenient = Synchronizer::new(read_control(&document[..]).unwrap())
        .with_jobs(1)
        .with_min_chunk_size(0);
    let mut output = Cursor::new(Vec::new());
    let summary = lenient.sync(&seed, &mut output, &NoProgress).expect("sync");
    assert_eq!(output.get_ref(), &target);
    assert_eq!(summary.bytes_fetched, 0);
}

#[test]
fn test_missing_seed_is_seed_io_error() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let server = spawn_server(target.clone(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let err = synchronizer_for(&target, &server.url)
        .sync(std::path::Path::new("/nonexistent/seed"), &mut output, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, Error::SeedIo { .. }));
}

#[test]
fn test_non_rangeable_origin_fails_sync() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"x123456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::FullBody);

    let mut output = Cursor::new(Vec::new());
    let err = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, Error::RemoteNotRangeable { status: 200, .. }));
}

#[test]
fn test_vanished_origin_fails_sync() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"x123456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::NotFound);

    let mut output = Cursor::new(Vec::new());
    let err = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, Error::RemoteUnavailable { .. }));
}

#[test]
fn test_truncated_origin_body_fails_sync() {
    let target = sample_file(CHARS, 2048 * 2 + 60, 0);
    let seed_data = sample_file(b"x123456789", 2048 * 2 + 60, 0);
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", &seed_data);
    let server = spawn_server(target.clone(), ServerMode::TruncatedRange);

    let mut output = Cursor::new(Vec::new());
    let err = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .unwrap_err();

    assert!(matches!(err, Error::RemoteUnavailable { .. }));
}

#[test]
fn test_empty_target() {
    let target: Vec<u8> = Vec::new();
    let dir = tempfile::tempdir().unwrap();
    let seed = write_seed(&dir, "seed", b"leftover seed content");
    let server = spawn_server(Vec::new(), ServerMode::Range);

    let mut output = Cursor::new(Vec::new());
    let summary = synchronizer_for(&target, &server.url)
        .sync(&seed, &mut output, &NoProgress)
        .expect("sync");

    assert!(output.get_ref().is_empty());
    assert_eq!(summary.reusable_chunks, 0);
    assert_eq!(summary.bytes_fetched, 0);
}
