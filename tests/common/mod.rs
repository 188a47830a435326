//! Shared test fixtures: sample files, synthesized control documents, and
//! an in-process HTTP server answering byte-range requests.
#![allow(dead_code)]

use blocksync::window::HashedWindow;
use sha1::{Digest, Sha1};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Generate the reference sample pattern: byte `i` is
/// `chars[((offset + i) / 2048) % chars.len()]`
pub fn sample_file(chars: &[u8], size: usize, offset: usize) -> Vec<u8> {
    (0..size)
        .map(|i| chars[((offset + i) / 2048) % chars.len()])
        .collect()
}

/// Per-block `(weak, strong)` sums over the zero-padded blocks of `data`,
/// exactly as zsyncmake computes them
pub fn block_sums(data: &[u8], block_size: usize) -> Vec<(u32, [u8; 16])> {
    let blocks = data.len().div_ceil(block_size);
    (0..blocks)
        .map(|i| {
            let start = i * block_size;
            let end = (start + block_size).min(data.len());
            let mut window = HashedWindow::new(block_size);
            window.write(&data[start..end]);
            if end - start < block_size {
                window.write(&vec![0u8; block_size - (end - start)]);
            }
            (window.weak_sum(), window.strong_sum())
        })
        .collect()
}

/// Hex SHA-1 of a byte run
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Build a complete control document for `target`
pub fn build_control(
    target: &[u8],
    block_size: u32,
    weak_bytes: usize,
    strong_bytes: usize,
    url: &str,
) -> Vec<u8> {
    build_control_with_sha1(target, block_size, weak_bytes, strong_bytes, url, &sha1_hex(target))
}

/// Build a control document declaring an explicit SHA-1
pub fn build_control_with_sha1(
    target: &[u8],
    block_size: u32,
    weak_bytes: usize,
    strong_bytes: usize,
    url: &str,
    sha1: &str,
) -> Vec<u8> {
    let header = format!(
        "zsync: 0.6.2\n\
         Filename: file\n\
         MTime: Tue, 21 Jul 2020 17:03:30 +0000\n\
         Blocksize: {block_size}\n\
         Length: {length}\n\
         Hash-Lengths: 2,{weak_bytes},{strong_bytes}\n\
         URL: {url}\n\
         SHA-1: {sha1}\n\
         \n",
        length = target.len(),
    );

    let mut document = header.into_bytes();
    for (weak, strong) in block_sums(target, block_size as usize) {
        // weak checksum goes out big-endian: the most significant internal
        // bytes first, truncated to weak_bytes
        let internal = weak.to_le_bytes();
        for i in 0..weak_bytes {
            document.push(internal[3 - i]);
        }
        document.extend_from_slice(&strong[..strong_bytes]);
    }
    document
}

/// How the test server answers requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerMode {
    /// Honor Range headers with 206 responses
    Range,

    /// Ignore Range headers and answer 200 with the full body
    FullBody,

    /// Answer 404 to everything
    NotFound,

    /// Answer 206 but claim a gzip Content-Encoding
    Gzip,

    /// Answer 206 but deliver only half of the requested bytes
    TruncatedRange,
}

/// Handle to a running test server
pub struct RangeServer {
    pub url: String,
    hits: Arc<AtomicUsize>,
    bytes_served: Arc<AtomicU64>,
}

impl RangeServer {
    /// Number of requests answered so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Number of body bytes served so far
    pub fn bytes_served(&self) -> u64 {
        self.bytes_served.load(Ordering::SeqCst)
    }
}

/// Spawn a server publishing `data` on an ephemeral port
pub fn spawn_server(data: Vec<u8>, mode: ServerMode) -> RangeServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
    let addr = listener.local_addr().expect("server addr");
    let hits = Arc::new(AtomicUsize::new(0));
    let bytes_served = Arc::new(AtomicU64::new(0));

    let data = Arc::new(data);
    {
        let hits = Arc::clone(&hits);
        let bytes_served = Arc::clone(&bytes_served);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let data = Arc::clone(&data);
                let hits = Arc::clone(&hits);
                let bytes_served = Arc::clone(&bytes_served);
                thread::spawn(move || {
                    let _ = handle_connection(stream, &data, mode, &hits, &bytes_served);
                });
            }
        });
    }

    RangeServer {
        url: format!("http://{}/file", addr),
        hits,
        bytes_served,
    }
}

fn handle_connection(
    mut stream: TcpStream,
    data: &[u8],
    mode: ServerMode,
    hits: &AtomicUsize,
    bytes_served: &AtomicU64,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut range: Option<(u64, u64)> = None;
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(value) = lower.strip_prefix("range: bytes=") {
            if let Some((start, end)) = value.split_once('-') {
                range = Some((
                    start.trim().parse().unwrap_or(0),
                    end.trim().parse().unwrap_or(0),
                ));
            }
        }
    }

    hits.fetch_add(1, Ordering::SeqCst);

    match mode {
        ServerMode::NotFound => {
            write!(
                stream,
                "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )?;
        }
        ServerMode::FullBody => {
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                data.len()
            )?;
            stream.write_all(data)?;
            bytes_served.fetch_add(data.len() as u64, Ordering::SeqCst);
        }
        ServerMode::Gzip => {
            write!(
                stream,
                "HTTP/1.1 206 Partial Content\r\nContent-Encoding: gzip\r\n\
                 Content-Length: 0\r\nConnection: close\r\n\r\n"
            )?;
        }
        ServerMode::Range | ServerMode::TruncatedRange => {
            let total = data.len() as u64;
            let (start, end) = range.unwrap_or((0, total.saturating_sub(1)));
            let start = start.min(total);
            let end = end.min(total.saturating_sub(1));
            let mut body: &[u8] = if total > 0 && start <= end {
                &data[start as usize..=end as usize]
            } else {
                &[]
            };
            if mode == ServerMode::TruncatedRange {
                body = &body[..body.len() / 2];
            }

            write!(
                stream,
                "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\n\
                 Content-Range: bytes {}-{}/{}\r\nConnection: close\r\n\r\n",
                body.len(),
                start,
                end,
                total
            )?;
            stream.write_all(body)?;
            bytes_served.fetch_add(body.len() as u64, Ordering::SeqCst);
        }
    }

    stream.flush()
}
