//! Ranged HTTP source
//!
//! A seekable byte stream over a remote URL. A single open response body
//! acts as the read cache: reads are served from it while the logical
//! cursor stays inside the requested window, and a new range request is
//! issued when it leaves. The reconstruction writer pre-requests each whole
//! missing chunk so one request covers many reads.

use crate::error::{Error, Result};
use reqwest::blocking::{Client, Response};
use reqwest::header;
use std::io::{self, Read, Seek, SeekFrom};

/// Cached single-request window over a remote file
pub struct HttpRangeSource {
    url: String,
    size: u64,
    offset: u64,
    cache_begin: u64,
    cache_end: u64,
    client: Client,
    body: Option<Response>,
}

impl HttpRangeSource {
    /// Create a source over `url` for a remote file of `size` bytes
    pub fn new(url: impl Into<String>, size: u64) -> Self {
        Self {
            url: url.into(),
            size,
            offset: 0,
            cache_begin: 0,
            cache_end: 0,
            client: Client::new(),
            body: None,
        }
    }

    /// Remote file URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue a range request covering `size` bytes from the current offset
    /// and keep the response body open as the read cache
    pub fn request(&mut self, size: u64) -> Result<()> {
        self.cache_begin = self.offset;
        self.cache_end = self.offset + size;
        self.body = Some(self.range_request(self.cache_begin, self.cache_end)?);
        Ok(())
    }

    fn range_request(&self, start: u64, end: u64) -> Result<Response> {
        tracing::debug!(url = %self.url, start, end, "requesting byte range");

        let response = self
            .client
            .get(&self.url)
            .header(header::RANGE, format!("bytes={}-{}", start, end))
            .header(header::ACCEPT_ENCODING, "identity")
            .send()
            .map_err(|e| Error::remote(&self.url, e.to_string()))?;

        let status = response.status().as_u16();
        if status == 404 {
            return Err(Error::remote(&self.url, "not found (404)"));
        }
        if status != 206 {
            return Err(Error::RemoteNotRangeable {
                url: self.url.clone(),
                status,
            });
        }

        if let Some(encoding) = response
            .headers()
            .get(header::CONTENT_ENCODING)
            .and_then(|value| value.to_str().ok())
        {
            if encoding.contains("gzip") {
                return Err(Error::RemoteEncodingUnsupported {
                    url: self.url.clone(),
                    encoding: encoding.to_string(),
                });
            }
        }

        Ok(response)
    }
}

impl Read for HttpRangeSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // drop the cached body when the cursor has left its window
        if self.body.is_some()
            && (self.offset < self.cache_begin
                || self.offset + buf.len() as u64 > self.cache_end)
        {
            self.body = None;
        }

        if self.body.is_none() {
            self.request(buf.len() as u64).map_err(io::Error::other)?;
        }

        let Some(body) = self.body.as_mut() else {
            return Err(io::Error::other("range request left no open response"));
        };
        let n = body.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl Seek for HttpRangeSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let next = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => self.offset.checked_add_signed(delta),
            SeekFrom::End(delta) => self.size.checked_add_signed(delta),
        };

        match next {
            Some(offset) => {
                self.offset = offset;
                Ok(offset)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek before start of remote file",
            )),
        }
    }
}
