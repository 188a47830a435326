//! Byte sources for reconstruction
//!
//! The writer copies chunks from two kinds of sources: the local seed file
//! and a remote file reached with HTTP range requests. Both expose plain
//! `Read + Seek` semantics.

pub mod http;

pub use http::HttpRangeSource;
