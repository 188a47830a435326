//! blocksync - a zsync-protocol differential file downloader
//!
//! Given a `.zsync` control document describing a target file as a sequence
//! of checksummed blocks and a local seed file that is similar but not
//! identical, this library reconstructs the exact target bytes by copying
//! reusable regions from the seed and fetching only the missing byte ranges
//! from an HTTP origin with range requests.
//!
//! The pipeline: [`control::read_control`] parses the control and builds the
//! [`index::ChecksumIndex`]; [`scan`] slides a rolling-hash window over the
//! seed and emits matches; [`mapper::ChunkMapper`] deduplicates them and
//! computes the complementary missing ranges; [`sync::Synchronizer`] writes
//! the target in order and verifies the end-to-end SHA-1.

pub mod cli;
pub mod config;
pub mod control;
pub mod error;
pub mod index;
pub mod mapper;
pub mod progress;
pub mod rollsum;
pub mod scan;
pub mod source;
pub mod sync;
pub mod types;
pub mod verify;
pub mod window;

pub use config::Config;
pub use control::{read_control, Control, HashLengths};
pub use error::{Error, Result};
pub use sync::Synchronizer;
pub use types::*;
