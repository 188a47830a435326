//! Error types for blocksync

use thiserror::Error;

/// Result type alias for blocksync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for blocksync
///
/// Every error is terminal for the running sync; nothing is retried at this
/// layer. Partial output is left on disk for the caller to handle.
#[derive(Error, Debug)]
pub enum Error {
    /// The control document could not be parsed
    #[error("invalid control document: {message}")]
    ControlParse { message: String },

    /// The control document declares hash lengths outside the supported ranges
    #[error("unsupported hash lengths: {message}")]
    UnsupportedHashLengths { message: String },

    /// I/O error while reading the seed file
    #[error("seed I/O error: {message}")]
    SeedIo {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The remote file could not be reached (404, DNS, connect, dropped body)
    #[error("remote file unavailable: {url}: {message}")]
    RemoteUnavailable { url: String, message: String },

    /// The server answered a range request with something other than 206
    #[error("server does not support range requests: {url} (status {status})")]
    RemoteNotRangeable { url: String, status: u16 },

    /// The server compressed the response body; byte offsets would be meaningless
    #[error("server sent unsupported content encoding {encoding:?}: {url}")]
    RemoteEncodingUnsupported { url: String, encoding: String },

    /// I/O error while writing the output file
    #[error("output I/O error: {message}")]
    OutputIo {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// The reconstructed file does not hash to the control's SHA-1
    #[error("output checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl Error {
    /// Create a control parse error
    pub fn control(message: impl Into<String>) -> Self {
        Self::ControlParse {
            message: message.into(),
        }
    }

    /// Create a seed I/O error with context
    pub fn seed_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::SeedIo {
            message: message.into(),
            source,
        }
    }

    /// Create an output I/O error with context
    pub fn output_io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::OutputIo {
            message: message.into(),
            source,
        }
    }

    /// Create a remote-unavailable error
    pub fn remote(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Config {
            message: format!("TOML parse error: {}", err),
        }
    }
}
