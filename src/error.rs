//! Centralized error types for mimestream.
//!
//! Only *fatal* outcomes live here: a failing stream read, an invalid hook
//! pattern, an unsupported seek. Recoverable structural problems (missing
//! boundaries, truncated multiparts, broken Content-Type values) are
//! delivered through [`crate::report`] and never abort a parse.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors produced by the mimestream library.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The underlying stream failed while reading.
    #[error("stream read failed at offset {offset}: {source}")]
    Stream {
        offset: u64,
        source: std::io::Error,
    },

    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The specified file does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    /// The stream does not support repositioning.
    #[error("seek is not supported by this stream")]
    SeekUnsupported,

    /// The requested seek target is invalid for this stream.
    #[error("seek to offset {offset} failed: {source}")]
    Seek {
        offset: u64,
        source: std::io::Error,
    },

    /// The header pattern passed to `set_header_regex` did not compile.
    #[error("invalid header pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Convenience alias for `Result<T, ParseError>`.
pub type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Stream` variant from the offset the read started at.
    pub fn stream(offset: u64, source: std::io::Error) -> Self {
        Self::Stream { offset, source }
    }
}
