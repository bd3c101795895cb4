//! Error types for archive reading

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Error types for archive reading
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Archive file could not be opened
    #[error("Failed to open archive {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record did not start with a `WARC/<version>` line
    #[error("Invalid WARC version line at offset {offset}: {line:?}")]
    InvalidVersion { offset: u64, line: String },

    /// Header line without a `name: value` shape
    #[error("Malformed WARC header at offset {offset}: {line:?}")]
    MalformedHeader { offset: u64, line: String },

    /// Mandatory header absent or unparseable
    #[error("WARC record at offset {offset} has no valid {name} header")]
    MissingHeader { offset: u64, name: &'static str },

    /// Stream ended inside a record block
    #[error("WARC record at offset {offset} truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        offset: u64,
        expected: u64,
        actual: u64,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
