//! Error types for package output

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for package operations
pub type PackageResult<T> = Result<T, PackageError>;

/// Error types for package output
#[derive(Debug, Error)]
pub enum PackageError {
    /// Output directory missing and could not be created, or not writable
    #[error("Output directory {path} is not writable: {source}")]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two items were added under the same path
    #[error("Duplicate package path: {0}")]
    DuplicatePath(String),

    /// Alias pointing at nothing
    #[error("Alias {alias} targets unknown path {target}")]
    DanglingAlias { alias: String, target: String },

    /// Package already finalized
    #[error("Package already finished")]
    Finished,

    /// Manifest serialization failed
    #[error("Failed to write manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Static file directory could not be read
    #[error("Failed to read static files from {path}: {message}")]
    StaticDir { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
