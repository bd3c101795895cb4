//! Error types for a conversion run

use std::path::PathBuf;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::package::PackageError;

/// Result type alias for conversion runs
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Run-level failures. Content that cannot be rewritten is never one of these.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Reading an input archive failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Writing the package failed (includes an unwritable output directory)
    #[error(transparent)]
    Package(#[from] PackageError),

    /// The configured main page was not produced
    #[error("Main page {0} was not found in the archive")]
    MainPageNotFound(String),

    /// Custom stylesheet could not be read
    #[error("Failed to read custom CSS {path}: {source}")]
    CustomCss {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
