//! Progress reporting abstraction for conversion runs
//!
//! Defines the `ProgressReporter` trait for run events, a no-op
//! implementation, and the JSON progress file consumed by external tools.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

/// Why a record did not produce an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyUrl,
    /// Another record already produced this path.
    Duplicate,
    OutOfScope,
    /// Redirect pointing at its own URL (typically `http` to `https`).
    SelfRedirect,
    /// Revisit or redirect whose target was never produced.
    MissingTarget,
    EmptyContent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::EmptyUrl => "empty URL",
            Self::Duplicate => "duplicate path",
            Self::OutOfScope => "out of scope",
            Self::SelfRedirect => "redirect to itself",
            Self::MissingTarget => "target not captured",
            Self::EmptyContent => "empty content",
        };
        f.write_str(reason)
    }
}

/// Trait for reporting conversion progress
///
/// Implementations can log, update a UI, or persist counters. All methods
/// are called from the thread driving the run, never from rayon workers.
pub trait ProgressReporter: Send + Sync {
    /// Report that an input archive is being read
    fn report_archive_opened(&self, path: &Path);

    /// Report that an item was written; `written <= total` always holds
    fn report_item_written(&self, written: u64, total: u64);

    /// Report a record that produced nothing
    fn report_skipped(&self, url: &str, reason: SkipReason);

    /// Report the end of a successful run
    fn report_completed(&self, written: u64, total: u64);
}

/// Progress reporter that does nothing
///
/// All methods are no-ops and will be inlined away by the compiler.
#[derive(Debug, Clone, Copy)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_archive_opened(&self, _path: &Path) {}

    #[inline(always)]
    fn report_item_written(&self, _written: u64, _total: u64) {}

    #[inline(always)]
    fn report_skipped(&self, _url: &str, _reason: SkipReason) {}

    #[inline(always)]
    fn report_completed(&self, _written: u64, _total: u64) {}
}

/// Contents of the progress file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub written: u64,
    pub total: u64,
}

/// Persists `{"written": n, "total": m}` after every item.
///
/// Each write replaces the file atomically, so readers never see a partial
/// document. Write failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct JsonProgressFile {
    path: PathBuf,
}

impl JsonProgressFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the last persisted snapshot.
    pub fn load(path: &Path) -> std::io::Result<ProgressSnapshot> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(std::io::Error::other)
    }

    fn persist(&self, snapshot: ProgressSnapshot) -> std::io::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut tmp, &snapshot).map_err(std::io::Error::other)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    fn write(&self, written: u64, total: u64) {
        if let Err(e) = self.persist(ProgressSnapshot { written, total }) {
            log::warn!("Failed to write progress file {}: {e}", self.path.display());
        }
    }
}

impl ProgressReporter for JsonProgressFile {
    fn report_archive_opened(&self, _path: &Path) {}

    fn report_item_written(&self, written: u64, total: u64) {
        self.write(written, total);
    }

    fn report_skipped(&self, _url: &str, _reason: SkipReason) {}

    fn report_completed(&self, written: u64, total: u64) {
        self.write(written, total);
    }
}

/// Forwards every event to two reporters.
pub(crate) struct Tee<'a>(pub &'a dyn ProgressReporter, pub &'a dyn ProgressReporter);

impl ProgressReporter for Tee<'_> {
    fn report_archive_opened(&self, path: &Path) {
        self.0.report_archive_opened(path);
        self.1.report_archive_opened(path);
    }

    fn report_item_written(&self, written: u64, total: u64) {
        self.0.report_item_written(written, total);
        self.1.report_item_written(written, total);
    }

    fn report_skipped(&self, url: &str, reason: SkipReason) {
        self.0.report_skipped(url, reason);
        self.1.report_skipped(url, reason);
    }

    fn report_completed(&self, written: u64, total: u64) {
        self.0.report_completed(written, total);
        self.1.report_completed(written, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_file_replaced_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let progress = JsonProgressFile::new(&path);

        progress.report_item_written(1, 3);
        assert_eq!(
            JsonProgressFile::load(&path).unwrap(),
            ProgressSnapshot { written: 1, total: 3 }
        );
        progress.report_completed(3, 3);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"{"written":3,"total":3}"#);
    }

    #[test]
    fn test_unwritable_progress_file_is_not_fatal() {
        let progress = JsonProgressFile::new("/nonexistent-dir/progress.json");
        progress.report_item_written(1, 1);
        assert!(!progress.path().exists());
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::OutOfScope.to_string(), "out of scope");
        assert_eq!(SkipReason::SelfRedirect.to_string(), "redirect to itself");
    }
}
