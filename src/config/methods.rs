//! Builder methods available for all states
//!
//! Optional settings can be given before or after the required ones.

use std::path::PathBuf;

use super::builder::ConvertConfigBuilder;
use crate::content_rewriting::HeadTemplate;

impl<State> ConvertConfigBuilder<State> {
    /// Main page URL. A URL without a path gets `/` appended at build time.
    #[must_use]
    pub fn main_url(mut self, url: impl Into<String>) -> Self {
        self.main_url = Some(url.into());
        self
    }

    /// Restrict the package to URLs starting with one of these prefixes.
    ///
    /// Entries are normalized like captured URLs, so `https://example.com`
    /// and `example.com` are equivalent. An empty list keeps everything.
    #[must_use]
    pub fn include_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_domains.extend(domains.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn custom_css(mut self, path: impl Into<PathBuf>) -> Self {
        self.custom_css = Some(path.into());
        self
    }

    /// Load the header template from a file at build time.
    #[must_use]
    pub fn head_template_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.head_template_file = Some(path.into());
        self
    }

    /// Use an already parsed header template; takes precedence over a file.
    #[must_use]
    pub fn head_template(mut self, template: HeadTemplate) -> Self {
        self.head_template = Some(template);
        self
    }

    #[must_use]
    pub fn static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    #[must_use]
    pub fn progress_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.progress_file = Some(path.into());
        self
    }

    /// Number of records rewritten in parallel per batch (default 64).
    ///
    /// Larger batches use more memory: every record of a batch is resident
    /// until the batch is written.
    #[must_use]
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }
}
