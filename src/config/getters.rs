//! Getter methods for `ConvertConfig`

use std::path::{Path, PathBuf};

use super::types::ConvertConfig;
use crate::content_rewriting::HeadTemplate;
use crate::url_rewriting::ScopeFilter;

impl ConvertConfig {
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    #[must_use]
    pub fn main_url(&self) -> Option<&str> {
        self.main_url.as_deref()
    }

    #[must_use]
    pub fn include_domains(&self) -> &[String] {
        &self.include_domains
    }

    #[must_use]
    pub fn scope(&self) -> &ScopeFilter {
        &self.scope
    }

    #[must_use]
    pub fn custom_css(&self) -> Option<&Path> {
        self.custom_css.as_deref()
    }

    #[must_use]
    pub fn head_template_file(&self) -> Option<&Path> {
        self.head_template_file.as_deref()
    }

    #[must_use]
    pub fn head_template(&self) -> &HeadTemplate {
        &self.head_template
    }

    #[must_use]
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }

    #[must_use]
    pub fn progress_file(&self) -> Option<&Path> {
        self.progress_file.as_deref()
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}
