//! Core configuration types for archive conversion
//!
//! This module contains the `ConvertConfig` struct that carries every
//! run-level setting from the command line (or a library caller) to the
//! converter.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::content_rewriting::HeadTemplate;
use crate::url_rewriting::ScopeFilter;

/// Main configuration struct for a conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertConfig {
    /// Directory the package is written to. Created if missing.
    pub(crate) output_dir: PathBuf,

    /// Archive files, read in order.
    pub(crate) inputs: Vec<PathBuf>,

    /// URL of the main page; when absent the first HTML page is used.
    ///
    /// **INVARIANT:** carries a path (at least `/`), fixed up in the builder.
    pub(crate) main_url: Option<String>,

    /// Include-domain prefixes as given by the user.
    pub(crate) include_domains: Vec<String>,

    /// Scope filter built from `include_domains`
    #[serde(skip)]
    pub(crate) scope: ScopeFilter,

    /// Stylesheet added to the package and linked from every page.
    pub(crate) custom_css: Option<PathBuf>,

    /// File the header template was loaded from, if not the bundled one.
    pub(crate) head_template_file: Option<PathBuf>,

    /// Parsed header template
    #[serde(skip)]
    pub(crate) head_template: HeadTemplate,

    /// Extra static files (e.g. a wombat build) copied under the static prefix.
    pub(crate) static_dir: Option<PathBuf>,

    /// JSON file receiving `{"written": n, "total": m}` after every item.
    pub(crate) progress_file: Option<PathBuf>,

    /// Records rewritten in parallel before being written out.
    pub(crate) batch_size: usize,
}
