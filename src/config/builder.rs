//! Type-safe builder for `ConvertConfig` using the typestate pattern
//!
//! The output directory and the input archives are required; `build()` only
//! exists once both have been provided.

use crate::content_rewriting::HeadTemplate;
use crate::url_rewriting::ScopeFilter;
use crate::utils::DEFAULT_BATCH_SIZE;
use anyhow::{Context, Result, anyhow, bail};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::ConvertConfig;

/// Validate one include-domain entry: a host prefix, optionally with scheme and path.
fn validate_include_domain(entry: &str) -> Result<()> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        bail!("Include domain entries must not be empty");
    }
    if trimmed.chars().any(char::is_whitespace) {
        bail!("Invalid include domain '{entry}': contains whitespace");
    }
    if let Some((scheme, _)) = trimmed.split_once("://") {
        if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
            bail!("Invalid include domain '{entry}': only http(s) URLs can be captured");
        }
    }
    Ok(())
}

/// Append `/` to a main URL that has no path so it matches the captured record.
fn with_root_path(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| anyhow!("Invalid main URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("Main URL '{url}' must use http or https");
    }
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority_end = after_scheme.find(['/', '?', '#']);
    Ok(match authority_end {
        None => format!("{url}/"),
        Some(pos) if after_scheme.as_bytes()[pos] != b'/' => {
            let split = url.len() - after_scheme.len() + pos;
            format!("{}/{}", &url[..split], &url[split..])
        }
        Some(_) => url.to_string(),
    })
}

// Type states for the builder
pub struct WithOutputDir;
pub struct Complete;

pub struct ConvertConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) inputs: Vec<PathBuf>,
    pub(crate) main_url: Option<String>,
    pub(crate) include_domains: Vec<String>,
    pub(crate) custom_css: Option<PathBuf>,
    pub(crate) head_template_file: Option<PathBuf>,
    pub(crate) head_template: Option<HeadTemplate>,
    pub(crate) static_dir: Option<PathBuf>,
    pub(crate) progress_file: Option<PathBuf>,
    pub(crate) batch_size: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ConvertConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_dir: None,
            inputs: Vec::new(),
            main_url: None,
            include_domains: Vec::new(),
            custom_css: None,
            head_template_file: None,
            head_template: None,
            static_dir: None,
            progress_file: None,
            batch_size: DEFAULT_BATCH_SIZE,
            _phantom: PhantomData,
        }
    }
}

impl ConvertConfig {
    /// Create a builder for configuring a `ConvertConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ConvertConfigBuilder<()> {
        ConvertConfigBuilder::default()
    }
}

impl<State> ConvertConfigBuilder<State> {
    fn into_state<Next>(self) -> ConvertConfigBuilder<Next> {
        ConvertConfigBuilder {
            output_dir: self.output_dir,
            inputs: self.inputs,
            main_url: self.main_url,
            include_domains: self.include_domains,
            custom_css: self.custom_css,
            head_template_file: self.head_template_file,
            head_template: self.head_template,
            static_dir: self.static_dir,
            progress_file: self.progress_file,
            batch_size: self.batch_size,
            _phantom: PhantomData,
        }
    }
}

impl ConvertConfigBuilder<()> {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> ConvertConfigBuilder<WithOutputDir> {
        self.output_dir = Some(dir.into());
        self.into_state()
    }
}

impl ConvertConfigBuilder<WithOutputDir> {
    /// Archives to convert, in reading order.
    pub fn inputs<I, P>(mut self, inputs: I) -> ConvertConfigBuilder<Complete>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self.into_state()
    }
}

// Build method only available when all required fields are set
impl ConvertConfigBuilder<Complete> {
    /// Validate settings and load the header template.
    ///
    /// # Errors
    ///
    /// Fails on an empty input list, a zero batch size, an invalid include
    /// domain or main URL, or an unreadable/invalid header template.
    pub fn build(self) -> Result<ConvertConfig> {
        if self.inputs.is_empty() {
            bail!("At least one input archive is required");
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        for entry in &self.include_domains {
            validate_include_domain(entry)?;
        }
        let main_url = self.main_url.as_deref().map(with_root_path).transpose()?;

        let head_template = match (self.head_template, &self.head_template_file) {
            (Some(template), _) => template,
            (None, Some(path)) => {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read head template {}", path.display()))?;
                HeadTemplate::parse(&source)
                    .with_context(|| format!("Invalid head template {}", path.display()))?
            }
            (None, None) => HeadTemplate::default(),
        };

        Ok(ConvertConfig {
            output_dir: self
                .output_dir
                .ok_or_else(|| anyhow!("output_dir is required"))?,
            scope: ScopeFilter::new(&self.include_domains),
            inputs: self.inputs,
            main_url,
            include_domains: self.include_domains,
            custom_css: self.custom_css,
            head_template_file: self.head_template_file,
            head_template,
            static_dir: self.static_dir,
            progress_file: self.progress_file,
            batch_size: self.batch_size,
        })
    }
}
