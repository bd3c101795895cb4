//! Convert captured web archives (WARC) into offline packages.
//!
//! Every captured HTML page, stylesheet and script is rewritten so that its
//! references to other captured resources are relative paths inside the
//! package. The rewriting core ([`url_rewriting`], [`content_rewriting`]) is
//! pure and synchronous; [`converter`] drives it over archive records read by
//! [`archive`] and stores the results through a [`package::PackageWriter`].

pub mod archive;
pub mod config;
pub mod content_rewriting;
pub mod converter;
pub mod package;
pub mod url_rewriting;
pub mod utils;

pub use archive::{ArchiveError, CapturedRecord, RecordKind, WarcReader, open_archive};
pub use config::ConvertConfig;
pub use content_rewriting::{
    ContentContext, ContentKind, CssRewriter, HeadTemplate, HtmlRewriter, JsRewriter,
    RewrittenContent, ScriptKind, rewrite_content,
};
pub use converter::{
    ConversionStatus, ConversionSummary, ConvertError, Converter, JsonProgressFile, NoOpProgress,
    ProgressReporter,
};
pub use package::{DirectoryPackage, MemoryPackage, PackageItem, PackageWriter};
pub use url_rewriting::{
    ArticleUrlRewriter, FuzzyRule, FuzzyRules, KnownUrls, NormalizedUrl, RelativePath,
    RewriteContext, ScopeFilter, UrlResolution, item_path, normalize,
};

/// Convert the archives named in `config` into a directory package.
///
/// # Errors
///
/// See [`ConvertError`]; an unwritable output directory is a
/// [`ConvertError::Package`].
pub fn convert(config: ConvertConfig) -> Result<ConversionSummary, ConvertError> {
    let mut package = DirectoryPackage::create(config.output_dir())?;
    Converter::new(config).run(&mut package)
}
