//! Resolution of references found inside one package item.
//!
//! Every item lives at a path derived from its captured URL
//! (`fuzzy(normalize(url))`). A reference seen inside that item is resolved
//! against the item's own URL, canonicalized the same way, and emitted as a
//! path relative to the item's directory so the package never depends on a
//! host or port.

use std::borrow::Cow;
use std::fmt;

use url::Url;

use super::fuzzy::FuzzyRules;
use super::known::KnownUrls;
use super::normalize::{NormalizedUrl, is_absolute_http, normalize};
use super::scope::ScopeFilter;

/// Per-item rewriting context, borrowed by every rewrite call for that item.
#[derive(Debug, Clone, Copy)]
pub struct RewriteContext<'a> {
    pub item_path: &'a str,
    pub scope: &'a ScopeFilter,
    pub fuzzy_rules: &'a FuzzyRules,
    /// Item paths that exist in the package; consulted for navigation links.
    pub known_urls: &'a KnownUrls,
}

impl<'a> RewriteContext<'a> {
    /// Unscoped context using the builtin fuzzy rules.
    pub fn new(item_path: &'a str) -> Self {
        Self {
            item_path,
            scope: ScopeFilter::unscoped(),
            fuzzy_rules: FuzzyRules::builtin(),
            known_urls: KnownUrls::none(),
        }
    }

    #[must_use]
    pub fn with_scope(mut self, scope: &'a ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn with_fuzzy_rules(mut self, fuzzy_rules: &'a FuzzyRules) -> Self {
        self.fuzzy_rules = fuzzy_rules;
        self
    }

    #[must_use]
    pub fn with_known_urls(mut self, known_urls: &'a KnownUrls) -> Self {
        self.known_urls = known_urls;
        self
    }

    pub fn rewriter(&self) -> ArticleUrlRewriter<'a> {
        ArticleUrlRewriter::from_context(*self)
    }
}

/// A `../`-style path usable from inside the item it was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelativePath(String);

impl RelativePath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RelativePath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

/// Outcome of resolving one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlResolution {
    /// Reachable inside the package through this relative path.
    Relative(RelativePath),
    /// Not a fetchable http(s) reference (`data:`, `mailto:`, fragment-only...).
    External,
    /// A web URL excluded by the scope filter.
    OutOfScope(NormalizedUrl),
    /// An in-scope link whose package path was never captured.
    NotCaptured(String),
}

impl UrlResolution {
    pub fn relative(&self) -> Option<&str> {
        match self {
            Self::Relative(path) => Some(path.as_str()),
            _ => None,
        }
    }

    pub fn into_relative(self) -> Option<String> {
        match self {
            Self::Relative(path) => Some(path.into_string()),
            Self::External | Self::OutOfScope(_) | Self::NotCaptured(_) => None,
        }
    }
}

/// In-scope target of a reference, before it is made relative.
struct Target<'r> {
    key: String,
    fragment: Option<&'r str>,
}

/// Computes offline paths for references seen inside one item.
#[derive(Debug, Clone, Copy)]
pub struct ArticleUrlRewriter<'a> {
    ctx: RewriteContext<'a>,
}

impl<'a> ArticleUrlRewriter<'a> {
    /// Unscoped rewriter for the item stored at `item_path`.
    pub fn new(item_path: &'a str) -> Self {
        Self::from_context(RewriteContext::new(item_path))
    }

    pub fn with_scope(item_path: &'a str, scope: &'a ScopeFilter) -> Self {
        Self::from_context(RewriteContext::new(item_path).with_scope(scope))
    }

    pub fn from_context(ctx: RewriteContext<'a>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &RewriteContext<'a> {
        &self.ctx
    }

    pub fn item_path(&self) -> &'a str {
        self.ctx.item_path
    }

    /// Number of path separators in the item path; root-level items are depth 0.
    pub fn depth(&self) -> usize {
        self.ctx.item_path.matches('/').count()
    }

    /// Reach the package-root path `target` from this item: `"../" * depth + target`.
    pub fn from_normalized(&self, target: &str) -> RelativePath {
        RelativePath(format!("{}{target}", "../".repeat(self.depth())))
    }

    /// Resolve a raw reference (as written in HTML, CSS or JS) against this item.
    ///
    /// Resources are always made relative, captured or not.
    pub fn resolve(&self, reference: &str) -> UrlResolution {
        match self.locate(reference) {
            Ok(target) => UrlResolution::Relative(self.relative_path(&target)),
            Err(resolution) => resolution,
        }
    }

    /// Resolve a navigation link (`<a href>`). A target that is neither this
    /// item nor one of the known item paths is [`UrlResolution::NotCaptured`].
    pub fn resolve_link(&self, reference: &str) -> UrlResolution {
        match self.locate(reference) {
            Ok(target) if self.is_captured(&target.key) => {
                UrlResolution::Relative(self.relative_path(&target))
            }
            Ok(target) => UrlResolution::NotCaptured(target.key),
            Err(resolution) => resolution,
        }
    }

    /// Relative path for `reference`, or `None` when it must be left as written.
    pub fn rewrite(&self, reference: &str) -> Option<String> {
        self.resolve(reference).into_relative()
    }

    /// [`Self::rewrite`] for navigation links.
    pub fn rewrite_link(&self, reference: &str) -> Option<String> {
        self.resolve_link(reference).into_relative()
    }

    pub fn is_captured(&self, key: &str) -> bool {
        key == self.ctx.item_path || self.ctx.known_urls.contains(key)
    }

    /// [`Self::rewrite`], falling back to the original text.
    pub fn rewrite_or_keep<'r>(&self, reference: &'r str) -> Cow<'r, str> {
        self.rewrite(reference)
            .map_or(Cow::Borrowed(reference), Cow::Owned)
    }

    fn locate<'r>(&self, reference: &'r str) -> Result<Target<'r>, UrlResolution> {
        let reference = reference.trim();
        if reference.is_empty() || reference.starts_with('#') || has_foreign_scheme(reference) {
            return Err(UrlResolution::External);
        }

        let (target, fragment) = match reference.find('#') {
            Some(pos) => (&reference[..pos], Some(&reference[pos..])),
            None => (reference, None),
        };

        let Some(normalized) = self.absolute_key(target) else {
            log::debug!("Cannot resolve '{reference}' against '{}'", self.ctx.item_path);
            return Err(UrlResolution::External);
        };

        if !self.ctx.scope.contains(&normalized) {
            return Err(UrlResolution::OutOfScope(normalized));
        }

        Ok(Target {
            key: self.ctx.fuzzy_rules.reduce(&normalized).into_owned(),
            fragment,
        })
    }

    fn relative_path(&self, target: &Target<'_>) -> RelativePath {
        let mut relative = self.relative_to_item(&target.key);
        if let Some(fragment) = target.fragment {
            relative.push_str(fragment);
        }
        RelativePath(relative)
    }

    fn absolute_key(&self, target: &str) -> Option<NormalizedUrl> {
        if is_absolute_http(target) {
            return Some(normalize(target));
        }
        let base = Url::parse(&format!("http://{}", self.ctx.item_path)).ok()?;
        let joined = base.join(target).ok()?;
        Some(normalize(joined.as_str()))
    }

    fn relative_to_item(&self, target: &str) -> String {
        let mut item_dirs: Vec<&str> = self.ctx.item_path.split('/').collect();
        item_dirs.pop();
        let target_segments: Vec<&str> = target.split('/').collect();
        let target_dirs = &target_segments[..target_segments.len().saturating_sub(1)];

        let common = item_dirs
            .iter()
            .zip(target_dirs)
            .take_while(|(a, b)| a == b)
            .count();

        let mut out = "../".repeat(item_dirs.len() - common);
        let rest: Vec<String> = target_segments[common..]
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        out.push_str(&rest.join("/"));
        if out.is_empty() {
            out.push_str("./");
        }
        out
    }
}

/// `data:`, `mailto:`, `javascript:`... anything with a scheme other than http(s).
fn has_foreign_scheme(reference: &str) -> bool {
    let Some(colon) = reference.find(':') else {
        return false;
    };
    let scheme = &reference[..colon];
    let valid = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid && !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https")
}
