//! URL canonicalization and resolution shared by all content rewriters.

pub mod article;
pub mod fuzzy;
pub mod known;
pub mod normalize;
pub mod scope;

pub use article::{ArticleUrlRewriter, RelativePath, RewriteContext, UrlResolution};
pub use fuzzy::{FuzzyRule, FuzzyRules};
pub use known::KnownUrls;
pub use normalize::{NormalizedUrl, normalize, normalize_bytes, normalize_opt};
pub use scope::ScopeFilter;

/// Package path of a captured URL: fuzzy key of its normalized form.
#[must_use]
pub fn item_path(url: &str, fuzzy_rules: &FuzzyRules) -> String {
    let normalized = normalize(url);
    fuzzy_rules.reduce(&normalized).into_owned()
}
