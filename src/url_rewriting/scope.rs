//! Domain scope filter: which normalized URLs belong in the package.

use serde::{Deserialize, Serialize};

use super::normalize::{NormalizedUrl, normalize};

/// Set of normalized URL prefixes considered in scope.
///
/// An empty filter means every URL is in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeFilter {
    prefixes: Vec<NormalizedUrl>,
}

static UNSCOPED: ScopeFilter = ScopeFilter {
    prefixes: Vec::new(),
};

impl ScopeFilter {
    /// Filter that accepts everything.
    #[must_use]
    pub fn unscoped() -> &'static ScopeFilter {
        &UNSCOPED
    }

    /// Build a filter from raw prefixes; each one is normalized first and
    /// blank entries are ignored.
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut prefixes: Vec<NormalizedUrl> = prefixes
            .into_iter()
            .map(|p| normalize(p.as_ref().trim()))
            .filter(|p| !p.is_empty())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        Self { prefixes }
    }

    pub fn is_unscoped(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[NormalizedUrl] {
        &self.prefixes
    }

    /// Whether a normalized URL starts with one of the prefixes.
    pub fn contains(&self, normalized: &str) -> bool {
        self.is_unscoped() || self.prefixes.iter().any(|p| normalized.starts_with(p.as_str()))
    }

    pub fn add(&mut self, prefix: &str) {
        let prefix = normalize(prefix.trim());
        if !prefix.is_empty() && !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_filter_accepts_all() {
        assert!(ScopeFilter::unscoped().contains("anything.org/x"));
        assert!(ScopeFilter::new(["  ", ""]).is_unscoped());
    }

    #[test]
    fn test_prefix_match_on_normalized_form() {
        let scope = ScopeFilter::new(["https://example.com/", "cdn.example.net"]);
        assert!(scope.contains("example.com/page"));
        assert!(scope.contains("cdn.example.net/lib.js"));
        assert!(!scope.contains("other.org/page"));
        assert!(!scope.contains("www.example.com/page"));
    }

    #[test]
    fn test_add_deduplicates() {
        let mut scope = ScopeFilter::default();
        scope.add("http://a.com");
        scope.add("a.com");
        assert_eq!(scope.prefixes().len(), 1);
    }
}
