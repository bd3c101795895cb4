//! Package paths of every captured record.
//!
//! Gathered in a first pass over the archives (URLs only), so navigation
//! links can tell a captured page from one that was never archived.

use std::collections::HashSet;
use std::sync::LazyLock;

use super::fuzzy::FuzzyRules;
use super::item_path;

static NOTHING_KNOWN: LazyLock<KnownUrls> = LazyLock::new(KnownUrls::default);

/// Set of item paths (`fuzzy(normalize(url))`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownUrls {
    paths: HashSet<String>,
}

impl KnownUrls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared empty set.
    #[must_use]
    pub fn none() -> &'static KnownUrls {
        &NOTHING_KNOWN
    }

    /// Record a package path as it will be stored.
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.paths.insert(path.into())
    }

    /// Record a captured URL under its package path.
    pub fn insert_url(&mut self, url: &str, fuzzy_rules: &FuzzyRules) -> bool {
        self.insert(item_path(url, fuzzy_rules))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownUrls {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<S: Into<String>> Extend<S> for KnownUrls {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.paths.extend(iter.into_iter().map(Into::into));
    }
}
