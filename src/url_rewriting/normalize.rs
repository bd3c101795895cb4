//! Surface-level URL canonicalization.
//!
//! A normalized URL is a lookup key, never something to resolve against. The
//! only transformation is dropping the scheme, so the key matches whatever was
//! stored when the resource was captured regardless of `http`/`https`.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::utils::decode_utf8_lossy;

/// Comparison key for a captured URL (scheme stripped, everything else verbatim).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for NormalizedUrl {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NormalizedUrl> for String {
    fn from(url: NormalizedUrl) -> Self {
        url.0
    }
}

/// Strip `http://`, `https://` (any case) or a scheme-relative `//` prefix.
///
/// Userinfo, host, path, query and trailing slashes are kept as they are;
/// percent-escapes are not decoded and dot segments are not resolved.
/// The function is idempotent.
#[must_use]
pub fn normalize(url: &str) -> NormalizedUrl {
    NormalizedUrl(strip_scheme(url).to_string())
}

/// [`normalize`] for raw bytes, decoded as UTF-8 first.
#[must_use]
pub fn normalize_bytes(url: &[u8]) -> NormalizedUrl {
    normalize(&decode_utf8_lossy(url))
}

/// Null-preserving variant: `None` in, `None` out.
#[must_use]
pub fn normalize_opt(url: Option<&str>) -> Option<NormalizedUrl> {
    url.map(normalize)
}

fn strip_scheme(url: &str) -> &str {
    let mut rest = url;
    // Loop so the result is a fixpoint: "http://http://x" and "////x" reduce fully.
    while let Some(stripped) = strip_one_scheme(rest) {
        rest = stripped;
    }
    rest
}

fn strip_one_scheme(url: &str) -> Option<&str> {
    for scheme in ["https://", "http://"] {
        let matches = url
            .get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme));
        if matches {
            return Some(&url[scheme.len()..]);
        }
    }
    url.strip_prefix("//")
}

/// Whether `reference` carries an `http`/`https` scheme or is scheme-relative.
pub(crate) fn is_absolute_http(reference: &str) -> bool {
    strip_scheme(reference).len() != reference.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_null() {
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize("").as_str(), "");
        assert_eq!(normalize_opt(Some("")).as_deref(), Some(""));
    }

    #[test]
    fn test_strips_scheme() {
        assert_eq!(normalize("https://example.com").as_str(), "example.com");
        assert_eq!(normalize("http://example.com").as_str(), "example.com");
        assert_eq!(normalize("HTTPS://Example.com/A").as_str(), "Example.com/A");
        assert_eq!(normalize("//cdn.example.com/x.js").as_str(), "cdn.example.com/x.js");
    }

    #[test]
    fn test_keeps_userinfo_path_and_query() {
        assert_eq!(
            normalize("http://test@example.com/").as_str(),
            "test@example.com/"
        );
        assert_eq!(
            normalize("https://exemple.com/path/to/article?foo=bar+baz&x=%20").as_str(),
            "exemple.com/path/to/article?foo=bar+baz&x=%20"
        );
        assert_eq!(
            normalize("http://example.com/a/../b/./c/").as_str(),
            "example.com/a/../b/./c/"
        );
    }

    #[test]
    fn test_other_schemes_untouched() {
        assert_eq!(normalize("ftp://example.com/f").as_str(), "ftp://example.com/f");
        assert_eq!(normalize("data:text/plain,hi").as_str(), "data:text/plain,hi");
    }

    #[test]
    fn test_idempotent() {
        for url in ["https://example.com/", "//a.b/c", "example.com", "http://x@y/z?q"] {
            let once = normalize(url);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_bytes_input() {
        assert_eq!(normalize_bytes(b"https://example.com/caf\xC3\xA9").as_str(), "example.com/café");
    }
}
