//! Fuzzy match rules collapsing dynamic-content URL variants onto one key.
//!
//! Each rule pairs a pattern with a replacement template. Rules are tried in
//! order against a normalized URL; the first pattern matching at the start of
//! the URL replaces the *whole* URL with its expanded template. Query noise
//! (session tokens, timestamps) is thereby dropped so every as-captured variant
//! of one video or media resource converges on a single stored item.

use std::borrow::Cow;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use fancy_regex::Regex;

/// Builtin rule table as `(pattern, replacement)` pairs.
///
/// Patterns may use look-around, which is why they are compiled with
/// `fancy_regex` rather than `regex`.
const BUILTIN_RULES: &[(&str, &str)] = &[
    (
        r".*googlevideo.com/(videoplayback\?).*((?<=[?&])id=[^&]+).*",
        "youtube.fuzzy.replayweb.page/$1$2",
    ),
    (
        r"(?:www\.)?youtube(?:-nocookie)?\.com/(get_video_info\?).*(video_id=[^&]+).*",
        "youtube.fuzzy.replayweb.page/$1$2",
    ),
    (r"([^?]+\?)[\d]+$", "$1"),
    (
        r"(?:www\.)?youtube(?:-nocookie)?\.com/(youtubei/[^?]+).*(videoId[^&]+).*",
        "youtube.fuzzy.replayweb.page/$1?$2",
    ),
    (
        r"(?:www\.)?youtube(?:-nocookie)?\.com/embed/([^?]+).*",
        "youtube.fuzzy.replayweb.page/embed/$1",
    ),
    (
        r".*(?:gcs-vimeo|vod|vod-progressive)\.akamaized\.net.*?/([\d/]+.mp4)$",
        "vimeo-cdn.fuzzy.replayweb.page/$1",
    ),
    (
        r".*player.vimeo.com/(video/[\d]+)\?.*",
        "vimeo.fuzzy.replayweb.page/$1",
    ),
];

static BUILTIN: LazyLock<FuzzyRules> = LazyLock::new(|| {
    let rules = BUILTIN_RULES
        .iter()
        .filter_map(|(pattern, replace)| match FuzzyRule::new(pattern, replace) {
            Ok(rule) => Some(rule),
            Err(e) => {
                log::error!("Builtin fuzzy rule failed to compile: {e:#}");
                None
            }
        })
        .collect();
    FuzzyRules { rules }
});

/// One `(pattern, key builder)` entry of the rule table.
#[derive(Debug, Clone)]
pub struct FuzzyRule {
    pattern: Regex,
    replace: String,
}

impl FuzzyRule {
    /// Compile a rule. The pattern is implicitly anchored at the start of the URL.
    ///
    /// The replacement uses [`fancy_regex::Captures::expand`] syntax: `$1` or `${1}` for a
    /// group, `$$` for a literal `$`. Unknown groups expand to nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is not a valid regex.
    pub fn new(pattern: &str, replace: &str) -> Result<Self> {
        let anchored = format!("^(?:{pattern})");
        let pattern = Regex::new(&anchored)
            .map_err(|e| anyhow!("Invalid fuzzy rule pattern '{pattern}': {e}"))?;
        Ok(Self {
            pattern,
            replace: replace.to_string(),
        })
    }

    /// Original pattern source (including the implicit anchor).
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn replacement(&self) -> &str {
        &self.replace
    }

    /// Return the canonical key for `url` if this rule matches it.
    pub fn apply(&self, url: &str) -> Option<String> {
        match self.pattern.captures(url) {
            Ok(Some(caps)) => {
                let mut key = String::with_capacity(self.replace.len() + 32);
                caps.expand(&self.replace, &mut key);
                Some(key)
            }
            Ok(None) => None,
            Err(e) => {
                // Backtrack limit exhausted: no match.
                log::debug!("Fuzzy rule {} gave up on {url}: {e}", self.pattern.as_str());
                None
            }
        }
    }
}

/// Ordered, first-match-wins rule table.
#[derive(Debug, Clone, Default)]
pub struct FuzzyRules {
    rules: Vec<FuzzyRule>,
}

impl FuzzyRules {
    /// Table with no rules: every URL falls through to exact lookup.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shared builtin table (video delivery endpoints).
    #[must_use]
    pub fn builtin() -> &'static FuzzyRules {
        &BUILTIN
    }

    /// Builtin rules followed by `extra`, for site-specific additions.
    #[must_use]
    pub fn with_extra(extra: impl IntoIterator<Item = FuzzyRule>) -> Self {
        let mut rules = BUILTIN.rules.clone();
        rules.extend(extra);
        Self { rules }
    }

    pub fn push(&mut self, rule: FuzzyRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Lookup key for a normalized URL: the first matching rule's expansion,
    /// or the URL itself when no rule matches.
    pub fn reduce<'u>(&self, url: &'u str) -> Cow<'u, str> {
        self.rules
            .iter()
            .find_map(|rule| rule.apply(url))
            .map_or(Cow::Borrowed(url), Cow::Owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reduce(url: &str) -> String {
        FuzzyRules::builtin().reduce(url).into_owned()
    }

    #[test]
    fn test_builtin_compiles() {
        assert_eq!(FuzzyRules::builtin().len(), BUILTIN_RULES.len());
    }

    #[test]
    fn test_googlevideo() {
        let expected = "youtube.fuzzy.replayweb.page/videoplayback?id=1576";
        assert_eq!(reduce("foobargooglevideo.com/videoplayback?id=1576&key=value"), expected);
        assert_eq!(reduce("foobargooglevideo.com/videoplayback?some=thing&id=1576"), expected);
        assert_eq!(
            reduce("foobargooglevideo.com/videoplayback?some=thing&id=1576&key=value"),
            expected
        );
    }

    #[test]
    fn test_googlevideo_no_match() {
        let url = "foobargooglevideo.com/videoplaybackandfoo?some=thing&id=1576&key=value";
        assert_eq!(reduce(url), url);
        let url = "foobargoogle_video.com/videoplaybackandfoo?some=thing&id=1576&key=value";
        assert_eq!(reduce(url), url);
    }

    #[test]
    fn test_youtube_rules() {
        assert_eq!(
            reduce("www.youtube.com/get_video_info?foo=bar&video_id=abc&t=1"),
            "youtube.fuzzy.replayweb.page/get_video_info?video_id=abc"
        );
        assert_eq!(
            reduce("youtube.com/youtubei/v1/player?key=value&videoId=xxxx&other=1"),
            "youtube.fuzzy.replayweb.page/youtubei/v1/player?videoId=xxxx"
        );
        assert_eq!(
            reduce("www.youtube-nocookie.com/embed/dQw4w9WgXcQ?autoplay=1"),
            "youtube.fuzzy.replayweb.page/embed/dQw4w9WgXcQ"
        );
    }

    #[test]
    fn test_timestamp_query_dropped() {
        assert_eq!(reduce("example.com/script.js?1712345678"), "example.com/script.js?");
        assert_eq!(reduce("example.com/script.js?v=2"), "example.com/script.js?v=2");
    }

    #[test]
    fn test_vimeo_rules() {
        assert_eq!(
            reduce("vod-progressive.akamaized.net/exp=1~acl=x/123/456/789.mp4"),
            "vimeo-cdn.fuzzy.replayweb.page/123/456/789.mp4"
        );
        assert_eq!(
            reduce("player.vimeo.com/video/123456?h=abc&app_id=1"),
            "vimeo.fuzzy.replayweb.page/video/123456"
        );
    }

    #[test]
    fn test_first_match_wins_and_extra_rules() {
        let mut rules = FuzzyRules::empty();
        rules.push(FuzzyRule::new(r"cdn\.example\.com/(assets/[^?]+)\?.*", "cdn.example.com/$1").unwrap());
        rules.push(FuzzyRule::new(r"cdn\.example\.com/.*", "never").unwrap());
        assert_eq!(
            rules.reduce("cdn.example.com/assets/app.css?token=abc"),
            "cdn.example.com/assets/app.css"
        );
        assert_eq!(rules.reduce("other.com/x"), "other.com/x");
    }

    #[test]
    fn test_expand_literal_dollar() {
        let rule = FuzzyRule::new(r"(a+)", "$$-$1-$x").unwrap();
        // `$x` names a group the pattern does not have.
        assert_eq!(rule.apply("aaa").as_deref(), Some("$-aaa-"));
        let rule = FuzzyRule::new(r"(a+)(b+)", "${1}0$2").unwrap();
        assert_eq!(rule.apply("aab").as_deref(), Some("aa0b"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(FuzzyRule::new("(unclosed", "x").is_err());
    }
}
