//! Stylesheet rewriting: `url(...)` references and `@import` strings.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::url_rewriting::ArticleUrlRewriter;

static URL_FN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(url)\((\s*)(?:"([^"]*)"|'([^']*)'|([^)'"\s]*))(\s*)\)"#)
        .expect("URL_FN: hardcoded regex is valid")
});

static IMPORT_STRING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(@import\s+)(?:"([^"]*)"|'([^']*)')"#)
        .expect("IMPORT_STRING: hardcoded regex is valid")
});

/// Rewrites references in stylesheets and `style` attribute values.
#[derive(Debug, Clone, Copy)]
pub struct CssRewriter<'a> {
    url_rewriter: ArticleUrlRewriter<'a>,
}

impl<'a> CssRewriter<'a> {
    pub fn new(url_rewriter: ArticleUrlRewriter<'a>) -> Self {
        Self { url_rewriter }
    }

    /// Rewrite a full stylesheet. Comments are copied through untouched.
    pub fn rewrite(&self, css: &str) -> String {
        let mut out = String::with_capacity(css.len());
        let mut rest = css;
        while let Some(open) = rest.find("/*") {
            out.push_str(&self.rewrite_code(&rest[..open]));
            let comment_len = rest[open + 2..]
                .find("*/")
                .map_or(rest.len() - open, |close| close + 4);
            out.push_str(&rest[open..open + comment_len]);
            rest = &rest[open + comment_len..];
        }
        out.push_str(&self.rewrite_code(rest));
        out
    }

    /// Rewrite the value of a `style` attribute.
    pub fn rewrite_inline(&self, style: &str) -> String {
        self.rewrite(style)
    }

    fn rewrite_code<'c>(&self, code: &'c str) -> Cow<'c, str> {
        let code = URL_FN.replace_all(code, |caps: &Captures<'_>| self.rewrite_url_fn(caps));
        match code {
            Cow::Borrowed(code) => {
                IMPORT_STRING.replace_all(code, |caps: &Captures<'_>| self.rewrite_import(caps))
            }
            Cow::Owned(code) => Cow::Owned(
                IMPORT_STRING
                    .replace_all(&code, |caps: &Captures<'_>| self.rewrite_import(caps))
                    .into_owned(),
            ),
        }
    }

    fn rewrite_url_fn(&self, caps: &Captures<'_>) -> String {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let (value, quote) = match (caps.get(3), caps.get(4), caps.get(5)) {
            (Some(v), _, _) => (v.as_str(), "\""),
            (_, Some(v), _) => (v.as_str(), "'"),
            (_, _, Some(v)) => (v.as_str(), ""),
            _ => return whole.to_string(),
        };
        match self.url_rewriter.rewrite(value) {
            Some(rewritten) => format!(
                "{}({}{quote}{rewritten}{quote}{})",
                &caps[1], &caps[2], &caps[6]
            ),
            None => whole.to_string(),
        }
    }

    fn rewrite_import(&self, caps: &Captures<'_>) -> String {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let (value, quote) = match (caps.get(2), caps.get(3)) {
            (Some(v), _) => (v.as_str(), '"'),
            (_, Some(v)) => (v.as_str(), '\''),
            _ => return whole.to_string(),
        };
        match self.url_rewriter.rewrite(value) {
            Some(rewritten) => format!("{}{quote}{rewritten}{quote}", &caps[1]),
            None => whole.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_rewriting::ScopeFilter;

    fn rewrite(item: &str, css: &str) -> String {
        CssRewriter::new(ArticleUrlRewriter::new(item)).rewrite(css)
    }

    #[test]
    fn test_quote_styles_preserved() {
        let css = r#"a { background: url("img/a.png"); } b { background: url( 'https://example.com/b.png' ); } c { background: URL(c.png) }"#;
        assert_eq!(
            rewrite("example.com/css/site.css", css),
            r#"a { background: url("img/a.png"); } b { background: url( '../b.png' ); } c { background: URL(c.png) }"#
        );
    }

    #[test]
    fn test_relative_to_css_depth() {
        assert_eq!(
            rewrite("example.com/static/css/main.css", "body{background:url(/img/bg.jpg)}"),
            "body{background:url(../../img/bg.jpg)}"
        );
    }

    #[test]
    fn test_data_uri_and_out_of_scope_untouched() {
        let scope = ScopeFilter::new(["example.com"]);
        let rw = CssRewriter::new(ArticleUrlRewriter::with_scope("example.com/a.css", &scope));
        let css = "a{background:url(data:image/png;base64,AAAA)} b{background:url(https://cdn.net/x.png)}";
        assert_eq!(rw.rewrite(css), css);
    }

    #[test]
    fn test_comments_untouched() {
        let css = "/* url(https://example.com/x.png) */ a{background:url(https://example.com/y.png)} /* open";
        assert_eq!(
            rewrite("example.com/a.css", css),
            "/* url(https://example.com/x.png) */ a{background:url(y.png)} /* open"
        );
    }

    #[test]
    fn test_import_rules() {
        assert_eq!(
            rewrite(
                "example.com/css/a.css",
                "@import \"https://fonts.example.com/f.css\";\n@import url('b.css');"
            ),
            "@import \"../../fonts.example.com/f.css\";\n@import url('b.css');"
        );
    }
}
