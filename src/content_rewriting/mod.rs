//! Content rewriting, dispatched on the captured mime type.

pub mod css;
pub mod head_insert;
pub mod html;
pub mod js;

pub use css::CssRewriter;
pub use head_insert::{DEFAULT_HEAD_TEMPLATE, HeadTemplate, HeadVars};
pub use html::{HtmlRewriter, RewrittenHtml};
pub use js::{JsRewriter, ScriptKind};

use crate::url_rewriting::{ArticleUrlRewriter, RewriteContext};
use crate::utils::decode_utf8_strict;

/// Which rewriter handles a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Css,
    Js,
    /// Unrecognized: stored unchanged.
    Other,
}

impl ContentKind {
    /// Classify a mime type essence (see [`crate::utils::mime_essence`]).
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            "text/html" | "application/xhtml+xml" => Self::Html,
            "text/css" => Self::Css,
            m if m.contains("javascript") || m.contains("ecmascript") => Self::Js,
            _ => Self::Other,
        }
    }

    pub fn is_html(self) -> bool {
        self == Self::Html
    }
}

/// Everything a rewriter needs to know about the item being rewritten.
#[derive(Debug, Clone, Copy)]
pub struct ContentContext<'a> {
    pub rewrite: RewriteContext<'a>,
    /// Captured URL of the item, exposed to the header template.
    pub orig_url: &'a str,
    pub head_template: &'a HeadTemplate,
    /// Package path of the custom stylesheet linked from every HTML page.
    pub custom_css_path: Option<&'a str>,
}

/// Rewritten payload plus the side information extracted from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenContent {
    /// Document title; `Some` (possibly empty) exactly for HTML.
    pub title: Option<String>,
    pub content: Vec<u8>,
}

impl RewrittenContent {
    fn passthrough(kind: ContentKind, content: &[u8]) -> Self {
        Self {
            title: kind.is_html().then(String::new),
            content: content.to_vec(),
        }
    }
}

/// Rewrite one record's payload. Never fails: content that is not valid
/// UTF-8 or not understood is returned unchanged.
pub fn rewrite_content(kind: ContentKind, content: &[u8], ctx: &ContentContext<'_>) -> RewrittenContent {
    if kind == ContentKind::Other {
        return RewrittenContent::passthrough(kind, content);
    }
    let Some(text) = decode_utf8_strict(content) else {
        log::debug!(
            "{} is not valid UTF-8, storing it unchanged",
            ctx.rewrite.item_path
        );
        return RewrittenContent::passthrough(kind, content);
    };

    let url_rewriter = ArticleUrlRewriter::from_context(ctx.rewrite);
    match kind {
        ContentKind::Html => {
            let vars = HeadVars::for_item(&url_rewriter, ctx.orig_url);
            let pre_head = ctx.head_template.render(&vars);
            let post_head = ctx.custom_css_path.map(|path| {
                format!(
                    "<link type=\"text/css\" href=\"{}\" rel=\"Stylesheet\" />",
                    url_rewriter.from_normalized(path)
                )
            });
            let rewritten = HtmlRewriter::new(url_rewriter)
                .with_pre_head_insert(&pre_head)
                .with_post_head_insert(post_head.as_deref())
                .rewrite(text);
            RewrittenContent {
                title: Some(rewritten.title),
                content: rewritten.content.into_bytes(),
            }
        }
        ContentKind::Css => RewrittenContent {
            title: None,
            content: CssRewriter::new(url_rewriter).rewrite(text).into_bytes(),
        },
        ContentKind::Js => RewrittenContent {
            title: None,
            content: JsRewriter::new(url_rewriter).rewrite(text).into_bytes(),
        },
        ContentKind::Other => RewrittenContent::passthrough(kind, content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(item_path: &'a str, template: &'a HeadTemplate) -> ContentContext<'a> {
        ContentContext {
            rewrite: RewriteContext::new(item_path),
            orig_url: "https://example.com/a/page.html",
            head_template: template,
            custom_css_path: None,
        }
    }

    #[test]
    fn test_kind_from_mime() {
        assert_eq!(ContentKind::from_mime("text/html"), ContentKind::Html);
        assert_eq!(ContentKind::from_mime("text/css"), ContentKind::Css);
        assert_eq!(ContentKind::from_mime("application/javascript"), ContentKind::Js);
        assert_eq!(ContentKind::from_mime("text/x-ecmascript"), ContentKind::Js);
        assert_eq!(ContentKind::from_mime("image/png"), ContentKind::Other);
    }

    #[test]
    fn test_unknown_and_invalid_content_passthrough() {
        let template = HeadTemplate::default();
        let ctx = ctx("example.com/a/page.html", &template);
        let png = b"\x89PNG\r\n";
        assert_eq!(rewrite_content(ContentKind::Other, png, &ctx).content, png);

        let latin1 = b"<html><head><title>caf\xE9</title></head></html>";
        let out = rewrite_content(ContentKind::Html, latin1, &ctx);
        assert_eq!(out.content, latin1);
        assert_eq!(out.title.as_deref(), Some(""));
    }

    #[test]
    fn test_html_gets_header_and_custom_css() {
        let template = HeadTemplate::parse("<script src=\"{{ static_prefix }}w.js\"></script>").unwrap();
        let mut ctx = ctx("example.com/a/page.html", &template);
        ctx.custom_css_path = Some("offline.custom.css/custom.css");
        let out = rewrite_content(
            ContentKind::Html,
            b"<html><head><title>T</title></head><body></body></html>",
            &ctx,
        );
        assert_eq!(out.title.as_deref(), Some("T"));
        assert_eq!(
            String::from_utf8(out.content).unwrap(),
            "<html><head><script src=\"../../_offline_static/w.js\"></script><title>T</title>\
             <link type=\"text/css\" href=\"../../offline.custom.css/custom.css\" rel=\"Stylesheet\" />\
             </head><body></body></html>"
        );
    }

    #[test]
    fn test_css_and_js_have_no_title() {
        let template = HeadTemplate::default();
        let ctx = ctx("example.com/a/style.css", &template);
        let css = rewrite_content(ContentKind::Css, b"a{background:url(/b.png)}", &ctx);
        assert_eq!(css.title, None);
        assert_eq!(css.content, b"a{background:url(../b.png)}");
        let js = rewrite_content(ContentKind::Js, b"let a = 1;", &ctx);
        assert_eq!(js.content, b"let a = 1;");
    }
}
