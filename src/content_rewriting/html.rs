//! HTML rewriting on top of lol_html's streaming rewriter.
//!
//! Resource attributes are resolved through the item's [`ArticleUrlRewriter`]
//! (`<a href>` only when its target was captured). Inline `<style>` and
//! `style=` go through [`CssRewriter`], inline scripts through
//! [`JsRewriter`], and the header fragments are placed inside `<head>`. The
//! first `<title>` is captured on the way through.

use std::cell::{Cell, RefCell};

use anyhow::{Result, anyhow};
use lol_html::html_content::ContentType;
use lol_html::{HtmlRewriter as StreamRewriter, Settings, element, text};

use super::css::CssRewriter;
use super::js::{JsRewriter, ScriptKind};
use crate::url_rewriting::ArticleUrlRewriter;

/// Attributes holding a single URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "poster"];

/// Attributes holding a comma separated `url descriptor` list.
const SRCSET_ATTRIBUTES: &[&str] = &["srcset", "imagesrcset"];

/// Output of [`HtmlRewriter::rewrite`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenHtml {
    /// Text of the first `<title>`, entity-decoded and trimmed; empty if absent.
    pub title: String,
    pub content: String,
}

/// Rewrites one HTML document.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRewriter<'a> {
    url_rewriter: ArticleUrlRewriter<'a>,
    pre_head_insert: &'a str,
    post_head_insert: Option<&'a str>,
}

impl<'a> HtmlRewriter<'a> {
    pub fn new(url_rewriter: ArticleUrlRewriter<'a>) -> Self {
        Self {
            url_rewriter,
            pre_head_insert: "",
            post_head_insert: None,
        }
    }

    /// Fragment placed right after `<head>`.
    #[must_use]
    pub fn with_pre_head_insert(mut self, fragment: &'a str) -> Self {
        self.pre_head_insert = fragment;
        self
    }

    /// Fragment placed right before `</head>`.
    #[must_use]
    pub fn with_post_head_insert(mut self, fragment: Option<&'a str>) -> Self {
        self.post_head_insert = fragment;
        self
    }

    /// Rewrite a document. Never fails: on a parser error the input is
    /// returned unchanged with an empty title.
    pub fn rewrite(&self, html: &str) -> RewrittenHtml {
        match self.try_rewrite(html) {
            Ok(rewritten) => rewritten,
            Err(e) => {
                log::debug!(
                    "HTML rewrite of {} failed, passing through: {e:#}",
                    self.url_rewriter.item_path()
                );
                RewrittenHtml {
                    title: String::new(),
                    content: html.to_string(),
                }
            }
        }
    }

    fn try_rewrite(&self, html: &str) -> Result<RewrittenHtml> {
        let css = CssRewriter::new(self.url_rewriter);
        let js = JsRewriter::new(self.url_rewriter);

        let head_seen = Cell::new(false);
        let script_kind: Cell<Option<ScriptKind>> = Cell::new(None);
        let script_buffer = RefCell::new(String::new());
        let style_buffer = RefCell::new(String::new());
        let title = RefCell::new(String::new());
        let title_state = Cell::new(TitleState::Pending);

        let mut output = Vec::with_capacity(html.len() + self.pre_head_insert.len());
        let mut rewriter = StreamRewriter::new(
            Settings {
                element_content_handlers: vec![
                    element!("*", |el| {
                        let is_anchor = el.tag_name().eq_ignore_ascii_case("a");
                        for name in URL_ATTRIBUTES {
                            if let Some(value) = el.get_attribute(name) {
                                let decoded = html_escape::decode_html_entities(&value);
                                let rewritten = if is_anchor && *name == "href" {
                                    self.url_rewriter.rewrite_link(&decoded)
                                } else {
                                    self.url_rewriter.rewrite(&decoded)
                                };
                                if let Some(rewritten) = rewritten {
                                    set_if_changed(el, name, &value, &rewritten)?;
                                }
                            }
                        }
                        for name in SRCSET_ATTRIBUTES {
                            if let Some(value) = el.get_attribute(name) {
                                let decoded = html_escape::decode_html_entities(&value);
                                let rewritten = self.rewrite_srcset(&decoded);
                                set_if_changed(el, name, &value, &rewritten)?;
                            }
                        }
                        if let Some(value) = el.get_attribute("style") {
                            let decoded = html_escape::decode_html_entities(&value);
                            let rewritten = css.rewrite_inline(&decoded);
                            set_if_changed(el, "style", &value, &rewritten)?;
                        }
                        Ok(())
                    }),
                    element!("head", |el| {
                        if !head_seen.replace(true) {
                            if !self.pre_head_insert.is_empty() {
                                el.prepend(self.pre_head_insert, ContentType::Html);
                            }
                            if let Some(post) = self.post_head_insert {
                                el.append(post, ContentType::Html);
                            }
                        }
                        Ok(())
                    }),
                    element!("script", |el| {
                        script_kind.set(script_kind_for(el.get_attribute("type").as_deref()));
                        Ok(())
                    }),
                    element!("title", |_el| {
                        // A second <title> ends collection even if the first had no text.
                        title_state.set(match title_state.get() {
                            TitleState::Pending => TitleState::Collecting,
                            TitleState::Collecting | TitleState::Done => TitleState::Done,
                        });
                        Ok(())
                    }),
                    text!("title", |t| {
                        if title_state.get() == TitleState::Collecting {
                            title.borrow_mut().push_str(t.as_str());
                            if t.last_in_text_node() {
                                title_state.set(TitleState::Done);
                            }
                        }
                        Ok(())
                    }),
                    text!("script", |t| {
                        let Some(kind) = script_kind.get() else {
                            return Ok(());
                        };
                        script_buffer.borrow_mut().push_str(t.as_str());
                        if t.last_in_text_node() {
                            let source = script_buffer.take();
                            if !source.trim().is_empty() {
                                let rewritten = js.rewrite_as(&source, kind);
                                t.replace(&rewritten, ContentType::Html);
                            }
                        } else {
                            t.remove();
                        }
                        Ok(())
                    }),
                    text!("style", |t| {
                        style_buffer.borrow_mut().push_str(t.as_str());
                        if t.last_in_text_node() {
                            let source = style_buffer.take();
                            t.replace(&css.rewrite(&source), ContentType::Html);
                        } else {
                            t.remove();
                        }
                        Ok(())
                    }),
                ],
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );

        rewriter
            .write(html.as_bytes())
            .map_err(|e| anyhow!("HTML rewrite error: {e}"))?;
        rewriter
            .end()
            .map_err(|e| anyhow!("HTML rewrite finalization error: {e}"))?;

        let content = String::from_utf8(output)
            .map_err(|e| anyhow!("Invalid UTF-8 in rewritten HTML: {e}"))?;
        let title = html_escape::decode_html_entities(title.borrow().trim()).into_owned();
        Ok(RewrittenHtml { title, content })
    }

    fn rewrite_srcset(&self, srcset: &str) -> String {
        srcset
            .split(',')
            .map(|candidate| {
                let candidate = candidate.trim();
                let (url, descriptor) = match candidate.split_once(char::is_whitespace) {
                    Some((url, descriptor)) => (url, Some(descriptor.trim())),
                    None => (candidate, None),
                };
                let url = self.url_rewriter.rewrite_or_keep(url);
                match descriptor {
                    Some(descriptor) if !descriptor.is_empty() => format!("{url} {descriptor}"),
                    _ => url.into_owned(),
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TitleState {
    Pending,
    Collecting,
    Done,
}

/// Script handling for a `<script type=...>` value; `None` leaves the content alone.
fn script_kind_for(script_type: Option<&str>) -> Option<ScriptKind> {
    let script_type = script_type.map(|t| t.trim().to_ascii_lowercase());
    match script_type.as_deref() {
        None | Some("") => Some(ScriptKind::Classic),
        Some("module") => Some(ScriptKind::Module),
        Some(
            "text/javascript" | "application/javascript" | "application/x-javascript"
            | "text/ecmascript" | "application/ecmascript" | "text/jscript",
        ) => Some(ScriptKind::Classic),
        Some(_) => None,
    }
}

fn set_if_changed(
    el: &mut lol_html::html_content::Element<'_, '_>,
    name: &str,
    original: &str,
    rewritten: &str,
) -> Result<(), lol_html::errors::AttributeNameError> {
    let encoded = html_escape::encode_double_quoted_attribute(rewritten);
    if encoded != original {
        el.set_attribute(name, &encoded)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url_rewriting::{KnownUrls, RewriteContext, ScopeFilter};

    fn rewrite(item: &str, html: &str) -> RewrittenHtml {
        HtmlRewriter::new(ArticleUrlRewriter::new(item)).rewrite(html)
    }

    #[test]
    fn test_attributes_rewritten() {
        let known: KnownUrls = ["example.com/about.html"].into_iter().collect();
        let ctx = RewriteContext::new("example.com/docs/index.html").with_known_urls(&known);
        let html = r#"<a href="https://example.com/about.html">a</a><img src="/img/logo.png" srcset="/img/a.png 1x, https://example.com/img/b.png 2x"><video poster="p.jpg"></video>"#;
        let out = HtmlRewriter::new(ctx.rewriter()).rewrite(html);
        assert_eq!(
            out.content,
            r#"<a href="../about.html">a</a><img src="../img/logo.png" srcset="../img/a.png 1x, ../img/b.png 2x"><video poster="p.jpg"></video>"#
        );
    }

    #[test]
    fn test_entity_encoded_attribute() {
        let out = rewrite(
            "example.com/index.html",
            r#"<img src="https://example.com/page?a=1&amp;b=2">"#,
        );
        assert_eq!(out.content, r#"<img src="page%3Fa%3D1%26b%3D2">"#);
    }

    #[test]
    fn test_head_inserts_and_title() {
        let html = "<html><head><title> A &amp; B </title></head><body><title>second</title></body></html>";
        let out = HtmlRewriter::new(ArticleUrlRewriter::new("example.com/index.html"))
            .with_pre_head_insert("<script>pre</script>")
            .with_post_head_insert(Some("<link rel=\"stylesheet\">"))
            .rewrite(html);
        assert_eq!(out.title, "A & B");
        assert_eq!(
            out.content,
            "<html><head><script>pre</script><title> A &amp; B </title><link rel=\"stylesheet\"></head><body><title>second</title></body></html>"
        );
    }

    #[test]
    fn test_missing_title_is_empty() {
        assert_eq!(rewrite("example.com/", "<p>hi</p>").title, "");
    }

    #[test]
    fn test_inline_style_and_css() {
        let html = r#"<style>body{background:url(https://example.com/bg.png)}</style><div style="background: url('/x.png')"></div>"#;
        let out = rewrite("example.com/a/index.html", html);
        assert_eq!(
            out.content,
            r#"<style>body{background:url(../bg.png)}</style><div style="background: url('../x.png')"></div>"#
        );
    }

    #[test]
    fn test_inline_scripts() {
        let html = "<script>a = this;</script><script type=\"application/json\">{\"a\": this}</script>";
        let out = rewrite("example.com/index.html", html);
        assert_eq!(
            out.content,
            "<script>a = _____WB$wombat$check$this$function_____(this);</script><script type=\"application/json\">{\"a\": this}</script>"
        );
    }

    #[test]
    fn test_module_script_gets_header() {
        let out = rewrite(
            "example.com/index.html",
            "<script type=\"module\">let x = 1;</script>",
        );
        assert!(out.content.starts_with(
            "<script type=\"module\">import { window, globalThis, self, document, location, top, parent, frames, opener } from \"../_offline_static/__wb_module_decl.js\";\nlet x = 1;"
        ));
    }

    #[test]
    fn test_out_of_scope_and_external_untouched() {
        let scope = ScopeFilter::new(["example.com"]);
        let rw = ArticleUrlRewriter::with_scope("example.com/index.html", &scope);
        let html = r##"<a href="https://other.org/">o</a><a href="#top">t</a><a href="mailto:x@y.z">m</a>"##;
        assert_eq!(HtmlRewriter::new(rw).rewrite(html).content, html);
    }

    #[test]
    fn test_uncaptured_link_left_absolute() {
        let known: KnownUrls = ["example.com/captured.html"].into_iter().collect();
        let ctx = RewriteContext::new("example.com/index.html").with_known_urls(&known);
        let html = r#"<a href="https://en.wikipedia.org/wiki/Foo">ext</a><a href="/missing.html">m</a><a href="https://example.com/captured.html">c</a><link href="https://cdn.net/a.css">"#;
        assert_eq!(
            HtmlRewriter::new(ctx.rewriter()).rewrite(html).content,
            r#"<a href="https://en.wikipedia.org/wiki/Foo">ext</a><a href="/missing.html">m</a><a href="captured.html">c</a><link href="../cdn.net/a.css">"#
        );
    }

    #[test]
    fn test_script_kind_for_type() {
        assert_eq!(script_kind_for(None), Some(ScriptKind::Classic));
        assert_eq!(script_kind_for(Some(" Module ")), Some(ScriptKind::Module));
        assert_eq!(script_kind_for(Some("text/template")), None);
    }
}
