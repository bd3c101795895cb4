//! Header fragment injected at the top of every HTML `<head>`.
//!
//! The fragment comes from a small template with `{{ name }}` placeholders.
//! Values are escaped for use inside a quoted JS string; the bundled template
//! only places them in string literals and `src` attributes.

use anyhow::{Result, bail};
use url::Url;

use crate::url_rewriting::ArticleUrlRewriter;
use crate::utils::STATIC_PREFIX;

/// Template used when the caller does not supply one.
pub const DEFAULT_HEAD_TEMPLATE: &str = r#"
<!-- offline replay bootstrap -->
<script>
  var wombatSetup = {
    prefix: "{{ static_prefix }}",
    path: "{{ path }}",
    origUrl: "{{ orig_url }}",
    origScheme: "{{ orig_scheme }}",
    origHost: "{{ orig_host }}",
  };
</script>
<script src="{{ static_prefix }}wombat.js"></script>
<script src="{{ static_prefix }}wombat_setup.js"></script>
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Path,
    StaticPrefix,
    OrigUrl,
    OrigScheme,
    OrigHost,
}

impl Placeholder {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "path" => Some(Self::Path),
            "static_prefix" => Some(Self::StaticPrefix),
            "orig_url" => Some(Self::OrigUrl),
            "orig_scheme" => Some(Self::OrigScheme),
            "orig_host" => Some(Self::OrigHost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Value(Placeholder),
}

/// Parsed header template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadTemplate {
    segments: Vec<Segment>,
}

impl Default for HeadTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_HEAD_TEMPLATE).unwrap_or(Self {
            segments: Vec::new(),
        })
    }
}

impl HeadTemplate {
    /// Parse a template.
    ///
    /// # Errors
    ///
    /// Returns an error when a `{{ ... }}` placeholder names an unknown value.
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut rest = source;
        while let Some(open) = rest.find("{{") {
            let Some(close) = rest[open + 2..].find("}}") else {
                break;
            };
            let name = rest[open + 2..open + 2 + close].trim();
            let Some(placeholder) = Placeholder::parse(name) else {
                bail!(
                    "Unknown placeholder '{{{{ {name} }}}}' in head template \
                     (expected path, static_prefix, orig_url, orig_scheme or orig_host)"
                );
            };
            if open > 0 {
                segments.push(Segment::Literal(rest[..open].to_string()));
            }
            segments.push(Segment::Value(placeholder));
            rest = &rest[open + 2 + close + 2..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        Ok(Self { segments })
    }

    pub fn render(&self, vars: &HeadVars) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Value(placeholder) => out.push_str(&escape_js_string(vars.get(*placeholder))),
            }
        }
        out
    }
}

/// Values substituted into the header template for one item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadVars {
    pub path: String,
    pub static_prefix: String,
    pub orig_url: String,
    pub orig_scheme: String,
    pub orig_host: String,
}

impl HeadVars {
    pub fn for_item(url_rewriter: &ArticleUrlRewriter<'_>, orig_url: &str) -> Self {
        let (orig_scheme, orig_host) = match Url::parse(orig_url) {
            Ok(url) => {
                let host = match (url.host_str(), url.port()) {
                    (Some(host), Some(port)) => format!("{host}:{port}"),
                    (Some(host), None) => host.to_string(),
                    (None, _) => String::new(),
                };
                (url.scheme().to_string(), host)
            }
            Err(_) => (String::new(), String::new()),
        };
        Self {
            path: url_rewriter.item_path().to_string(),
            static_prefix: url_rewriter.from_normalized(STATIC_PREFIX).into_string(),
            orig_url: orig_url.to_string(),
            orig_scheme,
            orig_host,
        }
    }

    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Path => &self.path,
            Placeholder::StaticPrefix => &self.static_prefix,
            Placeholder::OrigUrl => &self.orig_url,
            Placeholder::OrigScheme => &self.orig_scheme,
            Placeholder::OrigHost => &self.orig_host,
        }
    }
}

fn escape_js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '<' => out.push_str("\\x3C"),
            '>' => out.push_str("\\x3E"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_placeholders() {
        let template = HeadTemplate::parse("<s p=\"{{static_prefix}}\">{{ orig_host }}|{{ path }}</s>").unwrap();
        let rw = ArticleUrlRewriter::new("example.com/a/b.html");
        let vars = HeadVars::for_item(&rw, "https://example.com:8443/a/b.html");
        assert_eq!(
            template.render(&vars),
            "<s p=\"../../_offline_static/\">example.com:8443|example.com/a/b.html</s>"
        );
        assert_eq!(vars.orig_scheme, "https");
    }

    #[test]
    fn test_values_are_escaped() {
        let template = HeadTemplate::parse("\"{{ orig_url }}\"").unwrap();
        let vars = HeadVars {
            orig_url: "https://x.org/?q=\"</script>".into(),
            ..HeadVars::default()
        };
        assert_eq!(template.render(&vars), "\"https://x.org/?q=\\\"\\x3C/script\\x3E\"");
    }

    #[test]
    fn test_unknown_placeholder_rejected() {
        assert!(HeadTemplate::parse("{{ secret }}").is_err());
    }

    #[test]
    fn test_unterminated_braces_are_literal() {
        let template = HeadTemplate::parse("a {{ b").unwrap();
        assert_eq!(template.render(&HeadVars::default()), "a {{ b");
    }

    #[test]
    fn test_default_template_parses() {
        let rw = ArticleUrlRewriter::new("example.com/index.html");
        let rendered = HeadTemplate::default().render(&HeadVars::for_item(&rw, "https://example.com/index.html"));
        assert!(rendered.contains("<script src=\"../_offline_static/wombat.js\"></script>"));
        assert!(rendered.contains("origHost: \"example.com\""));
    }
}
