//! JavaScript rewriting.
//!
//! Scripts are tokenized losslessly, rule edits are computed on code tokens
//! only and spliced back against the original text. Classic scripts that touch
//! a shadowed global are wrapped in a block declaring local bindings for those
//! globals; ES modules get an import header for the same names instead.

mod rules;
mod scanner;

pub use scanner::{Scanner, Token, TokenKind, tokenize};

use crate::url_rewriting::ArticleUrlRewriter;
use crate::utils::{GLOBAL_OVERRIDES, MODULE_DECL_PATH};

use rules::{CodeView, RuleSet, apply_edits};

const WRAPPER_START: &str = "var _____WB$wombat$assign$function_____ = ";

/// How a script should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptKind {
    /// Module if the source contains `import`/`export` statements.
    #[default]
    Detect,
    Classic,
    Module,
}

/// Rewrites scripts belonging to one package item.
#[derive(Debug, Clone, Copy)]
pub struct JsRewriter<'a> {
    url_rewriter: ArticleUrlRewriter<'a>,
}

impl<'a> JsRewriter<'a> {
    pub fn new(url_rewriter: ArticleUrlRewriter<'a>) -> Self {
        Self { url_rewriter }
    }

    /// Rewrite a script, detecting whether it is an ES module.
    pub fn rewrite(&self, text: &str) -> String {
        self.rewrite_as(text, ScriptKind::Detect)
    }

    pub fn rewrite_as(&self, text: &str, kind: ScriptKind) -> String {
        if text.starts_with(WRAPPER_START) || text.starts_with(&module_header_prefix()) {
            return text.to_string();
        }

        let tokens = tokenize(text);
        let view = CodeView::new(text, &tokens);
        let is_module = match kind {
            ScriptKind::Detect => view.has_module_syntax(),
            ScriptKind::Classic => false,
            ScriptKind::Module => true,
        };

        let edits = RuleSet::new(&view, &self.url_rewriter, is_module).collect();
        let body = apply_edits(text, edits);

        if is_module {
            let decl = self.url_rewriter.from_normalized(MODULE_DECL_PATH);
            format!("{}\"{decl}\";\n{body}", module_header_prefix())
        } else if view.has_bare_global() {
            wrap_classic(&body)
        } else {
            body
        }
    }
}

fn module_header_prefix() -> String {
    format!("import {{ {} }} from ", GLOBAL_OVERRIDES.join(", "))
}

fn wrap_classic(body: &str) -> String {
    let mut out = String::with_capacity(body.len() + 1024);
    out.push_str(WRAPPER_START);
    out.push_str(
        "function(name) {return (self._wb_wombat && self._wb_wombat.local_init && \
         self._wb_wombat.local_init(name)) || self[name]; };\n",
    );
    out.push_str(
        "if (!self.__WB_pmw) { self.__WB_pmw = function(obj) { this.__WB_source = obj; \
         return this; } }\n",
    );
    out.push_str("{\n");
    for name in GLOBAL_OVERRIDES {
        out.push_str(&format!(
            "let {name} = _____WB$wombat$assign$function_____(\"{name}\");\n"
        ));
    }
    out.push_str("let arguments;\n\n");
    out.push_str(body);
    out.push_str("\n}");
    out
}
