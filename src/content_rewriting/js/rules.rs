//! Rewrite rules applied to the code tokens of a script.
//!
//! Rules never look inside strings, templates, comments or regex literals:
//! they only see the significant tokens and the trivia between them.

use crate::url_rewriting::ArticleUrlRewriter;
use crate::utils::GLOBAL_OVERRIDES;

use super::scanner::{Token, TokenKind};

pub(super) const THIS_RW: &str = "_____WB$wombat$check$this$function_____(this)";
pub(super) const CHECK_LOC: &str =
    "((self.__WB_check_loc && self.__WB_check_loc(location, arguments)) || {}).href = ";
pub(super) const EVAL_STR: &str = "WB_wombat_runEval2((_______eval_arg, isGlobal) => { var ge = eval; return isGlobal ? ge(_______eval_arg) : eval(_______eval_arg); }).eval(this, (function() { return arguments })(),";
pub(super) const EVAL_MARKER: &str = "WB_wombat_runEval2";
pub(super) const PMW: &str = ".__WB_pmw(self)";
const IMPORT_HELPER: &str = "____wb_rewrite_import__";

/// A splice against the original source: replace `start..end` with `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    fn replace(token: &Token, text: impl Into<String>) -> Self {
        Self {
            start: token.start,
            end: token.end,
            text: text.into(),
        }
    }

    fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            start: at,
            end: at,
            text: text.into(),
        }
    }
}

/// Significant-token view over a token stream, with the innermost enclosing
/// bracket recorded for each code token.
pub(super) struct CodeView<'s> {
    src: &'s str,
    tokens: &'s [Token],
    code: Vec<usize>,
    enclosing: Vec<Option<u8>>,
}

impl<'s> CodeView<'s> {
    pub fn new(src: &'s str, tokens: &'s [Token]) -> Self {
        let mut code = Vec::new();
        let mut enclosing = Vec::new();
        let mut stack: Vec<u8> = Vec::new();
        for (index, token) in tokens.iter().enumerate() {
            if token.is_trivia() {
                continue;
            }
            code.push(index);
            enclosing.push(stack.last().copied());
            if token.kind == TokenKind::Punct {
                match token.text(src) {
                    "(" => stack.push(b'('),
                    "[" => stack.push(b'['),
                    "{" => stack.push(b'{'),
                    ")" | "]" | "}" => {
                        stack.pop();
                    }
                    _ => {}
                }
            }
        }
        Self {
            src,
            tokens,
            code,
            enclosing,
        }
    }

    fn len(&self) -> usize {
        self.code.len()
    }

    fn token(&self, k: usize) -> &Token {
        &self.tokens[self.code[k]]
    }

    fn text(&self, k: usize) -> &'s str {
        self.tokens[self.code[k]].text(self.src)
    }

    fn kind(&self, k: usize) -> TokenKind {
        self.token(k).kind
    }

    fn prev_text(&self, k: usize) -> Option<&'s str> {
        k.checked_sub(1).map(|p| self.text(p))
    }

    fn prev_text_n(&self, k: usize, n: usize) -> Option<&'s str> {
        k.checked_sub(n).map(|p| self.text(p))
    }

    fn next_text(&self, k: usize) -> Option<&'s str> {
        (k + 1 < self.len()).then(|| self.text(k + 1))
    }

    fn next_kind(&self, k: usize) -> Option<TokenKind> {
        (k + 1 < self.len()).then(|| self.kind(k + 1))
    }

    fn is_punct(&self, k: usize, punct: &str) -> bool {
        self.kind(k) == TokenKind::Punct && self.text(k) == punct
    }

    /// Next code token when nothing (not even whitespace) separates it from `k`.
    fn adjacent_next(&self, k: usize) -> Option<usize> {
        (k + 1 < self.len() && self.code[k + 1] == self.code[k] + 1).then_some(k + 1)
    }

    /// Whether the raw token right before `k` is a member-access dot.
    fn follows_dot_directly(&self, k: usize) -> bool {
        let index = self.code[k];
        index > 0 && {
            let before = &self.tokens[index - 1];
            before.kind == TokenKind::Punct && matches!(before.text(self.src), "." | "?.")
        }
    }

    fn follows_member_dot(&self, k: usize) -> bool {
        matches!(self.prev_text(k), Some("." | "?.")) && self.kind(k - 1) == TokenKind::Punct
    }

    fn is_top_level(&self, k: usize) -> bool {
        self.enclosing[k].is_none()
    }

    fn idents(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&k| self.kind(k) == TokenKind::Ident)
    }

    /// Whether the script uses `import`/`export` statements.
    pub fn has_module_syntax(&self) -> bool {
        self.idents().any(|k| {
            if !self.is_top_level(k) || self.follows_member_dot(k) {
                return false;
            }
            let next = self.next_text(k);
            let next_kind = self.next_kind(k);
            match self.text(k) {
                "import" => {
                    matches!(next, Some("{" | "*"))
                        || matches!(next_kind, Some(TokenKind::Str | TokenKind::Ident))
                }
                "export" => {
                    matches!(next, Some("{" | "*")) || next_kind == Some(TokenKind::Ident)
                }
                _ => false,
            }
        })
    }

    /// Whether any shadowed global is referenced as a bare identifier.
    ///
    /// The `self` references produced by the eval and postMessage rules do not
    /// count, so rewritten output is not wrapped on a second pass.
    pub fn has_bare_global(&self) -> bool {
        self.idents().any(|k| {
            GLOBAL_OVERRIDES.contains(&self.text(k))
                && !self.follows_dot_directly(k)
                && !self.is_inserted_self(k)
        })
    }

    fn is_inserted_self(&self, k: usize) -> bool {
        if self.text(k) != "self" {
            return false;
        }
        let pmw_argument = self.prev_text(k) == Some("(")
            && self.prev_text_n(k, 2) == Some("__WB_pmw")
            && self.next_text(k) == Some(")");
        let eval_alias = self.prev_text(k) == Some("=")
            && self.next_text(k) == Some(".")
            && k + 2 < self.len()
            && self.text(k + 2) == "eval";
        pmw_argument || eval_alias
    }
}

/// Collects the edits for one script.
pub(super) struct RuleSet<'v, 's, 'u> {
    view: &'v CodeView<'s>,
    url_rewriter: &'v ArticleUrlRewriter<'u>,
    is_module: bool,
    rewrite_eval: bool,
}

impl<'v, 's, 'u> RuleSet<'v, 's, 'u> {
    pub fn new(
        view: &'v CodeView<'s>,
        url_rewriter: &'v ArticleUrlRewriter<'u>,
        is_module: bool,
    ) -> Self {
        Self {
            view,
            url_rewriter,
            is_module,
            rewrite_eval: !view.src.contains(EVAL_MARKER),
        }
    }

    pub fn collect(&self) -> Vec<Edit> {
        let view = self.view;
        let mut edits = Vec::new();
        for k in view.idents() {
            let edit = match view.text(k) {
                "this" => self.rewrite_this(k),
                "location" => self.rewrite_location_assignment(k),
                "eval" if self.rewrite_eval => self.rewrite_eval(k),
                "postMessage" => self.rewrite_post_message(k),
                "import" => self.rewrite_import(k),
                "from" if self.is_module => self.rewrite_from(k),
                _ => None,
            };
            edits.extend(edit);
        }
        edits
    }

    fn rewrite_this(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if view.follows_member_dot(k) {
            return None;
        }
        let token = view.token(k);

        // `this.<global>`: needs at least one character before `this`.
        let global_access = token.start > 0
            && view
                .adjacent_next(k)
                .filter(|&dot| view.is_punct(dot, "."))
                .and_then(|dot| view.adjacent_next(dot))
                .is_some_and(|name| {
                    view.kind(name) == TokenKind::Ident
                        && GLOBAL_OVERRIDES.contains(&view.text(name))
                });

        let value_position = match view.prev_text(k) {
            Some("=" | "," | "||" | "&&" | "return") => true,
            // `}(this)` and `})(this)` immediately invoked functions.
            Some("(") => match view.prev_text_n(k, 2) {
                Some("}") => true,
                Some(")") => view.prev_text_n(k, 3) == Some("}"),
                _ => false,
            },
            _ => false,
        };
        let used_as_value = value_position
            && !matches!(view.next_text(k), Some("." | "?." | ":"))
            && view.next_kind(k) != Some(TokenKind::Ident);

        (global_access || used_as_value).then(|| Edit::replace(token, THIS_RW))
    }

    fn rewrite_location_assignment(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if view.follows_member_dot(k) || matches!(view.prev_text(k), Some("var" | "let" | "const")) {
            return None;
        }
        // Inside call arguments (`func(location = 0)`) the name is left alone.
        if view.enclosing[k] == Some(b'(') {
            return None;
        }
        let eq = k + 1;
        if eq >= view.len() || !view.is_punct(eq, "=") {
            return None;
        }
        let rhs = eq + 1;
        if rhs >= view.len() || view.kind(rhs) == TokenKind::Number {
            return None;
        }
        if view.src[view.token(rhs).start..].starts_with(CHECK_LOC) {
            return None;
        }

        // Insert after `=` and the whitespace that follows it.
        let mut at = view.token(eq).end;
        let mut index = view.code[eq] + 1;
        while let Some(token) = view.tokens.get(index) {
            if token.kind != TokenKind::Whitespace {
                break;
            }
            at = token.end;
            index += 1;
        }
        Some(Edit::insert(at, CHECK_LOC))
    }

    fn rewrite_eval(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if view.follows_member_dot(k) {
            return None;
        }
        let token = view.token(k);
        let preceded_by_space = view.src[..token.start]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);

        if let Some(paren) = view.adjacent_next(k).filter(|&p| view.is_punct(p, "(")) {
            return preceded_by_space.then(|| Edit {
                start: token.start,
                end: view.token(paren).end,
                text: EVAL_STR.to_string(),
            });
        }

        let assigned = view.prev_text(k) == Some("=") && view.is_punct(k - 1, "=");
        let used_as_value = !matches!(view.next_text(k), Some("(" | ":" | "."));
        (assigned && used_as_value).then(|| Edit::replace(token, "self.eval"))
    }

    fn rewrite_post_message(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if !view.follows_dot_directly(k) || !view.is_punct(k - 1, ".") {
            return None;
        }
        view.adjacent_next(k).filter(|&p| view.is_punct(p, "("))?;
        let dot = view.token(k - 1);
        if view.src[..dot.start].ends_with(PMW) {
            return None;
        }
        Some(Edit::insert(dot.start, PMW))
    }

    fn rewrite_import(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if view.follows_member_dot(k) {
            return None;
        }
        let next = k + 1;
        if next >= view.len() {
            return None;
        }
        if view.is_punct(next, "(") {
            // `async import(val) { ... }` is a method definition.
            if view.prev_text(k) == Some("async") {
                return None;
            }
            let base = if self.is_module { "import.meta.url" } else { "\"\"" };
            return Some(Edit {
                start: view.token(k).start,
                end: view.token(next).end,
                text: format!("{IMPORT_HELPER}({base}, "),
            });
        }
        if self.is_module {
            return self.rewrite_specifier(next);
        }
        None
    }

    /// Rewrite the module specifier string at code index `k`, if any.
    /// `import x from`, `import {..} from`, `export * from`: the keyword follows
    /// a binding, a closing brace or a star.
    fn rewrite_from(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if view.follows_member_dot(k) {
            return None;
        }
        match view.prev_text(k) {
            Some("}" | "*") => {}
            Some(_) if view.kind(k - 1) == TokenKind::Ident => {}
            _ => return None,
        }
        self.rewrite_specifier(k + 1)
    }

    fn rewrite_specifier(&self, k: usize) -> Option<Edit> {
        let view = self.view;
        if k >= view.len() || view.kind(k) != TokenKind::Str {
            return None;
        }
        let raw = view.text(k);
        let quote = raw.chars().next()?;
        if raw.len() < 2 || !raw.ends_with(quote) {
            return None;
        }
        let specifier = &raw[1..raw.len() - 1];
        let is_url = specifier.starts_with('.')
            || specifier.starts_with('/')
            || specifier.starts_with("http://")
            || specifier.starts_with("https://");
        if !is_url {
            return None;
        }
        let rewritten = self.url_rewriter.rewrite(specifier)?;
        (rewritten != specifier)
            .then(|| Edit::replace(view.token(k), format!("{quote}{rewritten}{quote}")))
    }
}

/// Splice edits into `src`. Overlapping edits after the first are dropped.
pub(super) fn apply_edits(src: &str, mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));
    let extra: usize = edits.iter().map(|e| e.text.len()).sum();
    let mut out = String::with_capacity(src.len() + extra);
    let mut cursor = 0;
    for edit in edits {
        if edit.start < cursor {
            log::debug!("Dropping overlapping script edit at {}", edit.start);
            continue;
        }
        out.push_str(&src[cursor..edit.start]);
        out.push_str(&edit.text);
        cursor = edit.end;
    }
    out.push_str(&src[cursor..]);
    out
}
