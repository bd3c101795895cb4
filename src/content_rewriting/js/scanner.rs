//! Lossless JavaScript tokenizer.
//!
//! Produces a flat token stream whose spans cover every byte of the input, so
//! the rewriter can splice edits against original offsets. It knows just
//! enough of the grammar to find where strings, templates, comments and
//! regular-expression literals begin and end.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    /// `'...'` or `"..."`, possibly unterminated at end of line.
    Str,
    /// Backtick template, including any `${...}` substitutions.
    Template,
    Regex,
    Ident,
    Number,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        &src[self.start..self.end]
    }

    /// Whitespace and comments.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }
}

/// Multi-character punctuators, longest first for maximal munch.
const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>",
];

/// Keywords after which a `/` starts a regular expression rather than a division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

pub struct Scanner<'s> {
    src: &'s str,
    bytes: &'s [u8],
    pos: usize,
    last_significant: Option<(TokenKind, &'s str)>,
}

impl<'s> Scanner<'s> {
    pub fn new(src: &'s str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            last_significant: None,
        }
    }

    fn peek_char(&self, at: usize) -> Option<char> {
        self.src.get(at..).and_then(|rest| rest.chars().next())
    }

    fn regex_allowed(&self) -> bool {
        match self.last_significant {
            None => true,
            Some((TokenKind::Punct, text)) => !matches!(text, ")" | "]" | "++" | "--"),
            Some((TokenKind::Ident, text)) => REGEX_PRECEDING_KEYWORDS.contains(&text),
            Some(_) => false,
        }
    }

    fn scan_whitespace(&self, start: usize) -> usize {
        let mut end = start;
        while let Some(c) = self.peek_char(end) {
            if !c.is_whitespace() {
                break;
            }
            end += c.len_utf8();
        }
        end
    }

    fn scan_ident(&self, start: usize) -> usize {
        let mut end = start;
        while let Some(c) = self.peek_char(end) {
            if !is_ident_part(c) {
                break;
            }
            end += c.len_utf8();
        }
        end
    }

    fn scan_number(&self, start: usize) -> usize {
        let mut end = start + 1;
        while end < self.bytes.len()
            && (self.bytes[end].is_ascii_alphanumeric() || matches!(self.bytes[end], b'.' | b'_'))
        {
            end += 1;
        }
        end
    }

    fn scan_punct(&self, start: usize) -> usize {
        let rest = &self.src[start..];
        for p in PUNCTUATORS {
            if rest.starts_with(p) {
                // `a?.5:b` is a conditional, not optional chaining.
                if *p == "?." && rest.as_bytes().get(2).is_some_and(u8::is_ascii_digit) {
                    continue;
                }
                return start + p.len();
            }
        }
        start + self.peek_char(start).map_or(1, char::len_utf8)
    }

    fn scan_regex(&self, start: usize) -> Option<usize> {
        let mut i = start + 1;
        let mut in_class = false;
        loop {
            match *self.bytes.get(i)? {
                b'\n' | b'\r' => return None,
                b'\\' => {
                    let escaped = self.peek_char(i + 1)?;
                    if escaped == '\n' || escaped == '\r' {
                        return None;
                    }
                    i += 1 + escaped.len_utf8();
                }
                b'[' => {
                    in_class = true;
                    i += 1;
                }
                b']' => {
                    in_class = false;
                    i += 1;
                }
                b'/' if !in_class => {
                    i += 1;
                    while i < self.bytes.len() && self.bytes[i].is_ascii_alphanumeric() {
                        i += 1;
                    }
                    return Some(i);
                }
                _ => i += 1,
            }
        }
    }
}

impl<'s> Iterator for Scanner<'s> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let start = self.pos;
        let c = self.peek_char(start)?;
        let (kind, end) = match c {
            c if c.is_whitespace() => (TokenKind::Whitespace, self.scan_whitespace(start)),
            '/' => match self.bytes.get(start + 1) {
                Some(b'/') => (TokenKind::LineComment, line_end(self.bytes, start)),
                Some(b'*') => (TokenKind::BlockComment, block_comment_end(self.bytes, start)),
                _ => match self.regex_allowed().then(|| self.scan_regex(start)).flatten() {
                    Some(end) => (TokenKind::Regex, end),
                    None => (TokenKind::Punct, self.scan_punct(start)),
                },
            },
            '\'' | '"' => (TokenKind::Str, string_end(self.bytes, start)),
            '`' => (TokenKind::Template, template_end(self.bytes, start)),
            '0'..='9' => (TokenKind::Number, self.scan_number(start)),
            '.' if self.bytes.get(start + 1).is_some_and(u8::is_ascii_digit) => {
                (TokenKind::Number, self.scan_number(start))
            }
            c if is_ident_start(c) => (TokenKind::Ident, self.scan_ident(start)),
            _ => (TokenKind::Punct, self.scan_punct(start)),
        };

        self.pos = end;
        let token = Token { kind, start, end };
        if !token.is_trivia() {
            let src = self.src;
            self.last_significant = Some((kind, &src[start..end]));
        }
        Some(token)
    }
}

/// Tokenize the whole source.
pub fn tokenize(src: &str) -> Vec<Token> {
    Scanner::new(src).collect()
}

fn is_ident_start(c: char) -> bool {
    c == '$' || c == '_' || c == '\\' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric() || c == '\u{200c}' || c == '\u{200d}'
}

fn line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| start + offset)
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |offset| start + 2 + offset + 2)
}

/// Skip a backslash escape at `i`, returning the index after the escaped character.
fn skip_escape(bytes: &[u8], i: usize) -> usize {
    match bytes.get(i + 1) {
        None => bytes.len(),
        Some(b'\r') if bytes.get(i + 2) == Some(&b'\n') => i + 3,
        Some(&b) => i + 1 + utf8_width(b),
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        _ => 4,
    }
}

/// End of a quoted string; an unterminated string stops before the newline.
fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(bytes, i),
            b'\n' => return i,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn template_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i = skip_escape(bytes, i),
            b'`' => return i + 1,
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = substitution_end(bytes, i + 2),
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of a `${ ... }` substitution whose body starts at `i`.
fn substitution_end(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return i;
                }
            }
            b'\'' | b'"' => i = string_end(bytes, i),
            b'`' => i = template_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'/') => i = line_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = block_comment_end(bytes, i),
            _ => i += 1,
        }
    }
    bytes.len()
}
