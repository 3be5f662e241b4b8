//! Typed token stream over minified text, and the identifier extractor.
//!
//! Context rules ("is this a struct name being declared", "does a statement
//! start here") are answered by looking at neighboring significant tokens
//! instead of re-scanning raw substrings.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use cq_core::IdentifierKind;
use regex::Regex;

use crate::layer1_minify::{is_ident_char, match_operator};

/// C reserved words that are never identifier candidates.
pub const RESERVED: &[&str] = &[
    "auto", "char", "const", "double", "enum", "extern", "float", "inline", "int",
    "long", "register", "restrict", "short", "signed", "sizeof", "static", "struct",
    "typedef", "union", "unsigned", "void", "volatile", "_Bool", "_Complex",
    "_Imaginary", "_Alignas", "_Alignof", "_Atomic", "_Generic", "_Noreturn",
    "_Static_assert", "_Thread_local",
];

/// Control-flow keywords, preserved when `preserve_control_flow` is set.
pub const CONTROL_FLOW: &[&str] = &[
    "if", "else", "for", "while", "do", "switch", "case", "default",
    "break", "continue", "return", "goto",
];

const AGGREGATES: &[&str] = &["struct", "enum", "union"];

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Char,
    Punct,
    Preproc,
    Space,
    Other,
}

/// A token with its byte span in the lexed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// One identifier occurrence in minified text. Not deduplicated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierOccurrence {
    pub name: String,
    pub kind: IdentifierKind,
    pub position: usize,
    pub length: usize,
    /// Index into the token stream it was extracted from.
    pub token: usize,
}

pub struct TokenStream<'a> {
    text: &'a str,
    tokens: Vec<Token>,
}

impl<'a> TokenStream<'a> {
    pub fn lex(text: &'a str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut offsets: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
        offsets.push(text.len());

        let n = chars.len();
        let mut tokens = Vec::new();
        let mut line_start = true;
        let mut i = 0;

        while i < n {
            let c = chars[i];
            let begin = i;
            let kind = if line_start && c == '#' {
                i += 1;
                while i < n {
                    let ch = chars[i];
                    i += 1;
                    if ch == '\\' {
                        i = (i + 1).min(n);
                    } else if ch == '\n' {
                        break;
                    }
                }
                TokenKind::Preproc
            } else if c.is_whitespace() {
                while i < n && chars[i].is_whitespace() {
                    i += 1;
                }
                TokenKind::Space
            } else if c == '"' || c == '\'' {
                i += 1;
                while i < n {
                    let ch = chars[i];
                    i += 1;
                    if ch == '\\' {
                        i = (i + 1).min(n);
                    } else if ch == c {
                        break;
                    }
                }
                if c == '"' { TokenKind::Str } else { TokenKind::Char }
            } else if c.is_alphabetic() || c == '_' {
                while i < n && is_ident_char(chars[i]) {
                    i += 1;
                }
                TokenKind::Ident
            } else if c.is_ascii_digit()
                || (c == '.' && chars.get(i + 1).is_some_and(|d| d.is_ascii_digit()))
            {
                i += 1;
                while i < n {
                    let ch = chars[i];
                    let exponent_sign = (ch == '+' || ch == '-')
                        && matches!(chars[i - 1], 'e' | 'E' | 'p' | 'P');
                    if is_ident_char(ch) || ch == '.' || exponent_sign {
                        i += 1;
                    } else {
                        break;
                    }
                }
                TokenKind::Number
            } else if let Some(op) = match_operator(&chars, i) {
                i += op.chars().count();
                TokenKind::Punct
            } else {
                i += 1;
                TokenKind::Other
            };

            let token = Token { kind, start: offsets[begin], end: offsets[i] };
            line_start = match kind {
                TokenKind::Preproc => true,
                TokenKind::Space => text[token.start..token.end].contains('\n'),
                _ => false,
            };
            tokens.push(token);
        }

        Self { text, tokens }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn kind(&self, idx: usize) -> TokenKind {
        self.tokens[idx].kind
    }

    pub fn text(&self, idx: usize) -> &'a str {
        let t = self.tokens[idx];
        &self.text[t.start..t.end]
    }

    pub fn span(&self, idx: usize) -> (usize, usize) {
        let t = self.tokens[idx];
        (t.start, t.end)
    }

    pub fn is_punct(&self, idx: usize, p: &str) -> bool {
        self.kind(idx) == TokenKind::Punct && self.text(idx) == p
    }

    pub fn is_word(&self, idx: usize, word: &str) -> bool {
        self.kind(idx) == TokenKind::Ident && self.text(idx) == word
    }

    fn is_word_in(&self, idx: usize, words: &[&str]) -> bool {
        self.kind(idx) == TokenKind::Ident && words.contains(&self.text(idx))
    }

    /// Nearest non-space token before `idx`.
    pub fn prev_significant(&self, idx: usize) -> Option<usize> {
        (0..idx).rev().find(|&k| self.tokens[k].kind != TokenKind::Space)
    }

    /// Nearest non-space token after `idx`.
    pub fn next_significant(&self, idx: usize) -> Option<usize> {
        (idx + 1..self.tokens.len()).find(|&k| self.tokens[k].kind != TokenKind::Space)
    }

    /// The `{` that the `}` at `close` terminates.
    pub fn matching_open(&self, close: usize) -> Option<usize> {
        let mut depth = 0usize;
        for k in (0..=close).rev() {
            if self.is_punct(k, "}") {
                depth += 1;
            } else if self.is_punct(k, "{") {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(k);
                }
            }
        }
        None
    }

    /// The closer balancing `opener` at `open`. Gives up on a preprocessor
    /// line or on any punctuator listed in `stop`.
    pub fn find_close(
        &self,
        open: usize,
        opener: &str,
        closer: &str,
        stop: &[&str],
    ) -> Option<usize> {
        let mut depth = 0usize;
        for k in open..self.tokens.len() {
            match self.kind(k) {
                TokenKind::Preproc => return None,
                TokenKind::Punct => {
                    let p = self.text(k);
                    if p == opener {
                        depth += 1;
                    } else if p == closer {
                        depth = depth.checked_sub(1)?;
                        if depth == 0 {
                            return Some(k);
                        }
                    } else if stop.contains(&p) {
                        return None;
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Whether the identifier at `idx` is a type name being declared:
    /// `struct|enum|union NAME {`, `struct|enum|union NAME ;`, or the trailing
    /// name of `typedef struct|enum|union [Tag] { ... } NAME ;`.
    pub fn is_declared_type_name(&self, idx: usize) -> bool {
        if self.kind(idx) != TokenKind::Ident {
            return false;
        }
        let (Some(prev), Some(next)) = (self.prev_significant(idx), self.next_significant(idx))
        else {
            return false;
        };

        if self.is_word_in(prev, AGGREGATES) {
            return self.is_punct(next, "{") || self.is_punct(next, ";");
        }

        if !(self.is_punct(next, ";") && self.is_punct(prev, "}")) {
            return false;
        }
        let Some(open) = self.matching_open(prev) else {
            return false;
        };
        let mut before = self.prev_significant(open);
        let is_tag = |k: usize| self.kind(k) == TokenKind::Ident && !self.is_word_in(k, AGGREGATES);
        if let Some(tag) = before.filter(|&k| is_tag(k)) {
            before = self.prev_significant(tag);
        }
        match before.filter(|&k| self.is_word_in(k, AGGREGATES)) {
            Some(aggregate) => self
                .prev_significant(aggregate)
                .is_some_and(|k| self.is_word(k, "typedef")),
            None => false,
        }
    }

    fn classify(&self, idx: usize) -> IdentifierKind {
        let next = self.next_significant(idx);
        if next.is_some_and(|k| self.is_punct(k, "(")) {
            return IdentifierKind::Function;
        }
        let after_aggregate = self
            .prev_significant(idx)
            .is_some_and(|k| self.is_word_in(k, AGGREGATES));
        if after_aggregate || self.is_declared_type_name(idx) {
            return IdentifierKind::Type;
        }
        // `Name ident` reads as a declaration with `Name` as its type.
        let declares =
            next.is_some_and(|k| self.kind(k) == TokenKind::Ident && !self.is_word_in(k, RESERVED));
        if declares && !CONTROL_FLOW.contains(&self.text(idx)) {
            return IdentifierKind::Type;
        }
        IdentifierKind::Variable
    }
}

/// Identifier occurrences in token order, reserved words excluded.
pub fn extract_identifiers(stream: &TokenStream<'_>) -> Vec<IdentifierOccurrence> {
    (0..stream.len())
        .filter(|&i| stream.kind(i) == TokenKind::Ident && !RESERVED.contains(&stream.text(i)))
        .map(|i| {
            let (start, end) = stream.span(i);
            IdentifierOccurrence {
                name: stream.text(i).to_string(),
                kind: stream.classify(i),
                position: start,
                length: end - start,
                token: i,
            }
        })
        .collect()
}

/// Occurrence count per identifier name.
pub fn frequency_table(occurrences: &[IdentifierOccurrence]) -> HashMap<&str, usize> {
    let mut table = HashMap::new();
    for occ in occurrences {
        *table.entry(occ.name.as_str()).or_insert(0) += 1;
    }
    table
}

/// Every word-like run in `text`, including inside literals and directives.
pub fn words(text: &str) -> HashSet<String> {
    WORD_RE.find_iter(text).map(|m| m.as_str().to_string()).collect()
}
