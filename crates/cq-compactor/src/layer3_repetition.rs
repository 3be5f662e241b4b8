//! Layer 3: Repetition compression: repeated statements → macro symbols.
//!
//! Three recognizers run over the token stream: call statements
//! (`a.b(x);`), assignment statements (`a[i]+=x;`) and innermost brace
//! blocks (`{...}`). Matches are grouped by their normalized shape, where
//! identifiers, numbers, strings and chars collapse into class placeholders.

use std::collections::{HashMap, HashSet};

use cq_core::{PatternKind, SirclConfig};
use serde::Serialize;
use tracing::debug;

use crate::estimate::cost;
use crate::layer1_minify::is_ident_char;
use crate::legend::{is_verbatim, macro_line};
use crate::lexer::{self, TokenKind, TokenStream, CONTROL_FLOW, RESERVED};

/// Leading character of every macro symbol.
pub const MACRO_PREFIX: char = 'μ';

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>="];
const STATEMENT_BOUNDARIES: &[&str] = &[";", "{", "}", ")", ":"];

/// `μA`..`μZ`, then `μAA`, `μAB`, ...
pub fn macro_symbol(n: usize) -> String {
    let mut letters = Vec::new();
    let mut k = n + 1;
    while k > 0 {
        k -= 1;
        letters.push((b'A' + (k % 26) as u8) as char);
        k /= 26;
    }
    letters.reverse();
    let mut symbol = String::from(MACRO_PREFIX);
    symbol.extend(letters);
    symbol
}

/// A group of same-shaped statements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub normalized_form: String,
    /// Most common literal text within the group.
    pub template: String,
    /// Byte offsets of every group member.
    pub occurrences: Vec<usize>,
}

impl Pattern {
    /// Ranking proxy for profitability.
    pub fn score(&self) -> usize {
        self.template.chars().count().saturating_sub(2) * self.occurrences.len()
    }
}

/// One accepted macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroEntry {
    pub symbol: String,
    pub template: String,
    pub kind: PatternKind,
    pub occurrences: usize,
    pub net_savings: i64,
}

#[derive(Debug, Clone)]
pub struct RepetitionEncoding {
    pub text: String,
    /// Accepted macros in acceptance order.
    pub macros: Vec<MacroEntry>,
}

#[derive(Debug, Clone)]
pub struct RepetitionCompressor {
    min_occurrences: usize,
    min_pattern_length: usize,
    max_macros: usize,
    counter: usize,
    /// symbol → template
    templates: HashMap<String, String>,
    /// normalized shape → symbol
    shapes: HashMap<String, String>,
}

impl RepetitionCompressor {
    pub fn new(config: &SirclConfig) -> Self {
        Self {
            min_occurrences: config.macro_min_occurrences,
            min_pattern_length: config.min_pattern_length,
            max_macros: config.max_macros,
            counter: 0,
            templates: HashMap::new(),
            shapes: HashMap::new(),
        }
    }

    pub fn templates(&self) -> &HashMap<String, String> {
        &self.templates
    }

    /// Repeated statement shapes in `text`, best candidates first.
    pub fn detect(&self, text: &str) -> Vec<Pattern> {
        let stream = TokenStream::lex(text);
        let mut groups: HashMap<String, (PatternKind, Vec<(usize, &str)>)> = HashMap::new();

        for (kind, first, last) in recognize_statements(&stream) {
            let start = stream.span(first).0;
            let end = stream.span(last).1;
            groups
                .entry(normalize(&stream, first, last))
                .or_insert_with(|| (kind, Vec::new()))
                .1
                .push((start, &text[start..end]));
        }

        let mut patterns: Vec<Pattern> = groups
            .into_iter()
            .filter(|(_, (_, members))| members.len() >= self.min_occurrences)
            .map(|(normalized_form, (kind, members))| Pattern {
                kind,
                normalized_form,
                template: most_common_literal(&members).to_string(),
                occurrences: members.iter().map(|(pos, _)| *pos).collect(),
            })
            .filter(|p| p.template.chars().count() >= self.min_pattern_length)
            .collect();

        patterns.sort_by(|a, b| {
            b.score()
                .cmp(&a.score())
                .then_with(|| a.occurrences[0].cmp(&b.occurrences[0]))
        });
        patterns
    }

    /// Replace profitable repeated statements with macro symbols.
    pub fn compress(&mut self, text: &str) -> RepetitionEncoding {
        let patterns = self.detect(text);
        let mut taken = lexer::words(text);
        let mut result = text.to_string();
        let mut macros = Vec::new();

        for pattern in patterns {
            if self.templates.len() >= self.max_macros {
                break;
            }
            if !is_verbatim(&pattern.template)
                || self.shapes.contains_key(&pattern.normalized_form)
            {
                continue;
            }
            let occurrences = find_occurrences(&result, &pattern.template);
            if occurrences.len() < self.min_occurrences {
                continue;
            }

            let (symbol, next_counter) = self.next_symbol(&taken);
            let n = occurrences.len() as i64;
            let legend_cost = cost(&macro_line(&symbol, &pattern.template));
            let net = cost(&pattern.template) * n - cost(&symbol) * n - legend_cost;
            if net <= 0 {
                debug!(template = %pattern.template, net, "macro not profitable");
                continue;
            }

            self.counter = next_counter;
            taken.insert(symbol.clone());
            self.templates.insert(symbol.clone(), pattern.template.clone());
            self.shapes.insert(pattern.normalized_form.clone(), symbol.clone());
            result = replace_occurrences(&result, &occurrences, pattern.template.len(), &symbol);
            macros.push(MacroEntry {
                symbol,
                template: pattern.template,
                kind: pattern.kind,
                occurrences: occurrences.len(),
                net_savings: net,
            });
        }

        debug!(macros = macros.len(), "repetition compression");
        RepetitionEncoding { text: result, macros }
    }

    fn next_symbol(&self, taken: &HashSet<String>) -> (String, usize) {
        let mut n = self.counter;
        loop {
            let symbol = macro_symbol(n);
            if !taken.contains(&symbol) && !self.templates.contains_key(&symbol) {
                return (symbol, n + 1);
            }
            n += 1;
        }
    }
}

fn most_common_literal<'t>(members: &[(usize, &'t str)]) -> &'t str {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (order, &(_, literal)) in members.iter().enumerate() {
        counts.entry(literal).or_insert((0, order)).0 += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)))
        .map_or("", |(literal, _)| literal)
}

/// Token classes collapsed into placeholders, one space between tokens.
pub fn normalize(stream: &TokenStream<'_>, first: usize, last: usize) -> String {
    (first..=last)
        .filter(|&i| stream.kind(i) != TokenKind::Space)
        .map(|i| match stream.kind(i) {
            TokenKind::Ident => "VAR",
            TokenKind::Number => "NUM",
            TokenKind::Str => "STR",
            TokenKind::Char => "CHAR",
            _ => stream.text(i),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every recognized statement as `(kind, first token, last token)`.
pub fn recognize_statements(stream: &TokenStream<'_>) -> Vec<(PatternKind, usize, usize)> {
    let mut found = Vec::new();
    for i in 0..stream.len() {
        match stream.kind(i) {
            TokenKind::Ident if starts_statement(stream, i) && !is_keyword(stream.text(i)) => {
                if let Some(end) = recognize_call(stream, i) {
                    found.push((PatternKind::FunctionCall, i, end));
                } else if let Some(end) = recognize_assignment(stream, i) {
                    found.push((PatternKind::Assignment, i, end));
                }
            }
            TokenKind::Punct if stream.is_punct(i, "{") => {
                if let Some(end) = recognize_block(stream, i) {
                    found.push((PatternKind::StructInit, i, end));
                }
            }
            _ => {}
        }
    }
    found
}

fn is_keyword(word: &str) -> bool {
    RESERVED.contains(&word) || CONTROL_FLOW.contains(&word)
}

fn starts_statement(stream: &TokenStream<'_>, i: usize) -> bool {
    match stream.prev_significant(i) {
        None => true,
        Some(p) => match stream.kind(p) {
            TokenKind::Preproc => true,
            TokenKind::Punct => STATEMENT_BOUNDARIES.contains(&stream.text(p)),
            TokenKind::Ident => matches!(stream.text(p), "else" | "do"),
            _ => false,
        },
    }
}

/// Skip `.name`, `->name` and `[...]` suffixes after the identifier at `i`.
fn postfix_chain(stream: &TokenStream<'_>, i: usize, allow_index: bool) -> Option<usize> {
    let mut k = i;
    loop {
        let Some(next) = stream.next_significant(k) else {
            return Some(k);
        };
        if stream.is_punct(next, ".") || stream.is_punct(next, "->") {
            let member = stream.next_significant(next)?;
            if stream.kind(member) != TokenKind::Ident {
                return None;
            }
            k = member;
        } else if allow_index && stream.is_punct(next, "[") {
            k = stream.find_close(next, "[", "]", &[";", "{", "}"])?;
        } else {
            return Some(k);
        }
    }
}

/// `name(...);`
fn recognize_call(stream: &TokenStream<'_>, i: usize) -> Option<usize> {
    let callee = postfix_chain(stream, i, false)?;
    let open = stream.next_significant(callee)?;
    if !stream.is_punct(open, "(") {
        return None;
    }
    let close = stream.find_close(open, "(", ")", &[";", "{", "}"])?;
    let semi = stream.next_significant(close)?;
    stream.is_punct(semi, ";").then_some(semi)
}

/// `lvalue op= expr;`
fn recognize_assignment(stream: &TokenStream<'_>, i: usize) -> Option<usize> {
    let target = postfix_chain(stream, i, true)?;
    let op = stream.next_significant(target)?;
    if stream.kind(op) != TokenKind::Punct || !ASSIGN_OPS.contains(&stream.text(op)) {
        return None;
    }
    let mut depth = 0usize;
    let mut k = op;
    loop {
        k = stream.next_significant(k)?;
        match stream.kind(k) {
            TokenKind::Preproc => return None,
            TokenKind::Punct => match stream.text(k) {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.checked_sub(1)?,
                ";" if depth == 0 => return Some(k),
                _ => {}
            },
            _ => {}
        }
    }
}

/// Innermost non-empty `{...}`.
fn recognize_block(stream: &TokenStream<'_>, open: usize) -> Option<usize> {
    let first = stream.next_significant(open)?;
    if stream.is_punct(first, "}") {
        return None;
    }
    let mut k = open;
    loop {
        k = stream.next_significant(k)?;
        match stream.kind(k) {
            TokenKind::Preproc => return None,
            TokenKind::Punct if stream.is_punct(k, "{") => return None,
            TokenKind::Punct if stream.is_punct(k, "}") => return Some(k),
            _ => {}
        }
    }
}

/// Non-overlapping offsets of `template` in `text` that begin and end on
/// code token boundaries, so literals and directives are never touched.
pub fn find_occurrences(text: &str, template: &str) -> Vec<usize> {
    if template.is_empty() {
        return Vec::new();
    }
    let stream = TokenStream::lex(text);
    let code_tokens = || {
        stream
            .tokens()
            .iter()
            .filter(|t| !matches!(t.kind, TokenKind::Str | TokenKind::Char | TokenKind::Preproc))
    };
    let starts: HashSet<usize> = code_tokens().map(|t| t.start).collect();
    let ends: HashSet<usize> = code_tokens().map(|t| t.end).collect();

    text.match_indices(template)
        .map(|(pos, _)| pos)
        .filter(|pos| starts.contains(pos) && ends.contains(&(pos + template.len())))
        .collect()
}

/// Replace `len`-byte spans at `offsets` with `symbol`, back to front. A
/// space keeps the symbol from fusing with an adjacent word character.
pub fn replace_occurrences(text: &str, offsets: &[usize], len: usize, symbol: &str) -> String {
    let mut result = text.to_string();
    for &start in offsets.iter().rev() {
        let end = start + len;
        let mut replacement = String::with_capacity(symbol.len() + 2);
        if result[..start].chars().next_back().is_some_and(is_ident_char) {
            replacement.push(' ');
        }
        replacement.push_str(symbol);
        if result[end..].chars().next().is_some_and(is_ident_char) {
            replacement.push(' ');
        }
        result.replace_range(start..end, &replacement);
    }
    result
}
