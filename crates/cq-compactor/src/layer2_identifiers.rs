//! Layer 2: Semantic identifier encoding: long or frequent names → compact symbols.
//!
//! Candidates are names seen at least twice that no preservation rule
//! protects. Each one is priced against the legend entry it would add and
//! promoted only when the net saving clears `min_net_savings`.

use std::collections::{HashMap, HashSet};

use cq_core::{IdentifierKind, SirclConfig};
use serde::Serialize;
use tracing::debug;

use crate::estimate::cost;
use crate::legend::{identifier_entry, ENTRY_SEPARATOR, IDENTIFIERS_PREAMBLE};
use crate::lexer::{self, IdentifierOccurrence, TokenKind, TokenStream, CONTROL_FLOW};
use crate::symbols::{Proposal, SymbolAllocation, SymbolContext};

const MAX_PRESERVED_LEN: usize = 3;

/// Common verbs, status words and memory primitives a model reads better verbatim.
const SEMANTIC_PRESERVE: &[&str] = &[
    // verbs
    "get", "set", "init", "create", "destroy", "update", "read", "write", "open",
    "close", "parse", "load", "save", "reset", "clear", "start", "stop", "find",
    "insert", "remove", "push", "pop", "append", "print", "printf", "fprintf",
    "sprintf", "snprintf", "main",
    // status
    "error", "errno", "success", "fail", "failed", "failure", "status", "result",
    "valid", "invalid", "true", "false", "null", "ok",
    // memory
    "malloc", "calloc", "realloc", "free", "memcpy", "memmove", "memset", "memcmp",
    "strlen", "strcpy", "strncpy", "strcmp", "strncmp", "alloc", "dealloc",
];

/// Segments that make a poor hint on their own.
const HINT_STOPWORDS: &[&str] = &[
    "a", "an", "the", "of", "to", "in", "on", "at", "by", "for", "and", "or",
    "is", "has", "do", "get", "set", "ptr", "tmp", "ref", "t", "s", "p", "h", "c",
];

/// One promoted identifier rewrite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierEntry {
    pub symbol: String,
    pub original: String,
    /// Shown in the legend for wide-symbol entries only.
    pub hint: Option<String>,
    pub kind: IdentifierKind,
    pub wide: bool,
    pub frequency: usize,
    pub net_savings: i64,
}

impl IdentifierEntry {
    pub fn legend_hint(&self) -> Option<&str> {
        self.hint.as_deref().filter(|_| self.wide)
    }
}

#[derive(Debug, Clone)]
pub struct IdentifierEncoding {
    pub text: String,
    /// Promoted rewrites, highest net savings first.
    pub entries: Vec<IdentifierEntry>,
    pub candidates: usize,
}

/// Whether `name` is never rewritten, regardless of its position.
pub fn is_preserved(name: &str, config: &SirclConfig) -> bool {
    if name.chars().count() <= MAX_PRESERVED_LEN || lexer::RESERVED.contains(&name) {
        return true;
    }
    if config.preserve_control_flow && CONTROL_FLOW.contains(&name) {
        return true;
    }
    config.preserve_verbs && SEMANTIC_PRESERVE.contains(&name.to_ascii_lowercase().as_str())
}

/// Last meaningful `_`/`-` segment of `name`, when it says less than the
/// full name does.
pub fn semantic_hint(name: &str) -> Option<String> {
    let segments: Vec<&str> = name.split(['_', '-']).filter(|s| !s.is_empty()).collect();
    segments
        .into_iter()
        .rev()
        .find(|s| !HINT_STOPWORDS.contains(&s.to_ascii_lowercase().as_str()))
        .filter(|s| *s != name)
        .map(str::to_string)
}

/// Most frequent kind per name; ties go to Function, then Type.
fn dominant_kinds<'o>(occurrences: &'o [IdentifierOccurrence]) -> HashMap<&'o str, IdentifierKind> {
    let mut votes: HashMap<&str, [usize; 3]> = HashMap::new();
    for occ in occurrences {
        votes.entry(occ.name.as_str()).or_default()[occ.kind.index()] += 1;
    }
    votes
        .into_iter()
        .map(|(name, v)| {
            let kind = [IdentifierKind::Variable, IdentifierKind::Type, IdentifierKind::Function]
                .into_iter()
                .enumerate()
                .max_by_key(|(priority, k)| (v[k.index()], *priority))
                .map_or(IdentifierKind::Variable, |(_, k)| k);
            (name, kind)
        })
        .collect()
}

enum Pick {
    Reused(SymbolAllocation),
    Fresh(Proposal, Option<String>),
}

/// Encode identifiers of minified `text`, allocating from `ctx`.
pub fn encode(text: &str, config: &SirclConfig, ctx: &mut SymbolContext) -> IdentifierEncoding {
    let stream = TokenStream::lex(text);
    let occurrences = lexer::extract_identifiers(&stream);
    let frequencies = lexer::frequency_table(&occurrences);
    let kinds = dominant_kinds(&occurrences);
    let declared: HashSet<&str> = occurrences
        .iter()
        .filter(|o| stream.is_declared_type_name(o.token))
        .map(|o| o.name.as_str())
        .collect();
    let native = lexer::words(text);

    let mut candidates: Vec<(&str, usize, i64)> = frequencies
        .iter()
        .filter(|&(name, &freq)| {
            freq >= 2 && !declared.contains(*name) && !is_preserved(name, config)
        })
        .map(|(name, &freq)| (*name, freq, cost(name)))
        .collect();
    candidates.sort_by(|a, b| {
        (b.2 * b.1 as i64)
            .cmp(&(a.2 * a.1 as i64))
            .then_with(|| a.0.cmp(b.0))
    });
    let candidate_count = candidates.len();

    let mut legend = IDENTIFIERS_PREAMBLE.to_string();
    let mut entries: Vec<IdentifierEntry> = Vec::new();

    for (name, freq, raw_cost) in candidates {
        let kind = kinds.get(name).copied().unwrap_or(IdentifierKind::Variable);
        let pick = match ctx.get(name) {
            Some(existing) if native.contains(&existing.symbol) => {
                debug!(
                    name,
                    symbol = %existing.symbol,
                    "stable symbol collides with a native word, skipping"
                );
                continue;
            }
            Some(existing) => Pick::Reused(existing.clone()),
            None => {
                let want_wide = config.hybrid_encoding
                    && name.chars().count() >= config.min_length_for_unicode
                    && raw_cost >= 2
                    && freq >= config.min_frequency;
                Pick::Fresh(ctx.propose(kind, want_wide, &native), semantic_hint(name))
            }
        };
        let (symbol, wide, hint) = match &pick {
            Pick::Reused(a) => (a.symbol.clone(), a.uses_wide_symbol_set, a.semantic_hint.clone()),
            Pick::Fresh(p, hint) => (p.symbol.clone(), p.wide, hint.clone()),
        };

        let entry_text = identifier_entry(&symbol, name, hint.as_deref().filter(|_| wide));
        let separator = if entries.is_empty() { "" } else { ENTRY_SEPARATOR };
        let extended = format!("{legend}{separator}{entry_text}");
        let legend_cost = cost(&extended) - cost(&legend);
        let net = (raw_cost - cost(&symbol)) * freq as i64 - legend_cost;
        if net < config.min_net_savings {
            continue;
        }

        if let Pick::Fresh(proposal, hint) = pick {
            ctx.commit(name, kind, proposal, hint);
        }
        legend = extended;
        entries.push(IdentifierEntry {
            symbol,
            original: name.to_string(),
            hint,
            kind,
            wide,
            frequency: freq,
            net_savings: net,
        });
    }

    entries.sort_by(|a, b| b.net_savings.cmp(&a.net_savings));
    debug!(candidates = candidate_count, promoted = entries.len(), "identifier encoding");

    IdentifierEncoding {
        text: apply(text, &entries),
        entries,
        candidates: candidate_count,
    }
}

/// Rewrite identifier tokens, longest name first, leaving declared type
/// names in place.
pub fn apply(text: &str, entries: &[IdentifierEntry]) -> String {
    let mut order: Vec<&IdentifierEntry> = entries.iter().collect();
    order.sort_by(|a, b| {
        b.original
            .len()
            .cmp(&a.original.len())
            .then_with(|| a.original.cmp(&b.original))
    });

    let mut result = text.to_string();
    for entry in order {
        let spans: Vec<(usize, usize)> = {
            let stream = TokenStream::lex(&result);
            (0..stream.len())
                .filter(|&i| {
                    stream.kind(i) == TokenKind::Ident
                        && stream.text(i) == entry.original
                        && !stream.is_declared_type_name(i)
                })
                .map(|i| stream.span(i))
                .collect()
        };
        for (start, end) in spans.into_iter().rev() {
            result.replace_range(start..end, &entry.symbol);
        }
    }
    result
}
