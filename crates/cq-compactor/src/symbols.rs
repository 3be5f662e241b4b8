//! Symbol alphabets and the caller-owned allocation context.

use std::collections::{HashMap, HashSet};

use cq_core::IdentifierKind;
use serde::{Deserialize, Serialize};

/// Wide symbol pool: visually distinct ideographs, one token each.
pub const WIDE_SYMBOLS: [char; 30] = [
    '甲', '乙', '丙', '丁', '戊', '己', '庚', '辛', '壬', '癸',
    '子', '丑', '寅', '卯', '辰', '午', '未', '酉', '石', '亥',
    '金', '木', '水', '火', '土', '日', '月', '山', '风', '云',
];

pub fn is_wide_symbol(c: char) -> bool {
    WIDE_SYMBOLS.contains(&c)
}

/// Symbol allocated to one identifier name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolAllocation {
    pub symbol: String,
    pub uses_wide_symbol_set: bool,
    pub semantic_hint: Option<String>,
    pub kind: IdentifierKind,
}

/// A symbol that would be allocated next, with the cursor positions that
/// committing it moves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub symbol: String,
    pub wide: bool,
    wide_cursor: usize,
    ascii_cursor: usize,
}

/// Name→symbol mapping, its inverse, and the alphabet cursors.
///
/// One context spans one batch of files. Pass the same context to every
/// encode call of the batch for cross-file stable symbols, and [`reset`]
/// it before encoding an unrelated codebase.
///
/// [`reset`]: SymbolContext::reset
#[derive(Debug, Clone, Default)]
pub struct SymbolContext {
    forward: HashMap<String, SymbolAllocation>,
    reverse: HashMap<String, String>,
    wide_cursor: usize,
    ascii_cursors: [usize; 3],
}

impl SymbolContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SymbolAllocation> {
        self.forward.get(name)
    }

    pub fn original_of(&self, symbol: &str) -> Option<&str> {
        self.reverse.get(symbol).map(String::as_str)
    }

    pub fn wide_remaining(&self) -> usize {
        WIDE_SYMBOLS.len().saturating_sub(self.wide_cursor)
    }

    /// Next free symbol for `kind`, skipping anything in `taken` or already
    /// allocated. Falls back to ASCII once the wide pool is exhausted.
    pub fn propose(
        &self,
        kind: IdentifierKind,
        want_wide: bool,
        taken: &HashSet<String>,
    ) -> Proposal {
        let ascii_cursor = self.ascii_cursors[kind.index()];
        if want_wide {
            let free = (self.wide_cursor..WIDE_SYMBOLS.len())
                .map(|k| (k, WIDE_SYMBOLS[k].to_string()))
                .find(|(_, s)| self.is_free(s, taken));
            if let Some((k, symbol)) = free {
                return Proposal { symbol, wide: true, wide_cursor: k + 1, ascii_cursor };
            }
        }

        let mut n = ascii_cursor;
        loop {
            let symbol = format!("{}{}", kind.prefix(), n);
            if self.is_free(&symbol, taken) {
                return Proposal {
                    symbol,
                    wide: false,
                    wide_cursor: self.wide_cursor,
                    ascii_cursor: n + 1,
                };
            }
            n += 1;
        }
    }

    fn is_free(&self, symbol: &str, taken: &HashSet<String>) -> bool {
        !taken.contains(symbol) && !self.reverse.contains_key(symbol)
    }

    pub fn commit(
        &mut self,
        name: &str,
        kind: IdentifierKind,
        proposal: Proposal,
        semantic_hint: Option<String>,
    ) -> SymbolAllocation {
        self.wide_cursor = proposal.wide_cursor;
        self.ascii_cursors[kind.index()] = proposal.ascii_cursor;
        let allocation = SymbolAllocation {
            symbol: proposal.symbol,
            uses_wide_symbol_set: proposal.wide,
            semantic_hint,
            kind,
        };
        self.reverse.insert(allocation.symbol.clone(), name.to_string());
        self.forward.insert(name.to_string(), allocation.clone());
        allocation
    }
}
