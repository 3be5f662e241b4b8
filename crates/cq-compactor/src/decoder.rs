//! Decoder: legend parsing and symbol restoration.
//!
//! Macros are expanded before identifiers, since templates carry the
//! already-encoded identifier symbols. Every substitution is whole-token.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use cq_core::{CodecError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::layer3_repetition::MACRO_PREFIX;
use crate::legend::{looks_truncated, Legend};
use crate::symbols::is_wide_symbol;

static ASCII_SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[vfT]\d+$").unwrap());
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w+").unwrap());

const UNMAPPED_MARKER: &str = "/*unmapped*/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DecodeOptions {
    /// Fail on symbol-shaped tokens the legend does not define.
    pub strict: bool,
    /// Leave unknown symbols untouched; otherwise tag them in the output.
    pub preserve_new_symbols: bool,
    /// On any decode failure, return the payload with the legend stripped.
    pub fallback_to_original: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            strict: false,
            preserve_new_symbols: true,
            fallback_to_original: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodeResult {
    pub code: String,
    /// False when the fallback path produced `code`.
    pub decoded: bool,
    pub unknown_symbols: BTreeSet<String>,
    pub warnings: Vec<String>,
}

/// Whether `token` has the shape of something the encoder allocates.
pub fn is_symbol_shaped(token: &str) -> bool {
    if !token.is_empty() && token.chars().all(is_wide_symbol) {
        return true;
    }
    if ASCII_SYMBOL_RE.is_match(token) {
        return true;
    }
    token
        .strip_prefix(MACRO_PREFIX)
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_uppercase()))
}

/// Decode an encoded artifact back to source text.
pub fn decode(artifact: &str, options: &DecodeOptions) -> Result<DecodeResult> {
    match try_decode(artifact, options) {
        Ok(result) => Ok(result),
        Err(err) if options.fallback_to_original => {
            warn!(error = %err, "decode failed, returning payload without legend");
            Ok(DecodeResult {
                code: Legend::strip(artifact).to_string(),
                decoded: false,
                unknown_symbols: BTreeSet::new(),
                warnings: vec![format!("decode failed, legend stripped: {err}")],
            })
        }
        Err(err) => Err(err),
    }
}

fn try_decode(artifact: &str, options: &DecodeOptions) -> Result<DecodeResult> {
    let (legend, payload) = Legend::parse(artifact)?;
    if legend.is_empty() {
        return Ok(DecodeResult {
            code: artifact.to_string(),
            decoded: true,
            unknown_symbols: BTreeSet::new(),
            warnings: Vec::new(),
        });
    }

    let mut warnings = Vec::new();
    for m in legend.macros.iter().filter(|m| looks_truncated(&m.template)) {
        warnings.push(format!(
            "macro {} template was truncated in the legend, expansion is lossy",
            m.symbol
        ));
    }

    let macros: Vec<(&str, &str)> = legend
        .macros
        .iter()
        .map(|m| (m.symbol.as_str(), m.template.as_str()))
        .collect();
    let identifiers: Vec<(&str, &str)> =
        legend.identifiers.iter().map(|e| (e.symbol.as_str(), e.original.as_str())).collect();

    let mut code = substitute(payload, &macros)?;
    code = substitute(&code, &identifiers)?;

    let known: HashSet<&str> = macros
        .iter()
        .chain(identifiers.iter())
        .flat_map(|&(symbol, original)| [symbol, original])
        .collect();
    let unknown: BTreeSet<String> = WORD_RE
        .find_iter(&code)
        .map(|m| m.as_str())
        .filter(|w| is_symbol_shaped(w) && !known.contains(w))
        .map(str::to_string)
        .collect();

    if !unknown.is_empty() {
        if options.strict {
            return Err(CodecError::UnknownSymbols(unknown.into_iter().collect()));
        }
        warnings.push(format!(
            "unknown symbols left in output: {}",
            unknown.iter().cloned().collect::<Vec<_>>().join(", ")
        ));
        if !options.preserve_new_symbols {
            code = tag_unknown(&code, &unknown);
        }
    }

    debug!(
        identifiers = identifiers.len(),
        macros = macros.len(),
        unknown = unknown.len(),
        "decoded artifact"
    );
    Ok(DecodeResult { code, decoded: true, unknown_symbols: unknown, warnings })
}

/// Replace every whole-token occurrence of each `from` with its `to`, in a
/// single pass. Longer symbols win where alternatives overlap.
fn substitute(text: &str, pairs: &[(&str, &str)]) -> Result<String> {
    if pairs.is_empty() {
        return Ok(text.to_string());
    }
    let mut symbols: Vec<&str> = pairs.iter().map(|(s, _)| *s).collect();
    symbols.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let alternation = symbols.iter().map(|s| regex::escape(s)).collect::<Vec<_>>().join("|");
    let re = Regex::new(&format!(r"\b(?:{alternation})\b")).map_err(anyhow::Error::from)?;

    Ok(re
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let found = &caps[0];
            pairs
                .iter()
                .find(|(s, _)| *s == found)
                .map_or_else(|| found.to_string(), |(_, to)| to.to_string())
        })
        .into_owned())
}

fn tag_unknown(text: &str, unknown: &BTreeSet<String>) -> String {
    WORD_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let word = &caps[0];
            if unknown.contains(word) {
                format!("{word}{UNMAPPED_MARKER}")
            } else {
                word.to_string()
            }
        })
        .into_owned()
}
