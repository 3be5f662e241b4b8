//! Legend header: rendering, assembly and parsing.
//!
//! ```text
//! // IDENTIFIERS: 甲=buffer_size (size), v0=counter
//! // MACROS:
//! // μA = {return a+b;}
//!
//! <payload>
//! ```

use std::collections::HashMap;
use std::sync::LazyLock;

use cq_core::{CodecError, Result};
use regex::Regex;

use crate::layer1_minify::is_ident_char;

pub const IDENTIFIERS_MARKER: &str = "// IDENTIFIERS:";
pub const MACROS_MARKER: &str = "// MACROS:";
/// Text preceding the first identifier entry.
pub const IDENTIFIERS_PREAMBLE: &str = "// IDENTIFIERS: ";
pub const ENTRY_SEPARATOR: &str = ", ";
/// Templates wider than this are cut in the legend line.
pub const TEMPLATE_DISPLAY_WIDTH: usize = 60;
const ELLIPSIS: &str = "...";

static ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=\s]+)=([^\s(]+)(?: \(([^()]*)\))?$").unwrap());
static MACRO_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^// (\S+) = (.*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegendEntry {
    pub symbol: String,
    pub original: String,
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub symbol: String,
    pub template: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Legend {
    pub identifiers: Vec<LegendEntry>,
    pub macros: Vec<MacroDef>,
}

/// `symbol=original` or `symbol=original (hint)`.
pub fn identifier_entry(symbol: &str, original: &str, hint: Option<&str>) -> String {
    match hint {
        Some(h) => format!("{symbol}={original} ({h})"),
        None => format!("{symbol}={original}"),
    }
}

/// Template as shown in its legend line: newlines flattened, long ones cut.
pub fn display_template(template: &str) -> String {
    let flat = template.replace("\r\n", " ").replace('\n', " ");
    if flat.chars().count() > TEMPLATE_DISPLAY_WIDTH {
        let cut: String = flat.chars().take(TEMPLATE_DISPLAY_WIDTH).collect();
        format!("{cut}{ELLIPSIS}")
    } else {
        flat
    }
}

pub fn macro_line(symbol: &str, template: &str) -> String {
    format!("// {symbol} = {}", display_template(template))
}

/// Whether the legend line carries `template` verbatim.
pub fn is_verbatim(template: &str) -> bool {
    !template.contains('\n') && template.chars().count() <= TEMPLATE_DISPLAY_WIDTH
}

/// Whether a parsed template looks like it was cut by [`display_template`].
pub fn looks_truncated(template: &str) -> bool {
    template.ends_with(ELLIPSIS)
        && template.chars().count() == TEMPLATE_DISPLAY_WIDTH + ELLIPSIS.len()
}

fn starts_legend(line: &str) -> bool {
    line.starts_with(IDENTIFIERS_MARKER) || line.trim_end() == MACROS_MARKER
}

fn is_symbol_token(symbol: &str) -> bool {
    !symbol.is_empty() && symbol.chars().all(is_ident_char)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Identifiers,
    Macros,
}

impl Legend {
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty() && self.macros.is_empty()
    }

    /// Legend lines without the trailing blank separator; empty when there
    /// is nothing to record.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();
        if !self.identifiers.is_empty() {
            let entries: Vec<String> = self
                .identifiers
                .iter()
                .map(|e| identifier_entry(&e.symbol, &e.original, e.hint.as_deref()))
                .collect();
            lines.push(format!("{IDENTIFIERS_PREAMBLE}{}", entries.join(ENTRY_SEPARATOR)));
        }
        if !self.macros.is_empty() {
            lines.push(MACROS_MARKER.to_string());
            for m in &self.macros {
                lines.push(macro_line(&m.symbol, &m.template));
            }
        }
        lines.join("\n")
    }

    /// Prepend the legend and its blank separator line to `payload`.
    pub fn assemble(&self, payload: &str) -> String {
        if self.is_empty() {
            return payload.to_string();
        }
        format!("{}\n\n{payload}", self.render())
    }

    /// Split an artifact into its legend and payload. Text whose first line
    /// is not a legend marker has an empty legend and is all payload.
    pub fn parse(artifact: &str) -> Result<(Legend, &str)> {
        let first = artifact.lines().next().unwrap_or("");
        if !starts_legend(first) {
            return Ok((Legend::default(), artifact));
        }

        let mut legend = Legend::default();
        let mut section = Section::Identifiers;
        let mut offset = 0;

        for (idx, raw) in artifact.split_inclusive('\n').enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches(['\n', '\r']);

            if line.trim().is_empty() {
                return Ok((legend, &artifact[offset + raw.len()..]));
            }
            if !line.starts_with("//") {
                return Ok((legend, &artifact[offset..]));
            }

            if let Some(rest) = line.strip_prefix(IDENTIFIERS_MARKER) {
                section = Section::Identifiers;
                legend.parse_identifiers(rest.trim(), line_no)?;
            } else if line.trim_end() == MACROS_MARKER {
                section = Section::Macros;
            } else if section == Section::Macros {
                legend.parse_macro(line, line_no)?;
            } else {
                return Err(CodecError::legend(line_no, format!("unexpected legend line `{line}`")));
            }
            offset += raw.len();
        }

        Ok((legend, ""))
    }

    fn parse_identifiers(&mut self, list: &str, line_no: usize) -> Result<()> {
        if list.is_empty() {
            return Err(CodecError::legend(line_no, "empty identifier list"));
        }
        for item in list.split(',') {
            let item = item.trim();
            let caps = ENTRY_RE.captures(item).ok_or_else(|| {
                CodecError::legend(line_no, format!("malformed identifier entry `{item}`"))
            })?;
            let entry = LegendEntry {
                symbol: caps[1].to_string(),
                original: caps[2].to_string(),
                hint: caps.get(3).map(|m| m.as_str().to_string()),
            };
            if !is_symbol_token(&entry.symbol) {
                let reason = format!("symbol `{}` is not a single token", entry.symbol);
                return Err(CodecError::legend(line_no, reason));
            }
            self.identifiers.push(entry);
        }
        self.check_injective(line_no)
    }

    fn parse_macro(&mut self, line: &str, line_no: usize) -> Result<()> {
        let caps = MACRO_LINE_RE
            .captures(line)
            .ok_or_else(|| CodecError::legend(line_no, format!("malformed macro line `{line}`")))?;
        let symbol = caps[1].to_string();
        if !is_symbol_token(&symbol) {
            let reason = format!("macro symbol `{symbol}` is not a single token");
            return Err(CodecError::legend(line_no, reason));
        }
        if self.macros.iter().any(|m| m.symbol == symbol) {
            return Err(CodecError::legend(line_no, format!("macro `{symbol}` defined twice")));
        }
        self.macros.push(MacroDef { symbol, template: caps[2].to_string() });
        Ok(())
    }

    /// Distinct symbols must map to distinct originals and vice versa.
    fn check_injective(&self, line_no: usize) -> Result<()> {
        let mut forward: HashMap<&str, &str> = HashMap::new();
        let mut reverse: HashMap<&str, &str> = HashMap::new();
        for e in &self.identifiers {
            if forward.insert(&e.symbol, &e.original).is_some_and(|prev| prev != e.original) {
                let reason = format!("symbol `{}` maps to two names", e.symbol);
                return Err(CodecError::legend(line_no, reason));
            }
            if reverse.insert(&e.original, &e.symbol).is_some_and(|prev| prev != e.symbol) {
                let reason = format!("name `{}` has two symbols", e.original);
                return Err(CodecError::legend(line_no, reason));
            }
        }
        Ok(())
    }

    /// Payload with any recognizable legend block removed.
    pub fn strip(artifact: &str) -> &str {
        let first = artifact.lines().next().unwrap_or("");
        if !starts_legend(first) {
            return artifact;
        }
        let mut offset = 0;
        for raw in artifact.split_inclusive('\n') {
            let line = raw.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                return &artifact[offset + raw.len()..];
            }
            if !line.starts_with("//") {
                return &artifact[offset..];
            }
            offset += raw.len();
        }
        ""
    }
}
