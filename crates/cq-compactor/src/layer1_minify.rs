//! Layer 1: Minify: strip comments and whitespace from C-family source.
//!
//! A single left-to-right pass over a six-state machine. Preprocessor lines,
//! string literals and char literals are copied verbatim; comments are
//! dropped; whitespace survives only where removing it would glue two tokens
//! together.

/// Minifier lexer state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Normal,
    LineComment,
    BlockComment,
    String,
    Char,
    Preprocessor,
}

/// Operator table, longest first so `>>=` is never split into `>>` + `=`.
pub const OPERATORS: &[&str] = &[
    ">>=", "<<=", "...",
    "++", "--", "->", "==", "!=", "<=", ">=",
    "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=",
    "<<", ">>",
    "+", "-", "*", "/", "%", "=",
    "<", ">", "!", "~",
    "&", "|", "^",
    "?", ":", ",", ";", ".",
    "(", ")", "[", "]", "{", "}",
];

pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Longest operator starting at `chars[i]`.
pub fn match_operator(chars: &[char], i: usize) -> Option<&'static str> {
    OPERATORS.iter().copied().find(|op| {
        let len = op.chars().count();
        i + len <= chars.len() && op.chars().zip(&chars[i..i + len]).all(|(a, b)| a == *b)
    })
}

/// Whether dropping the gap between `prev` and `next` would fuse them into a
/// different token: two identifier characters, a comment opener, or the
/// start of a multi-character operator.
fn needs_separator(prev: char, next: char) -> bool {
    if is_ident_char(prev) && is_ident_char(next) {
        return true;
    }
    if prev == '/' && (next == '/' || next == '*') {
        return true;
    }
    OPERATORS.iter().any(|op| {
        let mut it = op.chars();
        op.len() >= 2 && it.next() == Some(prev) && it.next() == Some(next)
    })
}

/// Minify C-family source code.
pub fn minify(source: &str) -> String {
    let chars: Vec<char> = source.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(source.len());
    let mut state = LexState::Normal;
    let mut at_line_start = true;
    // Pending whitespace or comment between two emitted characters.
    let mut gap = false;
    let mut i = 0;

    while i < n {
        let c = chars[i];
        match state {
            LexState::Normal => {
                if at_line_start && c == '#' {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push(c);
                    state = LexState::Preprocessor;
                    at_line_start = false;
                    gap = false;
                    i += 1;
                    continue;
                }

                if c == '/' && i + 1 < n {
                    match chars[i + 1] {
                        '/' => {
                            state = LexState::LineComment;
                            gap = true;
                            i += 2;
                            continue;
                        }
                        '*' => {
                            state = LexState::BlockComment;
                            gap = true;
                            i += 2;
                            continue;
                        }
                        _ => {}
                    }
                }

                if c.is_whitespace() {
                    gap = true;
                    if c == '\n' {
                        at_line_start = true;
                    }
                    i += 1;
                    continue;
                }

                if gap {
                    if out.chars().next_back().is_some_and(|prev| needs_separator(prev, c)) {
                        out.push(' ');
                    }
                    gap = false;
                }
                at_line_start = false;

                match c {
                    '"' => {
                        state = LexState::String;
                        out.push(c);
                        i += 1;
                    }
                    '\'' => {
                        state = LexState::Char;
                        out.push(c);
                        i += 1;
                    }
                    _ => match match_operator(&chars, i) {
                        Some(op) => {
                            out.push_str(op);
                            i += op.chars().count();
                        }
                        None => {
                            out.push(c);
                            i += 1;
                        }
                    },
                }
            }

            LexState::LineComment => {
                if c == '\n' {
                    state = LexState::Normal;
                    at_line_start = true;
                }
                i += 1;
            }

            LexState::BlockComment => {
                if c == '*' && i + 1 < n && chars[i + 1] == '/' {
                    state = LexState::Normal;
                    i += 2;
                } else {
                    if c == '\n' {
                        at_line_start = true;
                    }
                    i += 1;
                }
            }

            LexState::String | LexState::Char => {
                let closer = if state == LexState::String { '"' } else { '\'' };
                out.push(c);
                if c == '\\' && i + 1 < n {
                    out.push(chars[i + 1]);
                    i += 2;
                } else {
                    if c == closer {
                        state = LexState::Normal;
                    }
                    i += 1;
                }
            }

            LexState::Preprocessor => {
                out.push(c);
                if c == '\\' && i + 1 < n {
                    // Line continuation stays inside the directive.
                    out.push(chars[i + 1]);
                    if chars[i + 1] == '\r' && i + 2 < n && chars[i + 2] == '\n' {
                        out.push('\n');
                        i += 1;
                    }
                    i += 2;
                } else {
                    if c == '\n' {
                        state = LexState::Normal;
                        at_line_start = true;
                    }
                    i += 1;
                }
            }
        }
    }

    out
}
