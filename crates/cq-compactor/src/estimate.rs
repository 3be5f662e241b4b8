//! Heuristic language-model token cost.
//!
//! Not a tokenizer: alphanumeric segments are priced by length (with a
//! camel-case discount for long ones) and stray punctuation is priced in
//! groups of three. Every profitability decision in the pipeline goes
//! through [`estimate_tokens`], so it must stay pure and deterministic.

const CHARS_PER_TOKEN_LONG: f64 = 3.5;
const CAMEL_DISCOUNT: f64 = 0.5;
const SPECIALS_PER_TOKEN: usize = 3;

/// Estimated token count; 0 only for empty text.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    let mut tokens = 0;
    let mut specials = 0usize;
    let mut segment: Vec<char> = Vec::new();

    for c in text.chars() {
        if c.is_alphanumeric() {
            segment.push(c);
            continue;
        }
        tokens += segment_cost(&segment);
        segment.clear();
        if !c.is_whitespace() && c != '_' {
            specials += 1;
        }
    }
    tokens += segment_cost(&segment);
    tokens += specials.div_ceil(SPECIALS_PER_TOKEN);

    tokens.max(1)
}

fn segment_cost(segment: &[char]) -> usize {
    let len = segment.len();
    match len {
        0 => 0,
        1..=3 => 1,
        4..=6 => len.div_ceil(4),
        _ => {
            let transitions = segment
                .windows(2)
                .filter(|w| w[0].is_lowercase() && w[1].is_uppercase())
                .count();
            let effective = len as f64 - CAMEL_DISCOUNT * transitions as f64;
            (effective / CHARS_PER_TOKEN_LONG).ceil() as usize
        }
    }
}

/// Estimated tokens as a signed quantity, for savings arithmetic.
pub fn cost(text: &str) -> i64 {
    estimate_tokens(text) as i64
}
