//! Compaqt codec: reversible token compaction for C-family source.
//!
//! Encode layers:
//! 1. Minify (comments and insignificant whitespace removed)
//! 2. Identifier encoding, long or frequent names → compact symbols
//! 3. Repetition compression, repeated statements → macro symbols
//!
//! The legend emitted ahead of the payload is everything [`decoder::decode`]
//! needs to restore the text.

pub mod decoder;
pub mod estimate;
pub mod layer1_minify;
pub mod layer2_identifiers;
pub mod layer3_repetition;
pub mod legend;
pub mod lexer;
pub mod pipeline;
pub mod symbols;

pub use decoder::{decode, DecodeOptions, DecodeResult};
pub use estimate::estimate_tokens;
pub use layer1_minify::minify;
pub use legend::Legend;
pub use pipeline::{CompactorPipeline, EncodedArtifact, EncodingMetadata};
pub use symbols::SymbolContext;

#[cfg(test)]
mod tests;
