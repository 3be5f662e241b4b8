//! Encode pipeline: minify, encode identifiers, compress repetition, assemble.

use cq_core::{Result, SirclConfig};
use serde::Serialize;
use tracing::debug;

use crate::decoder::{self, DecodeOptions, DecodeResult};
use crate::estimate::estimate_tokens;
use crate::layer1_minify;
use crate::layer2_identifiers::{self, IdentifierEntry};
use crate::layer3_repetition::{MacroEntry, RepetitionCompressor};
use crate::legend::{Legend, LegendEntry, MacroDef};
use crate::symbols::SymbolContext;

/// Token accounting for one encoded file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodingMetadata {
    pub original_tokens: usize,
    pub minified_tokens: usize,
    pub encoded_tokens: usize,
    pub tokens_saved: i64,
    pub reduction_pct: f64,
    pub identifiers_encoded: usize,
    pub wide_symbols_used: usize,
    pub macros_created: usize,
    pub layers_applied: Vec<String>,
}

/// Output of one encode call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodedArtifact {
    /// Legend, blank line, payload. Payload alone when nothing was rewritten.
    pub code: String,
    pub metadata: EncodingMetadata,
    pub identifier_mapping: Vec<IdentifierEntry>,
    pub macro_legend: Vec<MacroEntry>,
}

impl EncodedArtifact {
    pub fn legend(&self) -> Legend {
        Legend {
            identifiers: self
                .identifier_mapping
                .iter()
                .map(|e| LegendEntry {
                    symbol: e.symbol.clone(),
                    original: e.original.clone(),
                    hint: e.legend_hint().map(str::to_string),
                })
                .collect(),
            macros: self
                .macro_legend
                .iter()
                .map(|m| MacroDef { symbol: m.symbol.clone(), template: m.template.clone() })
                .collect(),
        }
    }
}

/// The codec pipeline.
#[derive(Debug, Clone)]
pub struct CompactorPipeline {
    config: SirclConfig,
}

impl CompactorPipeline {
    pub fn new(config: SirclConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SirclConfig {
        &self.config
    }

    /// Encode one file, allocating identifier symbols from `ctx`.
    pub fn encode(&self, source: &str, ctx: &mut SymbolContext) -> EncodedArtifact {
        let original_tokens = estimate_tokens(source);
        let mut layers = Vec::new();

        // Layer 1: minify (always applied)
        let minified = layer1_minify::minify(source);
        layers.push("minify".to_string());
        let minified_tokens = estimate_tokens(&minified);

        // Layer 2: semantic identifier encoding
        let mut text = minified;
        let mut identifier_mapping = Vec::new();
        if self.config.enable_semantic_encoding {
            let encoding = if self.config.cross_file_stable {
                layer2_identifiers::encode(&text, &self.config, ctx)
            } else {
                layer2_identifiers::encode(&text, &self.config, &mut SymbolContext::new())
            };
            if !encoding.entries.is_empty() {
                layers.push("identifiers".to_string());
            }
            text = encoding.text;
            identifier_mapping = encoding.entries;
        }

        // Layer 3: repetition compression
        let mut macro_legend = Vec::new();
        if self.config.enable_repetition_compression {
            let encoding = RepetitionCompressor::new(&self.config).compress(&text);
            if !encoding.macros.is_empty() {
                layers.push("repetition".to_string());
            }
            text = encoding.text;
            macro_legend = encoding.macros;
        }

        let mut artifact = EncodedArtifact {
            code: String::new(),
            metadata: EncodingMetadata::default(),
            identifier_mapping,
            macro_legend,
        };
        artifact.code = artifact.legend().assemble(&text);

        let encoded_tokens = estimate_tokens(&artifact.code);
        let tokens_saved = original_tokens as i64 - encoded_tokens as i64;
        let reduction_pct = if original_tokens > 0 {
            tokens_saved as f64 / original_tokens as f64 * 100.0
        } else {
            0.0
        };
        artifact.metadata = EncodingMetadata {
            original_tokens,
            minified_tokens,
            encoded_tokens,
            tokens_saved,
            reduction_pct,
            identifiers_encoded: artifact.identifier_mapping.len(),
            wide_symbols_used: artifact.identifier_mapping.iter().filter(|e| e.wide).count(),
            macros_created: artifact.macro_legend.len(),
            layers_applied: layers,
        };

        debug!(
            original_tokens,
            encoded_tokens,
            identifiers = artifact.metadata.identifiers_encoded,
            macros = artifact.metadata.macros_created,
            "encoded file"
        );
        artifact
    }

    /// Encode one file with a fresh context.
    pub fn encode_file(&self, source: &str) -> EncodedArtifact {
        self.encode(source, &mut SymbolContext::new())
    }

    /// Encode files in order, sharing one context across the batch.
    pub fn encode_batch<'s, I>(&self, sources: I, ctx: &mut SymbolContext) -> Vec<EncodedArtifact>
    where
        I: IntoIterator<Item = &'s str>,
    {
        sources.into_iter().map(|source| self.encode(source, ctx)).collect()
    }

    pub fn decode(&self, artifact: &str, options: &DecodeOptions) -> Result<DecodeResult> {
        decoder::decode(artifact, options)
    }
}

impl Default for CompactorPipeline {
    fn default() -> Self {
        Self { config: SirclConfig::default() }
    }
}
