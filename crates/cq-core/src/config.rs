use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Encoder configuration. Every threshold is a direct algorithm parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SirclConfig {
    pub enable_semantic_encoding: bool,
    pub enable_repetition_compression: bool,
    pub preserve_control_flow: bool,
    pub preserve_verbs: bool,
    /// Allow the wide (ideographic) symbol pool; ASCII symbols only when off.
    pub hybrid_encoding: bool,
    /// Reuse symbols for the same name across every file of a batch.
    pub cross_file_stable: bool,
    pub min_length_for_unicode: usize,
    pub min_frequency: usize,
    pub min_net_savings: i64,
    pub macro_min_occurrences: usize,
    pub max_macros: usize,
    /// Shortest literal template (in chars) considered for a macro.
    pub min_pattern_length: usize,
}

impl Default for SirclConfig {
    fn default() -> Self {
        Self {
            enable_semantic_encoding: true,
            enable_repetition_compression: true,
            preserve_control_flow: true,
            preserve_verbs: true,
            hybrid_encoding: true,
            cross_file_stable: true,
            min_length_for_unicode: 6,
            min_frequency: 3,
            min_net_savings: 10,
            macro_min_occurrences: 2,
            max_macros: 26,
            min_pattern_length: 10,
        }
    }
}

impl SirclConfig {
    /// Minification only: no identifier or macro rewrites.
    pub fn minify_only() -> Self {
        Self {
            enable_semantic_encoding: false,
            enable_repetition_compression: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_length_for_unicode == 0 {
            return Err(CodecError::InvalidConfig("minLengthForUnicode must be at least 1".into()));
        }
        if self.min_frequency == 0 {
            return Err(CodecError::InvalidConfig("minFrequency must be at least 1".into()));
        }
        if self.macro_min_occurrences < 2 {
            return Err(CodecError::InvalidConfig(format!(
                "macroMinOccurrences must be at least 2, got {}",
                self.macro_min_occurrences
            )));
        }
        if self.min_pattern_length == 0 {
            return Err(CodecError::InvalidConfig("minPatternLength must be at least 1".into()));
        }
        Ok(())
    }
}
