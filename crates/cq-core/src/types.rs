use serde::{Deserialize, Serialize};

/// Role of an identifier, inferred from its neighbors in the token stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Variable,
    Function,
    Type,
}

impl IdentifierKind {
    /// Prefix of the compact ASCII symbols allocated for this kind.
    pub fn prefix(&self) -> char {
        match self {
            Self::Variable => 'v',
            Self::Function => 'f',
            Self::Type => 'T',
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Variable => 0,
            Self::Function => 1,
            Self::Type => 2,
        }
    }
}

/// Statement shape recognized by the repetition compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PatternKind {
    FunctionCall,
    Assignment,
    StructInit,
}
