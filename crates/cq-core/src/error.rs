use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Malformed legend at line {line}: {reason}")]
    LegendParse { line: usize, reason: String },
    #[error("Unknown symbols in payload: {}", .0.join(", "))]
    UnknownSymbols(Vec<String>),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CodecError {
    pub fn legend(line: usize, reason: impl Into<String>) -> Self {
        Self::LegendParse { line, reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
