pub mod config;
pub mod error;
pub mod types;

pub use config::SirclConfig;
pub use error::{CodecError, Result};
pub use types::{IdentifierKind, PatternKind};
