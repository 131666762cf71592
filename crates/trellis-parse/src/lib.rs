//! Incremental GLR parsing over table-driven languages.

mod conflict;
mod engine;
mod error;
mod options;
mod parser;
mod reuse;
mod stack;
mod text;

pub use error::ParseError;
pub use options::ParseOptions;
pub use parser::{Parser, Reparse};
pub use text::TextProvider;
pub use trellis_lexer::ExternalScanner;
