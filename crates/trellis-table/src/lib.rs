//! Parse tables: the JSON format, validation and the runtime [`Language`].

mod builder;
mod error;
pub mod format;
mod language;
mod lex_rule;

pub use builder::LanguageBuilder;
pub use error::TableError;
pub use format::{Associativity, SymbolKind};
pub use language::{ABI_VERSION, Action, Language, LexMode, Rule, RuleId, SymbolMetadata};
pub use lex_rule::{LexRule, RuleMatch};

#[cfg(test)]
mod tests;
