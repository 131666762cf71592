/// Reasons a parse table is rejected.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot read table: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("table ABI version {found} is not supported (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("table declares no symbols")]
    NoSymbols,
    #[error("table has {count} {what}, more than the supported {max}")]
    TooLarge { what: &'static str, count: usize, max: usize },
    #[error("{context} refers to symbol {symbol}, which does not exist")]
    DanglingSymbol { context: String, symbol: u16 },
    #[error("{context} refers to state {state}, which does not exist")]
    DanglingState { context: String, state: u16 },
    #[error("{context} refers to rule {rule}, which does not exist")]
    DanglingRule { context: String, rule: u16 },
    #[error("{context} expects a {expected}, but `{name}` is not one")]
    WrongKind { context: String, name: String, expected: &'static str },
    #[error("pattern `{pattern}` of `{name}` does not compile: {message}")]
    Regex { name: String, pattern: String, message: String },
}
