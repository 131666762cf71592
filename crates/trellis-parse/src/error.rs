use text_size::TextSize;
use trellis_tree::EditError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error("the text is {text:?} bytes long, but the edited tree spans {tree:?} bytes")]
    LengthMismatch { text: TextSize, tree: TextSize },
    #[error("the tree was parsed with `{tree}`, not `{parser}`")]
    LanguageMismatch { tree: String, parser: String },
    #[error("the text is not valid UTF-8 after byte {valid_up_to}")]
    InvalidUtf8 { valid_up_to: usize },
}
