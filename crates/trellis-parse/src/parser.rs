use std::sync::Arc;

use text_size::{TextRange, TextSize};
use trellis_lexer::{ExternalScanner, TableLexer};
use trellis_table::Language;
use trellis_tree::{InputEdit, Tree};

use crate::engine::Engine;
use crate::reuse::ReuseCursor;
use crate::{ParseError, ParseOptions, TextProvider, text};

/// The result of an incremental parse.
#[derive(Debug, Clone)]
pub struct Reparse {
    pub tree: Tree,
    /// Ranges of the new text whose syntactic meaning changed.
    pub changed_ranges: Vec<TextRange>,
}

/// Parses text of one [`Language`], fresh or incrementally.
pub struct Parser {
    language: Arc<Language>,
    options: ParseOptions,
    scanner: Option<Arc<dyn ExternalScanner + Send + Sync>>,
}

impl Parser {
    pub fn new(language: Arc<Language>) -> Self {
        Self { language, options: ParseOptions::default(), scanner: None }
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Installs the scanner for the language's external tokens.
    pub fn with_scanner(mut self, scanner: Arc<dyn ExternalScanner + Send + Sync>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn language(&self) -> &Arc<Language> {
        &self.language
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parses `text` from scratch. Always produces a tree spanning the whole
    /// text; syntax errors become ERROR nodes.
    pub fn parse(&self, text: &str) -> Tree {
        self.run(text, None)
    }

    /// Reads all of `provider` and parses it.
    pub fn parse_with(&self, provider: impl TextProvider) -> Result<Tree, ParseError> {
        let text = text::read_to_string(provider)?;
        Ok(self.parse(&text))
    }

    /// Parses `text`, reusing what is still valid of `edited`, a tree that
    /// was already brought in sync with `text` by [`Tree::edit`].
    pub fn parse_edited(&self, text: &str, edited: &Tree) -> Result<Reparse, ParseError> {
        self.check_compatible(edited)?;
        let text_len = TextSize::try_from(text.len()).unwrap_or(TextSize::new(u32::MAX));
        if text_len != edited.len() {
            return Err(ParseError::LengthMismatch { text: text_len, tree: edited.len() });
        }

        let tree = self.run(text, Some(edited));
        let changed_ranges = edited.changed_ranges(&tree);
        Ok(Reparse { tree, changed_ranges })
    }

    /// Applies `edits` to `tree` in order and reparses the new `text`.
    pub fn reparse(&self, tree: &Tree, edits: &[InputEdit], text: &str) -> Result<Reparse, ParseError> {
        let edited = tree.edit(edits)?;
        self.parse_edited(text, &edited)
    }

    fn check_compatible(&self, tree: &Tree) -> Result<(), ParseError> {
        let symbols = self.language.symbols();
        let same = Arc::ptr_eq(tree.symbols(), symbols)
            || (tree.language() == symbols.language()
                && tree.abi_version() == symbols.version()
                && tree.symbols().len() == symbols.len());
        if same {
            return Ok(());
        }
        Err(ParseError::LanguageMismatch {
            tree: tree.language().to_owned(),
            parser: self.language.name().to_owned(),
        })
    }

    fn run(&self, text: &str, old: Option<&Tree>) -> Tree {
        let _span = tracing::debug_span!("parse", language = self.language.name(), len = text.len()).entered();
        let mut lexer = TableLexer::new(&self.language, text);
        if let Some(scanner) = &self.scanner {
            lexer = lexer.with_scanner(scanner.as_ref());
        }
        let reuse = old.filter(|_| self.options.reuse).map(ReuseCursor::new);
        let root = Engine::new(&self.language, &self.options, lexer, reuse).run();
        Tree::new(root, Arc::clone(self.language.symbols()))
    }
}
