//! State-dependent longest-match lexer driven by a parse table.

mod cursor;

pub use cursor::{EOF_CHAR, ScanCursor};
use text_size::{TextRange, TextSize};
use trellis_table::{Language, LexMode};
use trellis_tree::{Length, Point, StateId, Symbol, SymbolSet};

/// A lexed terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: Symbol,
    pub range: TextRange,
    pub start_point: Point,
    pub end_point: Point,
    /// Bytes past the end of the token the lexer looked at.
    pub lookahead_bytes: u32,
    /// The lex mode the token was produced in.
    pub lex_mode: u16,
}

impl Token {
    /// Returns the size of the token.
    pub fn size(&self) -> Length {
        Length::new(self.range.len(), self.end_point - self.start_point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexed {
    Token(Token),
    EndOfInput,
}

/// Produces the next terminal valid in a parse state.
pub trait Lexer {
    /// Lexes at `position` in the lex mode of `state`.
    ///
    /// `position` must lie on a char boundary within the text.
    fn next_token(&mut self, state: StateId, position: Length) -> Lexed;
}

/// Hand-written lexing for terminals that patterns cannot express.
///
/// Scanners are pure: the same text and valid set must produce the same
/// token.
pub trait ExternalScanner {
    /// Scans one token among `valid`, or returns `None` to let the table's
    /// lexical rules run.
    fn scan(&self, cursor: &mut ScanCursor<'_>, valid: &SymbolSet) -> Option<Symbol>;
}

/// The [`Lexer`] over a [`Language`]'s compiled lexical rules.
pub struct TableLexer<'a> {
    language: &'a Language,
    text: &'a str,
    scanner: Option<&'a dyn ExternalScanner>,
}

impl<'a> TableLexer<'a> {
    pub fn new(language: &'a Language, text: &'a str) -> Self {
        Self { language, text, scanner: None }
    }

    pub fn with_scanner(mut self, scanner: &'a dyn ExternalScanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    fn scan_external(&self, mode: &LexMode, start: usize) -> Option<(Symbol, usize, usize)> {
        let scanner = self.scanner?;
        if mode.externals().is_empty() {
            return None;
        }
        let mut cursor = ScanCursor::new(self.text, start);
        let symbol = scanner.scan(&mut cursor, mode.externals())?;
        if !mode.externals().contains(symbol) {
            tracing::warn!(?symbol, "external scanner returned a token that is not valid here");
            return None;
        }
        let end = cursor.token_end().max(start);
        if !self.text.is_char_boundary(end) {
            tracing::warn!(?symbol, end, "external scanner ended a token inside a character");
            return None;
        }
        Some((symbol, end, cursor.lookahead_past(end)))
    }

    /// Runs `rules` at `start`, returning the longest non-empty match and the
    /// furthest position examined.
    fn longest_match(&self, rules: &[u16], start: usize) -> (Option<(Symbol, usize)>, usize) {
        let bytes = self.text.as_bytes();
        let lex_rules = self.language.lex_rules();
        let mut best: Option<(Symbol, usize)> = None;
        let mut examined = 0;
        for &index in rules {
            let rule = &lex_rules[usize::from(index)];
            let found = rule.longest_match(bytes, start);
            examined = examined.max(found.examined);
            match (found.len, best) {
                (Some(0) | None, _) => {}
                (Some(len), Some((_, best_len))) if len <= best_len => {}
                (Some(len), _) => best = Some((rule.symbol(), len)),
            }
        }
        (best, start + examined)
    }

    fn token(&self, symbol: Symbol, position: Length, end: usize, lookahead: usize, lex_mode: u16) -> Token {
        let start = usize::from(position.bytes);
        let end_point = (position + Length::of(&self.text[start..end])).extent;
        Token {
            symbol,
            range: TextRange::new(position.bytes, TextSize::new(end as u32)),
            start_point: position.extent,
            end_point,
            lookahead_bytes: lookahead as u32,
            lex_mode,
        }
    }
}

impl Lexer for TableLexer<'_> {
    fn next_token(&mut self, state: StateId, position: Length) -> Lexed {
        let lex_mode = self.language.lex_mode_id(state);
        let mode = self.language.lex_mode(lex_mode);
        let start = usize::from(position.bytes);

        if let Some((symbol, end, lookahead)) = self.scan_external(mode, start) {
            return Lexed::Token(self.token(symbol, position, end, lookahead, lex_mode));
        }
        if start >= self.text.len() {
            return Lexed::EndOfInput;
        }

        let (mut found, mut examined) = self.longest_match(mode.rules(), start);
        if found.is_none() && lex_mode != self.language.recovery_lex_mode() {
            let all = self.language.lex_mode(self.language.recovery_lex_mode());
            let (fallback, fallback_examined) = self.longest_match(all.rules(), start);
            found = fallback;
            examined = examined.max(fallback_examined);
        }

        let (symbol, end) = match found {
            Some((symbol, len)) => (symbol, start + len),
            None => {
                let len = self.text[start..].chars().next().map_or(1, char::len_utf8);
                tracing::trace!(offset = start, "no lexical rule matches");
                (Symbol::ERROR, start + len)
            }
        };
        let lookahead = examined.saturating_sub(end);
        Lexed::Token(self.token(symbol, position, end, lookahead, lex_mode))
    }
}
