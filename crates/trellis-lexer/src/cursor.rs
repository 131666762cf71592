use std::str::Chars;

use text_size::TextSize;

pub const EOF_CHAR: char = '\0';

/// Read-only view of the text handed to external scanners.
///
/// The token produced by a scanner ends where [`ScanCursor::mark_end`] was
/// last called, or at the current position if it never was.
pub struct ScanCursor<'t> {
    chars: Chars<'t>,
    offset: usize,
    marked_end: Option<usize>,
    /// One past the furthest byte looked at.
    examined: usize,
}

impl<'t> ScanCursor<'t> {
    pub(crate) fn new(text: &'t str, start: usize) -> Self {
        Self { chars: text[start..].chars(), offset: start, marked_end: None, examined: start }
    }

    /// Byte offset of the cursor in the whole text.
    pub fn offset(&self) -> TextSize {
        TextSize::new(self.offset as u32)
    }

    pub fn is_eof(&self) -> bool {
        self.chars.as_str().is_empty()
    }

    pub fn peek(&mut self) -> char {
        let c = self.chars.clone().next();
        self.look(self.offset, c)
    }

    pub fn second(&mut self) -> char {
        let mut chars = self.chars.clone();
        let first = chars.next().map_or(0, char::len_utf8);
        let c = chars.next();
        self.look(self.offset + first, c)
    }

    pub fn advance(&mut self) -> char {
        let c = self.chars.next();
        let at = self.offset;
        self.offset += c.map_or(0, char::len_utf8);
        self.look(at, c)
    }

    pub fn advance_while(&mut self, f: impl Fn(char) -> bool + Copy) {
        while !self.is_eof() && f(self.peek()) {
            self.advance();
        }
    }

    /// Ends the token at the current position. Scanning may continue past
    /// it to decide the token kind.
    pub fn mark_end(&mut self) {
        self.marked_end = Some(self.offset);
    }

    fn look(&mut self, at: usize, c: Option<char>) -> char {
        self.examined = self.examined.max(at + c.map_or(0, char::len_utf8));
        c.unwrap_or(EOF_CHAR)
    }

    pub(crate) fn token_end(&self) -> usize {
        self.marked_end.unwrap_or(self.offset)
    }

    /// Number of bytes past `end` the scanner looked at.
    pub(crate) fn lookahead_past(&self, end: usize) -> usize {
        self.examined.saturating_sub(end)
    }
}
