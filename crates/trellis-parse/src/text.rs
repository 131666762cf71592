use crate::ParseError;

/// Source of the text to parse, read in chunks.
pub trait TextProvider {
    /// Returns the chunk starting at byte `offset`, or `None` past the end.
    fn read(&mut self, offset: usize) -> Option<&[u8]>;
}

impl TextProvider for &str {
    fn read(&mut self, offset: usize) -> Option<&[u8]> {
        self.as_bytes().get(offset..).filter(|rest| !rest.is_empty())
    }
}

impl TextProvider for String {
    fn read(&mut self, offset: usize) -> Option<&[u8]> {
        self.as_bytes().get(offset..).filter(|rest| !rest.is_empty())
    }
}

/// Collects every chunk of `provider` into one string.
pub(crate) fn read_to_string(mut provider: impl TextProvider) -> Result<String, ParseError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = provider.read(bytes.len()) {
        if chunk.is_empty() {
            break;
        }
        bytes.extend_from_slice(chunk);
    }
    String::from_utf8(bytes)
        .map_err(|error| ParseError::InvalidUtf8 { valid_up_to: error.utf8_error().valid_up_to() })
}
