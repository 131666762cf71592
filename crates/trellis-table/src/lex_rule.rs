//! Compiled lexical rules.

use std::fmt;

use regex_automata::dfa::{Automaton, StartKind, dense};
use regex_automata::{Anchored, Input, MatchKind};
use trellis_tree::Symbol;

/// A terminal together with the pattern that produces it.
pub struct LexRule {
    symbol: Symbol,
    pattern: Pattern,
}

enum Pattern {
    Literal(Box<[u8]>),
    Regex(Box<dense::DFA<Vec<u32>>>),
}

/// Outcome of running one rule at a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleMatch {
    /// Length of the longest match, if any.
    pub len: Option<usize>,
    /// Number of bytes from the start position the rule looked at.
    pub examined: usize,
}

impl LexRule {
    pub(crate) fn literal(symbol: Symbol, text: &str) -> Self {
        Self { symbol, pattern: Pattern::Literal(text.as_bytes().into()) }
    }

    pub(crate) fn regex(symbol: Symbol, pattern: &str) -> Result<Self, String> {
        let dfa = dense::Builder::new()
            .configure(
                dense::Config::new().start_kind(StartKind::Anchored).match_kind(MatchKind::All),
            )
            .build(pattern)
            .map_err(|err| err.to_string())?;
        Ok(Self { symbol, pattern: Pattern::Regex(Box::new(dfa)) })
    }

    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Finds the longest match starting exactly at `start`.
    pub fn longest_match(&self, text: &[u8], start: usize) -> RuleMatch {
        let Some(rest) = text.get(start..) else {
            return RuleMatch { len: None, examined: 0 };
        };
        match &self.pattern {
            Pattern::Literal(literal) => {
                let common = literal.iter().zip(rest).take_while(|(a, b)| a == b).count();
                if common == literal.len() {
                    RuleMatch { len: Some(common), examined: common }
                } else {
                    RuleMatch { len: None, examined: (common + 1).min(rest.len()) }
                }
            }
            Pattern::Regex(dfa) => longest_regex_match(dfa, text, start),
        }
    }
}

/// Steps the DFA one byte at a time. Matches are reported one byte late, so
/// a match state after byte `i` means a match of length `i`.
fn longest_regex_match(dfa: &dense::DFA<Vec<u32>>, text: &[u8], start: usize) -> RuleMatch {
    let input = Input::new(text).range(start..).anchored(Anchored::Yes);
    let Ok(mut state) = dfa.start_state_forward(&input) else {
        return RuleMatch { len: None, examined: 0 };
    };

    let mut len = None;
    let rest = &text[start..];
    for (offset, &byte) in rest.iter().enumerate() {
        state = dfa.next_state(state, byte);
        if dfa.is_match_state(state) {
            len = Some(offset);
        } else if dfa.is_dead_state(state) || dfa.is_quit_state(state) {
            return RuleMatch { len, examined: offset + 1 };
        }
    }
    state = dfa.next_eoi_state(state);
    if dfa.is_match_state(state) {
        len = Some(rest.len());
    }
    RuleMatch { len, examined: rest.len() }
}

impl fmt::Debug for LexRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pattern {
            Pattern::Literal(literal) => {
                write!(f, "{:?} <- {:?}", self.symbol, String::from_utf8_lossy(literal))
            }
            Pattern::Regex(_) => write!(f, "{:?} <- /regex/", self.symbol),
        }
    }
}
