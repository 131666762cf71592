//! Local error recovery: skip tokens forward or pop entries backward until
//! some state accepts a token, and wrap everything in between in an ERROR
//! node.

use text_size::TextRange;
use trellis_lexer::{Lexed, Lexer, Token};
use trellis_table::Language;
use trellis_tree::{Leaf, Length, NodeSpec, StateId, Subtree, Symbol};

use super::{Candidate, Engine, Lookahead, end_token};

const ERROR_COST_PER_RECOVERY: u32 = 500;
const ERROR_COST_PER_SKIPPED_TREE: u32 = 100;
const ERROR_COST_PER_SKIPPED_LINE: u32 = 30;
const ERROR_COST_PER_SKIPPED_CHAR: u32 = 1;

/// Builds an ERROR node over `children`, priced by what it swallows.
pub(super) fn error_node(
    language: &Language,
    children: Vec<Subtree>,
    state: StateId,
    fragile: bool,
) -> Subtree {
    let skipped = children.iter().filter(|child| !child.is_extra()).count() as u32;
    let size: Length = children.iter().map(Subtree::size).sum();
    let error_cost = ERROR_COST_PER_RECOVERY
        + ERROR_COST_PER_SKIPPED_TREE * skipped
        + ERROR_COST_PER_SKIPPED_LINE * size.extent.row
        + ERROR_COST_PER_SKIPPED_CHAR * u32::from(size.bytes);
    Subtree::node(
        Symbol::ERROR,
        children,
        NodeSpec { parse_state: state, error_cost, fragile, ..NodeSpec::default() },
        language.symbols(),
    )
}

impl<L: Lexer> Engine<'_, L> {
    /// Recovers the only remaining version from a token it has no action
    /// for.
    pub(super) fn recover(&mut self, index: usize) {
        let language = self.language;
        let version = &mut self.versions[index];
        let position = version.position();
        let Some(first) = version.lookahead.take().and_then(|lookahead| into_token(lookahead, position))
        else {
            return;
        };

        let mut tokens = vec![first];
        let mut real = usize::from(!language.is_extra(first.symbol));
        let mut end = Length::new(first.range.end(), first.end_point);
        let mut at_end = first.symbol == Symbol::END;
        while !at_end && real < self.options.recovery_lookahead.max(1) {
            match self.lexer.next_token(StateId::ERROR_RECOVERY, end) {
                Lexed::Token(token) => {
                    real += usize::from(!language.is_extra(token.symbol));
                    end = Length::new(token.range.end(), token.end_point);
                    tokens.push(token);
                    if token.range.is_empty() {
                        break;
                    }
                }
                Lexed::EndOfInput => {
                    tokens.push(end_token(end, language.recovery_lex_mode()));
                    at_end = true;
                }
            }
        }

        // A second recovery at the same spot must skip something, or it could
        // pop forever.
        let must_skip = version.recovered_at == Some(first.range.start());
        let max_depth = version.stack.depth().min(self.options.max_recovery_depth);
        let stack = &version.stack;
        let found = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| !language.is_extra(token.symbol))
            .enumerate()
            .filter(|&(skipped, _)| !(must_skip && skipped == 0))
            .find_map(|(skipped, (item, token))| {
                (0..=max_depth)
                    .filter(|&depth| skipped > 0 || depth > 0)
                    .find(|&depth| language.has_actions(stack.state_at_depth(depth), token.symbol))
                    .map(|depth| (item, depth))
            });

        match found {
            Some((item, depth)) => {
                let mut popped = Vec::with_capacity(depth);
                for _ in 0..depth {
                    popped.extend(version.stack.pop());
                }
                popped.reverse();
                let mut children = flatten(popped);
                children.extend(tokens[..item].iter().map(|token| skipped_leaf(language, token)));

                let state = version.stack.state();
                let resume = tokens[item];
                tracing::debug!(
                    at = ?position.bytes,
                    popped = depth,
                    skipped = item,
                    ?state,
                    resume = ?resume.symbol,
                    "recovered"
                );
                version.stack.push(state, error_node(language, children, state, false));
                version.lookahead = Some(Lookahead::Token(resume));
                version.lex_state = state;
                version.recovered_at = Some(resume.range.start());
                version.recovering = true;
            }
            None if at_end => {
                tracing::debug!(at = ?position.bytes, "no recovery point before the end; wrapping everything");
                let mut children = flatten(version.stack.subtrees());
                children.extend(
                    tokens.iter().filter(|token| token.symbol != Symbol::END).map(|token| skipped_leaf(language, token)),
                );
                let root = error_node(language, children, language.start_state(), false);
                let version = self.versions.remove(index);
                self.accepted.push(Candidate { root, path: version.path });
            }
            None => {
                tracing::debug!(at = ?position.bytes, skipped = tokens.len(), "no recovery point; skipping ahead");
                let state = version.stack.state();
                let children = tokens.iter().map(|token| skipped_leaf(language, token)).collect();
                version.stack.push(state, error_node(language, children, state, false));
                version.lex_state = state;
                version.recovered_at = Some(end.bytes);
                version.recovering = true;
            }
        }
    }
}

/// Splices the children of nested ERROR nodes into their parent list.
fn flatten(subtrees: Vec<Subtree>) -> Vec<Subtree> {
    let mut flat = Vec::with_capacity(subtrees.len());
    for subtree in subtrees {
        if subtree.is_error() && !subtree.is_leaf() {
            flat.extend(subtree.children().iter().cloned());
        } else {
            flat.push(subtree);
        }
    }
    flat
}

fn skipped_leaf(language: &Language, token: &Token) -> Subtree {
    Subtree::leaf(Leaf {
        symbol: token.symbol,
        size: token.size(),
        lookahead_bytes: token.lookahead_bytes,
        parse_state: StateId::ERROR_RECOVERY,
        lex_mode: token.lex_mode,
        extra: language.is_extra(token.symbol),
        fragile: false,
    })
}

fn into_token(lookahead: Lookahead, position: Length) -> Option<Token> {
    match lookahead {
        Lookahead::Token(token) => Some(token),
        Lookahead::Reused(chain) => {
            let leaf = chain.last()?;
            Some(Token {
                symbol: leaf.symbol(),
                range: TextRange::at(position.bytes, leaf.len()),
                start_point: position.extent,
                end_point: (position + leaf.size()).extent,
                lookahead_bytes: leaf.lookahead_bytes(),
                lex_mode: leaf.first_leaf().lex_mode,
            })
        }
    }
}
