//! Persistent parse stacks. Forked versions share their common prefix.

use std::rc::Rc;

use trellis_tree::{Length, StateId, Subtree};

struct Node {
    /// State after pushing `subtree`.
    state: StateId,
    subtree: Subtree,
    prev: Option<Rc<Node>>,
    /// Position after `subtree`.
    end: Length,
    depth: usize,
    error_cost: u32,
    dynamic_precedence: i32,
}

#[derive(Clone)]
pub(crate) struct Stack {
    top: Option<Rc<Node>>,
    base: StateId,
}

impl Stack {
    pub(crate) fn new(base: StateId) -> Self {
        Self { top: None, base }
    }

    pub(crate) fn state(&self) -> StateId {
        self.top.as_ref().map_or(self.base, |node| node.state)
    }

    pub(crate) fn position(&self) -> Length {
        self.top.as_ref().map_or(Length::ZERO, |node| node.end)
    }

    pub(crate) fn depth(&self) -> usize {
        self.top.as_ref().map_or(0, |node| node.depth)
    }

    /// Total error cost of the subtrees on the stack.
    pub(crate) fn error_cost(&self) -> u32 {
        self.top.as_ref().map_or(0, |node| node.error_cost)
    }

    /// Total dynamic precedence of the subtrees on the stack.
    pub(crate) fn dynamic_precedence(&self) -> i32 {
        self.top.as_ref().map_or(0, |node| node.dynamic_precedence)
    }

    pub(crate) fn push(&mut self, state: StateId, subtree: Subtree) {
        let prev = self.top.take();
        let (end, depth, error_cost, dynamic_precedence) = match &prev {
            Some(prev) => (prev.end, prev.depth, prev.error_cost, prev.dynamic_precedence),
            None => (Length::ZERO, 0, 0, 0),
        };
        self.top = Some(Rc::new(Node {
            state,
            end: end + subtree.size(),
            depth: depth + 1,
            error_cost: error_cost + subtree.error_cost(),
            dynamic_precedence: dynamic_precedence + subtree.dynamic_precedence(),
            subtree,
            prev,
        }));
    }

    pub(crate) fn pop(&mut self) -> Option<Subtree> {
        let node = self.top.take()?;
        self.top = node.prev.clone();
        Some(node.subtree.clone())
    }

    /// Returns the state exposed after popping `depth` entries.
    pub(crate) fn state_at_depth(&self, depth: usize) -> StateId {
        let mut node = self.top.as_ref();
        for _ in 0..depth {
            node = node.and_then(|node| node.prev.as_ref());
        }
        node.map_or(self.base, |node| node.state)
    }

    /// Subtrees from the bottom of the stack to the top.
    pub(crate) fn subtrees(&self) -> Vec<Subtree> {
        let mut subtrees = Vec::with_capacity(self.depth());
        let mut node = self.top.as_ref();
        while let Some(current) = node {
            subtrees.push(current.subtree.clone());
            node = current.prev.as_ref();
        }
        subtrees.reverse();
        subtrees
    }

    /// Returns `true` if both stacks went through the same states at the same
    /// positions.
    pub(crate) fn same_states(&self, other: &Self) -> bool {
        if self.base != other.base || self.depth() != other.depth() {
            return false;
        }
        let (mut a, mut b) = (self.top.as_ref(), other.top.as_ref());
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) if Rc::ptr_eq(x, y) => return true,
                (Some(x), Some(y)) if x.state == y.state && x.end.bytes == y.end.bytes => {
                    a = x.prev.as_ref();
                    b = y.prev.as_ref();
                }
                _ => return false,
            }
        }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        // Unlink iteratively; deep stacks would overflow a recursive drop.
        let mut next = self.top.take();
        while let Some(node) = next {
            match Rc::try_unwrap(node) {
                Ok(mut node) => next = node.prev.take(),
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trellis_tree::{Leaf, Symbol, SymbolInfo, SymbolTable, TextSize};

    use super::*;

    fn leaf(len: u32, error: bool) -> Subtree {
        let symbol = if error { Symbol::ERROR } else { Symbol::new(1) };
        Subtree::leaf(Leaf {
            symbol,
            size: Length::new(TextSize::new(len), trellis_tree::Point::new(0, len)),
            lookahead_bytes: 0,
            parse_state: StateId::default(),
            lex_mode: 0,
            extra: false,
            fragile: false,
        })
    }

    #[test]
    fn forks_share_their_prefix() {
        let mut stack = Stack::new(StateId::new(0));
        stack.push(StateId::new(1), leaf(2, false));
        stack.push(StateId::new(2), leaf(1, false));

        let mut fork = stack.clone();
        assert!(stack.same_states(&fork));
        fork.pop();
        fork.push(StateId::new(3), leaf(1, false));

        assert!(!stack.same_states(&fork));
        assert_eq!(fork.position(), stack.position());
        assert_eq!(fork.state_at_depth(1), StateId::new(1));
        assert_eq!(fork.state_at_depth(2), StateId::new(0));
        assert_eq!(fork.state_at_depth(5), StateId::new(0));
    }

    #[test]
    fn tracks_totals() {
        let symbols = Arc::new(SymbolTable::new("t", 1, vec![SymbolInfo::new("end", false, false)]));
        let error = Subtree::node(
            Symbol::ERROR,
            vec![leaf(3, true)],
            trellis_tree::NodeSpec { error_cost: 7, ..Default::default() },
            &symbols,
        );
        let mut stack = Stack::new(StateId::new(0));
        stack.push(StateId::new(1), leaf(2, false));
        stack.push(StateId::new(1), error);

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.error_cost(), 7);
        assert_eq!(stack.position().bytes, TextSize::new(5));
        assert_eq!(stack.subtrees().len(), 2);

        assert!(stack.pop().is_some_and(|subtree| subtree.is_error()));
        assert_eq!(stack.error_cost(), 0);
        assert_eq!(stack.state(), StateId::new(1));
    }
}
