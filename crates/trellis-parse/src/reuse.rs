//! Walks an edited tree alongside the parser, offering old subtrees that
//! start at the parser's position.

use text_size::TextSize;
use trellis_tree::{Subtree, Tree};

/// Returns `true` if `subtree` cannot be reused as is.
pub(crate) fn is_damaged(subtree: &Subtree) -> bool {
    subtree.has_changes()
        || subtree.has_error()
        || subtree.is_fragile()
        || subtree.is_empty()
        || subtree.is_error()
}

struct Frame {
    node: Subtree,
    /// Index of the child under examination.
    index: usize,
    child_start: TextSize,
}

/// Forward-only cursor over the old tree.
pub(crate) struct ReuseCursor {
    frames: Vec<Frame>,
    last: TextSize,
}

impl ReuseCursor {
    pub(crate) fn new(tree: &Tree) -> Self {
        let root = Frame { node: tree.green().clone(), index: 0, child_start: TextSize::new(0) };
        Self { frames: vec![root], last: TextSize::new(0) }
    }

    /// Returns the old subtrees starting at `position`, outermost first,
    /// descending through first children down to a leaf. The root itself is
    /// never offered.
    pub(crate) fn candidates(&mut self, position: TextSize) -> Vec<Subtree> {
        if position < self.last {
            return Vec::new();
        }
        self.last = position;

        loop {
            let Some(frame) = self.frames.last_mut() else { return Vec::new() };
            let Some(child) = frame.node.children().get(frame.index).cloned() else {
                if let Some(done) = self.frames.pop()
                    && let Some(parent) = self.frames.last_mut()
                {
                    parent.child_start += done.node.len();
                    parent.index += 1;
                }
                continue;
            };

            let start = frame.child_start;
            let end = start + child.len();
            if end <= position {
                frame.child_start = end;
                frame.index += 1;
            } else if start > position {
                return Vec::new();
            } else if start == position {
                return first_descendants(child);
            } else {
                self.frames.push(Frame { node: child, index: 0, child_start: start });
            }
        }
    }
}

fn first_descendants(subtree: Subtree) -> Vec<Subtree> {
    let mut chain = vec![subtree];
    while let Some(first) = chain.last().and_then(|last| last.children().first()).cloned() {
        chain.push(first);
    }
    chain
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trellis_tree::{Builder, Symbol, SymbolInfo, SymbolTable, TextSize};

    use super::ReuseCursor;

    fn tree() -> trellis_tree::Tree {
        let symbols = SymbolTable::new(
            "t",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("word", true, true),
                SymbolInfo::new("pair", true, true),
                SymbolInfo::new("root", true, true),
            ],
        );
        let mut builder = Builder::new(Arc::new(symbols));
        builder.start_node(Symbol::new(3));
        builder.start_node(Symbol::new(2));
        builder.token(Symbol::new(1), "ab");
        builder.token(Symbol::new(1), "c");
        builder.finish_node();
        builder.token(Symbol::new(1), "de");
        builder.finish_node();
        builder.finish().0
    }

    fn describe(chain: &[trellis_tree::Subtree]) -> Vec<(u16, u32)> {
        chain.iter().map(|subtree| (subtree.symbol().raw(), u32::from(subtree.len()))).collect()
    }

    #[test]
    fn offers_every_subtree_starting_at_a_position() {
        let tree = tree();
        let mut cursor = ReuseCursor::new(&tree);

        assert_eq!(describe(&cursor.candidates(TextSize::new(0))), [(2, 3), (1, 2)]);
        assert_eq!(describe(&cursor.candidates(TextSize::new(0))), [(2, 3), (1, 2)]);
        assert!(cursor.candidates(TextSize::new(1)).is_empty());
        assert_eq!(describe(&cursor.candidates(TextSize::new(2))), [(1, 1)]);
        assert_eq!(describe(&cursor.candidates(TextSize::new(3))), [(1, 2)]);
        assert!(cursor.candidates(TextSize::new(5)).is_empty());
    }

    #[test]
    fn never_moves_backwards() {
        let tree = tree();
        let mut cursor = ReuseCursor::new(&tree);
        assert_eq!(describe(&cursor.candidates(TextSize::new(3))), [(1, 2)]);
        assert!(cursor.candidates(TextSize::new(0)).is_empty());
    }
}
