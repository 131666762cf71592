use crate::SyntaxNode;
use crate::syntax::Children;

/// Stateful walker over the visible nodes below a starting node.
///
/// Moving up is free: the cursor keeps the path it came down on.
#[derive(Clone)]
pub struct TreeCursor<'t> {
    current: SyntaxNode<'t>,
    /// Ancestors of `current` with the siblings that follow it.
    stack: Vec<(SyntaxNode<'t>, Children<'t>)>,
}

impl<'t> TreeCursor<'t> {
    pub(crate) fn new(node: SyntaxNode<'t>) -> Self {
        Self { current: node, stack: Vec::new() }
    }

    /// Returns the node the cursor is on.
    #[inline]
    pub fn node(&self) -> SyntaxNode<'t> {
        self.current
    }

    /// Returns how far below the starting node the cursor is.
    #[inline]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn goto_first_child(&mut self) -> bool {
        let mut children = self.current.children();
        match children.next() {
            Some(first) => {
                self.stack.push((self.current, children));
                self.current = first;
                true
            }
            None => false,
        }
    }

    pub fn goto_next_sibling(&mut self) -> bool {
        let Some((_, siblings)) = self.stack.last_mut() else {
            return false;
        };
        match siblings.next() {
            Some(next) => {
                self.current = next;
                true
            }
            None => false,
        }
    }

    pub fn goto_parent(&mut self) -> bool {
        match self.stack.pop() {
            Some((parent, _)) => {
                self.current = parent;
                true
            }
            None => false,
        }
    }
}

/// An event produced while walking a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent<T> {
    Enter(T),
    Leave(T),
}

impl<T> WalkEvent<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> WalkEvent<U> {
        match self {
            Self::Enter(it) => WalkEvent::Enter(f(it)),
            Self::Leave(it) => WalkEvent::Leave(f(it)),
        }
    }
}

/// Preorder traversal emitting `Enter` and `Leave` events.
pub struct Preorder<'t> {
    cursor: TreeCursor<'t>,
    next: Option<WalkEvent<SyntaxNode<'t>>>,
}

impl<'t> Preorder<'t> {
    pub(crate) fn new(start: SyntaxNode<'t>) -> Self {
        Self { cursor: start.walk(), next: Some(WalkEvent::Enter(start)) }
    }

    /// Skips the subtree of the node that was just entered.
    pub fn skip_subtree(&mut self) {
        if let Some(WalkEvent::Enter(_)) = self.next {
            self.cursor.goto_parent();
            self.next = Some(WalkEvent::Leave(self.cursor.node()));
        }
    }
}

impl<'t> Iterator for Preorder<'t> {
    type Item = WalkEvent<SyntaxNode<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        let event = self.next.take()?;
        self.next = match event {
            WalkEvent::Enter(_) => {
                if self.cursor.goto_first_child() {
                    Some(WalkEvent::Enter(self.cursor.node()))
                } else {
                    Some(WalkEvent::Leave(self.cursor.node()))
                }
            }
            WalkEvent::Leave(_) => {
                if self.cursor.depth() == 0 {
                    None
                } else if self.cursor.goto_next_sibling() {
                    Some(WalkEvent::Enter(self.cursor.node()))
                } else {
                    self.cursor.goto_parent();
                    Some(WalkEvent::Leave(self.cursor.node()))
                }
            }
        };
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::WalkEvent;
    use crate::syntax::tests::tree;

    #[test]
    fn cursor_moves_over_visible_nodes() {
        let tree = tree();
        let mut cursor = tree.root().walk();

        assert!(!cursor.goto_next_sibling());
        assert!(cursor.goto_first_child());
        assert_eq!(cursor.node().kind_name(), "word");
        let mut names = vec![cursor.node().kind_name()];
        while cursor.goto_next_sibling() {
            names.push(cursor.node().kind_name());
        }
        assert_eq!(names, ["word", "space", "word", "word"]);
        assert_eq!(cursor.depth(), 1);
        assert!(!cursor.goto_first_child());
        assert!(cursor.goto_parent());
        assert!(!cursor.goto_parent());
        assert_eq!(cursor.node(), tree.root());
    }

    #[test]
    fn preorder_enters_and_leaves_every_node() {
        let tree = tree();
        let events: Vec<_> = tree
            .root()
            .preorder()
            .map(|event| event.map(|node| u32::from(node.start_byte())))
            .collect();

        assert_eq!(events.len(), 10);
        assert_eq!(events[0], WalkEvent::Enter(0));
        assert_eq!(events[1], WalkEvent::Enter(0));
        assert_eq!(events[2], WalkEvent::Leave(0));
        assert_eq!(events[9], WalkEvent::Leave(0));
    }

    #[test]
    fn skipped_subtrees_are_left_immediately() {
        let tree = tree();
        let mut preorder = tree.root().preorder();
        assert!(matches!(preorder.next(), Some(WalkEvent::Enter(_))));
        preorder.skip_subtree();
        assert!(matches!(preorder.next(), Some(WalkEvent::Leave(node)) if node == tree.root()));
        assert_eq!(preorder.next(), None);
    }
}
