//! Positioned node handles over the green tree.

use std::fmt;
use std::slice;

use text_size::{TextRange, TextSize};

use crate::{Length, Point, Preorder, Subtree, Symbol, Tree, TreeCursor, WalkEvent};

/// Node handle tied to the lifetime of the tree.
///
/// Hidden symbols never surface as `SyntaxNode`s: their visible descendants
/// are reported as children of the nearest visible ancestor.
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t Tree,
    green: &'t Subtree,
    start: Length,
}

impl<'t> SyntaxNode<'t> {
    #[inline]
    pub(crate) fn new(tree: &'t Tree, green: &'t Subtree, start: Length) -> Self {
        Self { tree, green, start }
    }

    /// Returns the tree this node belongs to.
    #[inline]
    pub fn tree(self) -> &'t Tree {
        self.tree
    }

    /// Returns the underlying green subtree.
    #[inline]
    pub fn green(self) -> &'t Subtree {
        self.green
    }

    /// Returns this node's symbol.
    #[inline]
    pub fn kind(self) -> Symbol {
        self.green.symbol()
    }

    /// Returns the name of this node's symbol.
    #[inline]
    pub fn kind_name(self) -> &'t str {
        self.tree.symbols().name(self.kind())
    }

    #[inline]
    pub fn is_named(self) -> bool {
        self.tree.symbols().is_named(self.kind())
    }

    #[inline]
    pub fn is_extra(self) -> bool {
        self.green.is_extra()
    }

    #[inline]
    pub fn is_error(self) -> bool {
        self.green.is_error()
    }

    #[inline]
    pub fn has_error(self) -> bool {
        self.green.has_error()
    }

    #[inline]
    pub fn has_changes(self) -> bool {
        self.green.has_changes()
    }

    /// Returns the byte range.
    #[inline]
    pub fn range(self) -> TextRange {
        TextRange::at(self.start.bytes, self.green.len())
    }

    #[inline]
    pub fn start_byte(self) -> TextSize {
        self.start.bytes
    }

    #[inline]
    pub fn end_byte(self) -> TextSize {
        self.start.bytes + self.green.len()
    }

    #[inline]
    pub fn start_point(self) -> Point {
        self.start.extent
    }

    #[inline]
    pub fn end_point(self) -> Point {
        (self.start + self.green.size()).extent
    }

    /// Returns the source text of this node.
    #[inline]
    pub fn text(self, source: &'t str) -> &'t str {
        &source[self.range()]
    }

    /// Returns the number of visible children.
    #[inline]
    pub fn child_count(self) -> usize {
        self.green.visible_child_count() as usize
    }

    /// Returns the visible child at `index`.
    pub fn child(self, index: usize) -> Option<Self> {
        self.children().nth(index)
    }

    /// Iterates over the visible children.
    #[inline]
    pub fn children(self) -> Children<'t> {
        Children::new(self)
    }

    /// Returns the named child at `index`, counting named children only.
    pub fn named_child(self, index: usize) -> Option<Self> {
        self.children().filter(|child| child.is_named()).nth(index)
    }

    /// Returns the number of named children.
    pub fn named_child_count(self) -> usize {
        self.children().filter(|child| child.is_named()).count()
    }

    /// Returns the visible parent node, found by descending from the root.
    pub fn parent(self) -> Option<Self> {
        let root = self.tree.root();
        if self == root {
            return None;
        }
        find_parent(self.tree, self)
    }

    /// Returns an iterator of ancestor nodes, starting from the parent.
    pub fn ancestors(self) -> impl Iterator<Item = Self> + 't {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn next_sibling(self) -> Option<Self> {
        let mut siblings = self.parent()?.children();
        siblings.find(|sibling| *sibling == self)?;
        siblings.next()
    }

    pub fn prev_sibling(self) -> Option<Self> {
        let mut prev = None;
        for sibling in self.parent()?.children() {
            if sibling == self {
                return prev;
            }
            prev = Some(sibling);
        }
        None
    }

    /// Returns the smallest visible descendant covering `range`.
    pub fn descendant_for_byte_range(self, range: TextRange) -> Option<Self> {
        if !self.range().contains_range(range) {
            return None;
        }
        let mut node = self;
        while let Some(child) = node.children().find(|child| {
            let child_range = child.range();
            child_range.contains_range(range)
                && (!range.is_empty() || child_range.contains(range.start()))
        }) {
            node = child;
        }
        Some(node)
    }

    /// Returns a cursor positioned on this node.
    #[inline]
    pub fn walk(self) -> TreeCursor<'t> {
        TreeCursor::new(self)
    }

    /// Iterates over this node and its visible descendants.
    #[inline]
    pub fn preorder(self) -> Preorder<'t> {
        Preorder::new(self)
    }

    /// Renders this node as an S-expression of named nodes.
    pub fn to_sexp(self) -> String {
        let mut out = String::new();
        let mut preorder = self.preorder();
        while let Some(event) = preorder.next() {
            match event {
                WalkEvent::Enter(node) if node == self || node.is_named() => {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push('(');
                    out.push_str(node.kind_name());
                }
                WalkEvent::Enter(_) => preorder.skip_subtree(),
                WalkEvent::Leave(node) if node == self || node.is_named() => out.push(')'),
                WalkEvent::Leave(_) => {}
            }
        }
        out
    }
}

/// Finds the nearest visible ancestor of `target`, searching depth first
/// from the root. Zero-width targets may sit at the edge of several
/// candidates, so the search backtracks.
fn find_parent<'t>(tree: &'t Tree, target: SyntaxNode<'t>) -> Option<SyntaxNode<'t>> {
    let target_range = target.range();
    let mut pending = vec![(tree.green(), Length::ZERO, tree.root())];
    while let Some((green, start, visible_ancestor)) = pending.pop() {
        let mark = pending.len();
        let mut offset = start;
        for child in green.children() {
            let child_start = offset;
            offset += child.size();
            if child_start.bytes > target_range.start() {
                break;
            }
            if offset.bytes < target_range.end() {
                continue;
            }
            if child_start.bytes == target_range.start() && child.ptr_eq(target.green) {
                return Some(visible_ancestor);
            }
            if child.is_leaf() {
                continue;
            }
            let ancestor = if tree.symbols().is_visible(child.symbol()) {
                SyntaxNode::new(tree, child, child_start)
            } else {
                visible_ancestor
            };
            pending.push((child, child_start, ancestor));
        }
        pending[mark..].reverse();
    }
    None
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree)
            && self.green.ptr_eq(other.green)
            && self.start.bytes == other.start.bytes
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.kind_name(), self.range())
    }
}

/// Iterator over the visible children of a node.
#[derive(Clone)]
pub struct Children<'t> {
    tree: &'t Tree,
    stack: Vec<(slice::Iter<'t, Subtree>, Length)>,
}

impl<'t> Children<'t> {
    fn new(parent: SyntaxNode<'t>) -> Self {
        Self { tree: parent.tree, stack: vec![(parent.green.children().iter(), parent.start)] }
    }
}

impl<'t> Iterator for Children<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (children, offset) = self.stack.last_mut()?;
            let Some(child) = children.next() else {
                self.stack.pop();
                continue;
            };
            let start = *offset;
            *offset += child.size();
            if self.tree.symbols().is_visible(child.symbol()) {
                return Some(SyntaxNode::new(self.tree, child, start));
            }
            if !child.children().is_empty() {
                self.stack.push((child.children().iter(), start));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use expect_test::expect;
    use text_size::TextRange;

    use crate::{Builder, Symbol, SymbolInfo, SymbolTable, Tree};

    const WORD: Symbol = Symbol::new(1);

    /// `list(word, space, _pair(word, word))` over `"a bcd"`.
    pub(crate) fn tree() -> Tree {
        let symbols = SymbolTable::new(
            "words",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("word", true, true),
                SymbolInfo::new("space", true, false),
                SymbolInfo::new("_pair", false, true),
                SymbolInfo::new("list", true, true),
            ],
        );
        let mut builder = Builder::new(Arc::new(symbols));
        builder.start_node(Symbol::new(4));
        builder.token(WORD, "a");
        builder.extra(Symbol::new(2), " ");
        builder.start_node(Symbol::new(3));
        builder.token(WORD, "b");
        builder.token(WORD, "cd");
        builder.finish_node();
        builder.finish_node();
        builder.finish().0
    }

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(start.into(), end.into())
    }

    #[test]
    fn hidden_nodes_are_flattened() {
        let tree = tree();
        let root = tree.root();

        assert_eq!(root.child_count(), 4);
        assert_eq!(root.named_child_count(), 3);
        assert_eq!(root.named_child(1).map(|node| node.range()), Some(range(2, 3)));
        assert_eq!(tree.to_sexp(), "(list (word) (word) (word))");
        expect![[r#"
            list@0..5
              word@0..1 "a"
              space@1..2 " "
              word@2..3 "b"
              word@3..5 "cd"
        "#]]
        .assert_eq(&tree.debug_dump("a bcd"));
    }

    #[test]
    fn relatives_are_found_through_hidden_nodes() {
        let tree = tree();
        let root = tree.root();
        let b = root.child(2).unwrap();

        assert_eq!(b.parent(), Some(root));
        assert_eq!(root.parent(), None);
        assert_eq!(b.next_sibling().map(|node| node.range()), Some(range(3, 5)));
        assert!(b.prev_sibling().unwrap().is_extra());
        assert_eq!(root.child(3).unwrap().next_sibling(), None);
        assert_eq!(b.ancestors().count(), 1);
    }

    #[test]
    fn smallest_descendant_covers_the_range() {
        let tree = tree();
        let root = tree.root();

        assert_eq!(root.descendant_for_byte_range(range(3, 4)).map(|node| node.range()), Some(range(3, 5)));
        assert_eq!(root.descendant_for_byte_range(range(2, 4)), Some(root));
        assert_eq!(root.descendant_for_byte_range(range(0, 0)).map(|node| node.range()), Some(range(0, 1)));
        assert_eq!(root.descendant_for_byte_range(range(4, 9)), None);
    }
}
