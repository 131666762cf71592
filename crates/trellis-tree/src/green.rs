//! Shared, immutable subtrees.

use std::fmt;

use text_size::TextSize;
use triomphe::Arc;

use crate::{Length, StateId, Symbol, SymbolTable};

/// The first leaf of a subtree, as seen by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FirstLeaf {
    pub symbol: Symbol,
    /// Lex mode the leaf was scanned in.
    pub lex_mode: u16,
}

/// A reference counted node or token of the green tree.
///
/// Subtrees carry no absolute position. Equality is structural: symbols,
/// sizes, extra flags and children are compared, parse bookkeeping is not.
#[derive(Clone)]
pub struct Subtree(Arc<SubtreeData>);

#[derive(Clone)]
struct SubtreeData {
    symbol: Symbol,
    size: Length,
    /// Bytes past the end that influenced how this subtree was built.
    lookahead_bytes: u32,
    parse_state: StateId,
    first_leaf: FirstLeaf,
    error_cost: u32,
    dynamic_precedence: i32,
    visible_child_count: u32,
    flags: Flags,
    children: Box<[Subtree]>,
}

impl Drop for SubtreeData {
    fn drop(&mut self) {
        if self.children.is_empty() {
            return;
        }
        // Unlink uniquely owned descendants one at a time; deep trees would
        // otherwise overflow the stack.
        let mut pending = std::mem::take(&mut self.children).into_vec();
        while let Some(mut subtree) = pending.pop() {
            if let Some(data) = Arc::get_mut(&mut subtree.0) {
                pending.extend(std::mem::take(&mut data.children).into_vec());
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Flags {
    leaf: bool,
    extra: bool,
    fragile: bool,
    has_changes: bool,
    has_error: bool,
}

/// Description of a token leaf.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub symbol: Symbol,
    pub size: Length,
    pub lookahead_bytes: u32,
    /// State the leaf is shifted in.
    pub parse_state: StateId,
    pub lex_mode: u16,
    pub extra: bool,
    pub fragile: bool,
}

/// Bookkeeping for a nonterminal node; everything else is derived from the
/// children.
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// State exposed below the node's first child.
    pub parse_state: StateId,
    /// The rule's own dynamic precedence.
    pub dynamic_precedence: i32,
    /// Extra cost on top of the children's, used for error nodes.
    pub error_cost: u32,
    /// Bytes past the end of the node covered by the lookahead token that
    /// triggered the reduction.
    pub lookahead_bytes: u32,
    pub fragile: bool,
    /// First leaf to record when the node has no children.
    pub empty_first_leaf: Option<FirstLeaf>,
}

impl Subtree {
    /// Creates a token leaf.
    pub fn leaf(leaf: Leaf) -> Self {
        let Leaf { symbol, size, lookahead_bytes, parse_state, lex_mode, extra, fragile } = leaf;
        Self(Arc::new(SubtreeData {
            symbol,
            size,
            lookahead_bytes,
            parse_state,
            first_leaf: FirstLeaf { symbol, lex_mode },
            error_cost: 0,
            dynamic_precedence: 0,
            visible_child_count: 0,
            flags: Flags {
                leaf: true,
                extra,
                fragile,
                has_changes: false,
                has_error: symbol.is_error(),
            },
            children: Box::new([]),
        }))
    }

    /// Creates a nonterminal node over `children`.
    pub fn node(
        symbol: Symbol,
        children: Vec<Self>,
        spec: NodeSpec,
        symbols: &SymbolTable,
    ) -> Self {
        let mut size = Length::ZERO;
        let mut lookahead_end = TextSize::new(0);
        let mut error_cost = spec.error_cost;
        let mut dynamic_precedence = spec.dynamic_precedence;
        let mut visible_child_count = 0;
        let mut fragile = spec.fragile;
        let mut has_error = symbol.is_error();

        for child in &children {
            size += child.size();
            lookahead_end = lookahead_end.max(size.bytes + TextSize::new(child.lookahead_bytes()));
            error_cost += child.error_cost();
            dynamic_precedence += child.dynamic_precedence();
            visible_child_count += if symbols.is_visible(child.symbol()) {
                1
            } else {
                child.visible_child_count()
            };
            fragile |= child.is_fragile();
            has_error |= child.has_error();
        }

        let lookahead_bytes =
            u32::from(lookahead_end.checked_sub(size.bytes).unwrap_or_default())
                .max(spec.lookahead_bytes);
        let first_leaf = children.first().map_or_else(
            || spec.empty_first_leaf.unwrap_or(FirstLeaf { symbol: Symbol::END, lex_mode: 0 }),
            Self::first_leaf,
        );

        Self(Arc::new(SubtreeData {
            symbol,
            size,
            lookahead_bytes,
            parse_state: spec.parse_state,
            first_leaf,
            error_cost,
            dynamic_precedence,
            visible_child_count,
            flags: Flags { leaf: false, extra: false, fragile, has_changes: false, has_error },
            children: children.into_boxed_slice(),
        }))
    }

    /// Returns the symbol.
    #[inline]
    pub fn symbol(&self) -> Symbol {
        self.0.symbol
    }

    /// Returns the size in bytes and rows/columns.
    #[inline]
    pub fn size(&self) -> Length {
        self.0.size
    }

    /// Returns the size in bytes.
    #[inline]
    pub fn len(&self) -> TextSize {
        self.0.size.bytes
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.size.is_empty()
    }

    /// Returns the child subtrees; empty for leaves.
    #[inline]
    pub fn children(&self) -> &[Self] {
        &self.0.children
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.0.flags.leaf
    }

    #[inline]
    pub fn is_extra(&self) -> bool {
        self.0.flags.extra
    }

    /// Returns `true` for error nodes and lexical error tokens.
    #[inline]
    pub fn is_error(&self) -> bool {
        self.0.symbol.is_error()
    }

    /// Returns `true` if this subtree was built while the parse was
    /// ambiguous.
    #[inline]
    pub fn is_fragile(&self) -> bool {
        self.0.flags.fragile
    }

    /// Returns `true` if an edit touched this subtree.
    #[inline]
    pub fn has_changes(&self) -> bool {
        self.0.flags.has_changes
    }

    /// Returns `true` if this subtree is or contains an error.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.0.flags.has_error
    }

    #[inline]
    pub fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    #[inline]
    pub fn first_leaf(&self) -> FirstLeaf {
        self.0.first_leaf
    }

    #[inline]
    pub fn lookahead_bytes(&self) -> u32 {
        self.0.lookahead_bytes
    }

    #[inline]
    pub fn error_cost(&self) -> u32 {
        self.0.error_cost
    }

    #[inline]
    pub fn dynamic_precedence(&self) -> i32 {
        self.0.dynamic_precedence
    }

    /// Returns the number of children visible in the red API.
    #[inline]
    pub fn visible_child_count(&self) -> u32 {
        self.0.visible_child_count
    }

    /// Returns `true` if both handles point to the same allocation.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Returns the rightmost leaf, skipping childless nodes.
    pub fn last_leaf(&self) -> Option<&Self> {
        let mut pending = vec![self];
        while let Some(subtree) = pending.pop() {
            if subtree.is_leaf() {
                return Some(subtree);
            }
            pending.extend(subtree.children());
        }
        None
    }

    /// Returns a copy of this leaf recorded as shifted in `state`.
    pub fn with_parse_state(&self, state: StateId) -> Self {
        if self.0.parse_state == state {
            return self.clone();
        }
        let mut data = (*self.0).clone();
        data.parse_state = state;
        Self(Arc::new(data))
    }

    /// Returns a copy of this subtree with a new size and children, marked as
    /// changed.
    pub(crate) fn edited(&self, size: Length, children: Vec<Self>) -> Self {
        let mut data = (*self.0).clone();
        data.size = size;
        data.children = children.into_boxed_slice();
        data.flags.has_changes = true;
        Self(Arc::new(data))
    }
}

impl PartialEq for Subtree {
    fn eq(&self, other: &Self) -> bool {
        let mut pending = vec![(self, other)];
        while let Some((left, right)) = pending.pop() {
            if left.ptr_eq(right) {
                continue;
            }
            if left.symbol() != right.symbol()
                || left.size() != right.size()
                || left.is_leaf() != right.is_leaf()
                || left.is_extra() != right.is_extra()
                || left.children().len() != right.children().len()
            {
                return false;
            }
            pending.extend(left.children().iter().zip(right.children()));
        }
        true
    }
}

impl Eq for Subtree {}

impl fmt::Debug for Subtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct(if self.is_leaf() { "Leaf" } else { "Node" });
        debug.field("symbol", &self.symbol()).field("size", &self.size());
        if !self.is_leaf() {
            debug.field("children", &self.children());
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SymbolInfo;

    fn symbols() -> SymbolTable {
        SymbolTable::new(
            "test",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("word", true, true),
                SymbolInfo::new("_hidden", false, true),
                SymbolInfo::new("list", true, true),
            ],
        )
    }

    fn word(text: &str, lookahead_bytes: u32) -> Subtree {
        Subtree::leaf(Leaf {
            symbol: Symbol::new(1),
            size: Length::of(text),
            lookahead_bytes,
            parse_state: StateId::new(3),
            lex_mode: 2,
            extra: false,
            fragile: false,
        })
    }

    #[test]
    fn node_summarizes_children() {
        let symbols = symbols();
        let hidden = Subtree::node(
            Symbol::new(2),
            vec![word("ab", 1), word("c", 0)],
            NodeSpec { dynamic_precedence: 2, ..NodeSpec::default() },
            &symbols,
        );
        let list = Subtree::node(
            Symbol::new(3),
            vec![word("x\n", 0), hidden],
            NodeSpec { dynamic_precedence: -1, lookahead_bytes: 4, ..NodeSpec::default() },
            &symbols,
        );

        assert_eq!(list.size(), Length::of("x\nabc"));
        assert_eq!(list.visible_child_count(), 3);
        assert_eq!(list.dynamic_precedence(), 1);
        assert_eq!(list.lookahead_bytes(), 4);
        assert_eq!(list.first_leaf(), FirstLeaf { symbol: Symbol::new(1), lex_mode: 2 });
        assert_eq!(list.last_leaf().map(Subtree::len), Some(TextSize::new(1)));
        assert!(!list.has_error());
    }

    #[test]
    fn lookahead_of_inner_children_extends_past_the_node() {
        let symbols = symbols();
        let node = Subtree::node(
            Symbol::new(3),
            vec![word("ab", 5), word("c", 1)],
            NodeSpec::default(),
            &symbols,
        );

        assert_eq!(node.lookahead_bytes(), 4);
    }

    #[test]
    fn equality_is_structural() {
        let symbols = symbols();
        let left = Subtree::node(Symbol::new(3), vec![word("a", 0)], NodeSpec::default(), &symbols);
        let right = Subtree::node(
            Symbol::new(3),
            vec![word("a", 7).with_parse_state(StateId::new(9))],
            NodeSpec { parse_state: StateId::new(4), ..NodeSpec::default() },
            &symbols,
        );

        assert_eq!(left, right);
        assert!(!left.ptr_eq(&right));
    }

    #[test]
    fn deep_trees_compare_and_drop_iteratively() {
        let symbols = symbols();
        let chain = || {
            (0..200_000).fold(word("a", 0), |inner, _| {
                Subtree::node(Symbol::new(3), vec![inner, word("+", 0)], NodeSpec::default(), &symbols)
            })
        };
        let left = chain();
        let right = chain();

        assert!(left == right);
        assert_eq!(left.last_leaf().map(Subtree::len), Some(TextSize::new(1)));
        drop(left);
        drop(right);
    }
}
