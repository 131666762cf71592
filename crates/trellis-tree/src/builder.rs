//! Manual construction of trees from a flat stream of events.

use std::sync::Arc;

use crate::{Leaf, Length, NodeSpec, StateId, Subtree, Symbol, SymbolTable, Tree};

/// Builds a [`Tree`] from nested `start_node`/`token`/`finish_node` calls.
///
/// Built trees carry no parse state, so an incremental parse never reuses
/// them; they are meant for tools and tests.
pub struct Builder {
    symbols: Arc<SymbolTable>,
    text: String,
    opened: Vec<(Symbol, Vec<Subtree>)>,
    children_pool: Vec<Vec<Subtree>>,
    root: Option<Subtree>,
}

impl Builder {
    /// Creates a new builder for trees of the language described by `symbols`.
    pub fn new(symbols: Arc<SymbolTable>) -> Self {
        Self {
            symbols,
            text: String::new(),
            opened: Vec::new(),
            children_pool: Vec::new(),
            root: None,
        }
    }

    /// Starts a new node of the given kind.
    pub fn start_node(&mut self, symbol: Symbol) {
        assert!(self.root.is_none(), "the root node is already finished");
        let children = self.children_pool.pop().unwrap_or_default();
        self.opened.push((symbol, children));
    }

    /// Adds a token to the current node.
    pub fn token(&mut self, symbol: Symbol, text: &str) {
        self.push_leaf(symbol, text, false);
    }

    /// Adds an extra token (whitespace, comment) to the current node.
    pub fn extra(&mut self, symbol: Symbol, text: &str) {
        self.push_leaf(symbol, text, true);
    }

    fn push_leaf(&mut self, symbol: Symbol, text: &str, extra: bool) {
        let leaf = Subtree::leaf(Leaf {
            symbol,
            size: Length::of(text),
            lookahead_bytes: 0,
            parse_state: StateId::default(),
            lex_mode: 0,
            extra,
            fragile: false,
        });
        self.text.push_str(text);
        self.last_opened().push(leaf);
    }

    /// Finishes the most recently started node.
    pub fn finish_node(&mut self) {
        let (symbol, mut children) = self.opened.pop().expect("`finish_node` without a matching `start_node`");
        let node = Subtree::node(symbol, children.drain(..).collect(), NodeSpec::default(), &self.symbols);
        self.children_pool.push(children);
        match self.opened.last_mut() {
            Some((_, parent)) => parent.push(node),
            None => self.root = Some(node),
        }
    }

    /// Returns the finished tree together with the concatenated token text.
    pub fn finish(self) -> (Tree, String) {
        assert!(self.opened.is_empty(), "{} nodes are still open", self.opened.len());
        let root = self.root.expect("no root node was built");
        (Tree::new(root, self.symbols), self.text)
    }

    #[track_caller]
    fn last_opened(&mut self) -> &mut Vec<Subtree> {
        &mut self.opened.last_mut().expect("tokens must be inside a node").1
    }
}
