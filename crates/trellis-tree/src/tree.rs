use std::fmt::{self, Write as _};
use std::ops::Range;
use std::sync::Arc;

use text_size::{TextRange, TextSize};

use crate::edit::{self, EditError, InputEdit};
use crate::{Length, Subtree, SymbolTable, SyntaxNode, WalkEvent, changes};

/// An immutable syntax tree together with the identity of its language.
///
/// Cloning is cheap: the root subtree and the symbol table are shared.
#[derive(Clone)]
pub struct Tree {
    root: Subtree,
    symbols: Arc<SymbolTable>,
}

impl Tree {
    pub fn new(root: Subtree, symbols: Arc<SymbolTable>) -> Self {
        Self { root, symbols }
    }

    /// Returns the root syntax node.
    #[inline]
    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode::new(self, &self.root, Length::ZERO)
    }

    /// Returns the root subtree.
    #[inline]
    pub fn green(&self) -> &Subtree {
        &self.root
    }

    #[inline]
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    /// Returns the name of the language this tree was parsed with.
    #[inline]
    pub fn language(&self) -> &str {
        self.symbols.language()
    }

    /// Returns the ABI version of the table this tree was parsed with.
    #[inline]
    pub fn abi_version(&self) -> u32 {
        self.symbols.version()
    }

    /// Returns the length of the source text in bytes.
    #[inline]
    pub fn len(&self) -> TextSize {
        self.root.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Returns a copy of this tree with node positions adjusted for `edits`.
    ///
    /// Nothing is reparsed. Subtrees touched by an edit are copied and marked
    /// as changed; all other subtrees are shared with `self`.
    pub fn edit(&self, edits: &[InputEdit]) -> Result<Self, EditError> {
        edit::validate(self.len(), edits)?;
        let root = edits.iter().fold(self.root.clone(), |root, edit| edit::apply(&root, edit));
        Ok(Self { root, symbols: self.symbols.clone() })
    }

    /// Returns the ranges whose syntactic structure differs between this
    /// (edited) tree and `new`.
    pub fn changed_ranges(&self, new: &Self) -> Vec<TextRange> {
        changes::changed_ranges(self, new)
    }

    /// Renders the tree as an S-expression of its named nodes.
    pub fn to_sexp(&self) -> String {
        self.root().to_sexp()
    }

    /// Renders every visible node with its range, one per line. Leaves show
    /// their text.
    pub fn debug_dump(&self, text: &str) -> String {
        let mut out = String::new();
        let mut depth = 0;
        for event in self.root().preorder() {
            match event {
                WalkEvent::Enter(node) => {
                    let range = node.range();
                    let _ = write!(out, "{:indent$}{}@{range:?}", "", node.kind_name(), indent = depth * 2);
                    if node.green().is_leaf() {
                        let leaf_text = text.get(Range::<usize>::from(range)).unwrap_or_default();
                        let _ = write!(out, " {leaf_text:?}");
                    }
                    out.push('\n');
                    depth += 1;
                }
                WalkEvent::Leave(_) => depth -= 1,
            }
        }
        out
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("language", &self.language())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sexp())
    }
}
