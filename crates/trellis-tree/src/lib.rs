//! Persistent, structurally shared concrete syntax tree.
//!
//! Green subtrees are reference counted and never mutated once published, so
//! an old tree and its incremental successor can share every untouched
//! subtree. Red handles ([`SyntaxNode`]) add absolute positions on the fly and
//! find their parent by descending from the root.

mod builder;
mod changes;
mod cursor;
mod edit;
mod green;
mod length;
mod symbol;
mod symbol_set;
mod syntax;
mod tree;

/// Manual construction of trees, mostly for tests and tools.
pub use builder::Builder;
/// Tree traversal with an explicit cursor.
pub use cursor::{Preorder, TreeCursor, WalkEvent};
/// Text edits applied to trees before reparsing.
pub use edit::{EditError, InputEdit};
/// Shared green subtrees.
pub use green::{FirstLeaf, Leaf, NodeSpec, Subtree};
/// Positions and sizes in bytes and rows/columns.
pub use length::{Length, Point};
/// Symbols, parse states and their names.
pub use symbol::{StateId, Symbol, SymbolInfo, SymbolTable};
/// Dense set of symbols.
pub use symbol_set::SymbolSet;
/// Red node handles.
pub use syntax::{Children, SyntaxNode};
pub use text_size::{TextRange, TextSize};
/// Immutable syntax tree.
pub use tree::Tree;
