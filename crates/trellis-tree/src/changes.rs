//! Ranges whose syntactic structure differs between two trees.

use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashSet, FxHasher};
use text_size::{TextRange, TextSize};

use crate::{Subtree, Symbol, Tree};

/// A leaf with a fingerprint of every visible node above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct LeafKey {
    range: TextRange,
    symbol: Symbol,
    ancestry: u64,
}

/// Compares `old`, already edited into new coordinates, with `new`.
///
/// A leaf is unchanged when the other tree has a leaf with the same range and
/// symbol below visible ancestors of the same symbols and ranges. The ranges
/// of all other leaves, from both trees, are merged into a sorted list of
/// disjoint ranges.
pub(crate) fn changed_ranges(old: &Tree, new: &Tree) -> Vec<TextRange> {
    let old_leaves = leaves(old);
    let new_leaves = leaves(new);
    let old_set: FxHashSet<LeafKey> = old_leaves.iter().copied().collect();
    let new_set: FxHashSet<LeafKey> = new_leaves.iter().copied().collect();

    let mut ranges: Vec<TextRange> = new_leaves
        .iter()
        .filter(|leaf| !old_set.contains(leaf))
        .chain(old_leaves.iter().filter(|leaf| !new_set.contains(leaf)))
        .map(|leaf| leaf.range)
        .filter(|range| !range.is_empty())
        .collect();
    ranges.sort_by_key(|range| (range.start(), range.end()));

    let mut merged: Vec<TextRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start() <= last.end() => *last = last.cover(range),
            _ => merged.push(range),
        }
    }
    merged
}

fn leaves(tree: &Tree) -> Vec<LeafKey> {
    let symbols = tree.symbols();
    let mut leaves = Vec::new();
    let mut stack: Vec<(&Subtree, TextSize, u64)> = vec![(tree.green(), TextSize::new(0), 0)];

    while let Some((subtree, start, ancestry)) = stack.pop() {
        let range = TextRange::at(start, subtree.len());
        if subtree.is_leaf() {
            leaves.push(LeafKey { range, symbol: subtree.symbol(), ancestry });
            continue;
        }
        let ancestry = if symbols.is_visible(subtree.symbol()) {
            let mut hasher = FxHasher::default();
            (ancestry, subtree.symbol(), range).hash(&mut hasher);
            hasher.finish()
        } else {
            ancestry
        };
        let mut offset = range.end();
        for child in subtree.children().iter().rev() {
            offset -= child.len();
            stack.push((child, offset, ancestry));
        }
    }
    leaves
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{Builder, InputEdit, SymbolInfo, SymbolTable};

    const WORD: Symbol = Symbol::new(1);
    const GROUP: Symbol = Symbol::new(2);
    const LIST: Symbol = Symbol::new(3);

    fn symbols() -> Arc<SymbolTable> {
        Arc::new(SymbolTable::new(
            "words",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("word", true, true),
                SymbolInfo::new("group", true, true),
                SymbolInfo::new("list", true, true),
            ],
        ))
    }

    fn build(groups: &[&[&str]]) -> Tree {
        let mut builder = Builder::new(symbols());
        builder.start_node(LIST);
        for group in groups {
            builder.start_node(GROUP);
            for word in *group {
                builder.token(WORD, word);
            }
            builder.finish_node();
        }
        builder.finish_node();
        builder.finish().0
    }

    #[test]
    fn identical_trees_have_no_changes() {
        let tree = build(&[&["ab", "c"], &["de"]]);
        assert!(tree.changed_ranges(&build(&[&["ab", "c"], &["de"]])).is_empty());
    }

    #[test]
    fn regrouping_reports_the_regrouped_leaves() {
        let old = build(&[&["ab", "c"], &["de"]]);
        let new = build(&[&["ab"], &["c", "de"]]);

        assert_eq!(old.changed_ranges(&new), vec![TextRange::new(0.into(), 5.into())]);
    }

    #[test]
    fn changes_are_reported_in_new_coordinates() {
        let text = "abcde";
        let old = build(&[&["ab", "c"], &["de"]]);
        let edit = InputEdit::replace(text, TextRange::new(2.into(), 3.into()), "xy");
        let old = old.edit(&[edit]).unwrap();
        let new = build(&[&["ab", "xy"], &["de"]]);

        assert_eq!(old.changed_ranges(&new), vec![TextRange::new(0.into(), 4.into())]);
    }
}
