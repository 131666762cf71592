//! Copy-on-write position adjustment for text edits.

use text_size::{TextRange, TextSize};

use crate::{Length, Point, Subtree};

/// A single text replacement: bytes `start..old_end` became
/// `start..new_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: TextSize,
    pub old_end_byte: TextSize,
    pub new_end_byte: TextSize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl InputEdit {
    /// Describes replacing `range` of `text` with `replacement`.
    ///
    /// Panics if `range` is out of bounds or not on char boundaries.
    pub fn replace(text: &str, range: TextRange, replacement: &str) -> Self {
        let start_point = Length::of(&text[TextRange::up_to(range.start())]).extent;
        let old_end_point = Length::of(&text[TextRange::up_to(range.end())]).extent;
        Self {
            start_byte: range.start(),
            old_end_byte: range.end(),
            new_end_byte: range.start() + TextSize::of(replacement),
            start_point,
            old_end_point,
            new_end_point: start_point + Length::of(replacement).extent,
        }
    }

    /// Applies this edit to `text`, which must be the text the edit was
    /// computed against.
    pub fn apply_to(&self, text: &mut String, replacement: &str) {
        text.replace_range(usize::from(self.start_byte)..usize::from(self.old_end_byte), replacement);
    }

    #[inline]
    fn start(&self) -> Length {
        Length::new(self.start_byte, self.start_point)
    }

    #[inline]
    fn old_end(&self) -> Length {
        Length::new(self.old_end_byte, self.old_end_point)
    }

    #[inline]
    fn new_end(&self) -> Length {
        Length::new(self.new_end_byte, self.new_end_point)
    }
}

/// A malformed batch of edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("edit {index} has an inverted range")]
    InvertedRange { index: usize },
    #[error("edit {index} ends at byte {offset:?}, past the end of the text ({len:?} bytes)")]
    OutOfBounds { index: usize, offset: TextSize, len: TextSize },
    #[error("edit {index} starts at byte {start:?}, not after the previous edit at {previous:?}")]
    OutOfOrder { index: usize, start: TextSize, previous: TextSize },
    #[error("edit {index} starts at byte {start:?}, inside the previous replacement ending at {previous_end:?}")]
    Overlapping { index: usize, start: TextSize, previous_end: TextSize },
}

/// Checks a batch of edits against a text of `len` bytes. Each edit is
/// expressed in the coordinates left by the edits before it.
pub(crate) fn validate(mut len: TextSize, edits: &[InputEdit]) -> Result<(), EditError> {
    let mut previous: Option<&InputEdit> = None;
    for (index, edit) in edits.iter().enumerate() {
        if edit.old_end_byte < edit.start_byte || edit.new_end_byte < edit.start_byte {
            return Err(EditError::InvertedRange { index });
        }
        if edit.old_end_byte > len {
            return Err(EditError::OutOfBounds { index, offset: edit.old_end_byte, len });
        }
        if let Some(previous) = previous {
            if edit.start_byte <= previous.start_byte {
                return Err(EditError::OutOfOrder {
                    index,
                    start: edit.start_byte,
                    previous: previous.start_byte,
                });
            }
            if edit.start_byte < previous.new_end_byte {
                return Err(EditError::Overlapping {
                    index,
                    start: edit.start_byte,
                    previous_end: previous.new_end_byte,
                });
            }
        }
        len = len - (edit.old_end_byte - edit.start_byte) + (edit.new_end_byte - edit.start_byte);
        previous = Some(edit);
    }
    Ok(())
}

/// An edit relative to the start of the subtree it is applied to.
#[derive(Debug, Clone, Copy)]
struct LocalEdit {
    start: Length,
    old_end: Length,
    new_end: Length,
}

pub(crate) fn apply(root: &Subtree, edit: &InputEdit) -> Subtree {
    let edit = LocalEdit { start: edit.start(), old_end: edit.old_end(), new_end: edit.new_end() };
    let mut ancestors: Vec<Frame> = Vec::new();
    let mut current = Frame::new(root, edit);
    loop {
        if let Some((child, child_edit)) = current.next_touched() {
            let parent = std::mem::replace(&mut current, Frame::new(&child, child_edit));
            ancestors.push(parent);
            continue;
        }
        let edited = current.finish();
        match ancestors.pop() {
            Some(mut parent) => {
                parent.replace_last(edited);
                current = parent;
            }
            None => return edited,
        }
    }
}

/// A subtree being copied, with the children visited so far.
struct Frame {
    subtree: Subtree,
    edit: LocalEdit,
    new_size: Length,
    children: Vec<Subtree>,
    next: usize,
    right: Length,
    inserted: bool,
}

impl Frame {
    fn new(subtree: &Subtree, edit: LocalEdit) -> Self {
        let size = subtree.size();
        let new_size = if edit.start.bytes <= size.bytes {
            edit.new_end + size.saturating_sub(edit.old_end)
        } else {
            // Touched only through the lookahead.
            size
        };
        Self {
            subtree: subtree.clone(),
            edit,
            new_size,
            children: subtree.children().to_vec(),
            next: 0,
            right: Length::ZERO,
            inserted: false,
        }
    }

    /// Advances to the next child the edit touches and returns it with the
    /// edit in its coordinates.
    fn next_touched(&mut self) -> Option<(Subtree, LocalEdit)> {
        let edit = self.edit;
        let pure_insertion = edit.old_end.bytes == edit.start.bytes;
        while let Some(child) = self.children.get(self.next) {
            let index = self.next;
            let left = self.right;
            let child_size = child.size();
            self.right = left + child_size;
            self.next += 1;

            if self.right.bytes + TextSize::new(child.lookahead_bytes()) < edit.start.bytes {
                continue;
            }
            if left.bytes > edit.old_end.bytes
                || (left.bytes == edit.old_end.bytes && !child_size.is_empty() && index > 0)
            {
                self.next = self.children.len();
                return None;
            }

            let mut child_edit = LocalEdit {
                start: edit.start.saturating_sub(left),
                old_end: edit.old_end.saturating_sub(left),
                new_end: edit.new_end.saturating_sub(left),
            };
            // Inserted text goes to the first child covering the replaced
            // bytes, or ending at the start of a pure insertion. The others
            // only shrink.
            let takes_insertion = !self.inserted
                && (self.right.bytes > edit.start.bytes
                    || (self.right.bytes == edit.start.bytes && pure_insertion));
            if takes_insertion {
                self.inserted = true;
            } else {
                child_edit.new_end = child_edit.start;
            }
            return Some((child.clone(), child_edit));
        }
        None
    }

    fn replace_last(&mut self, edited: Subtree) {
        self.children[self.next - 1] = edited;
    }

    fn finish(self) -> Subtree {
        self.subtree.edited(self.new_size, self.children)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use expect_test::expect;

    use super::*;
    use crate::{Builder, Symbol, SymbolInfo, SymbolTable, Tree};

    const NUM: Symbol = Symbol::new(1);
    const PLUS: Symbol = Symbol::new(2);
    const SUM: Symbol = Symbol::new(3);
    const STMT: Symbol = Symbol::new(4);
    const PROGRAM: Symbol = Symbol::new(5);
    const SPACE: Symbol = Symbol::new(6);

    fn symbols() -> Arc<SymbolTable> {
        Arc::new(SymbolTable::new(
            "arith",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("num", true, true),
                SymbolInfo::new("+", true, false),
                SymbolInfo::new("sum", true, true),
                SymbolInfo::new("stmt", true, true),
                SymbolInfo::new("program", true, true),
                SymbolInfo::new("space", true, false),
            ],
        ))
    }

    /// `12+3 4+56`
    fn sample() -> (Tree, String) {
        let mut builder = Builder::new(symbols());
        builder.start_node(PROGRAM);
        for (left, right) in [("12", "3"), ("4", "56")] {
            if left == "4" {
                builder.extra(SPACE, " ");
            }
            builder.start_node(STMT);
            builder.start_node(SUM);
            builder.token(NUM, left);
            builder.token(PLUS, "+");
            builder.token(NUM, right);
            builder.finish_node();
            builder.finish_node();
        }
        builder.finish_node();
        builder.finish()
    }

    fn assert_contiguous(tree: &Tree) {
        fn check(subtree: &Subtree) {
            if subtree.is_leaf() {
                return;
            }
            let sum: Length = subtree.children().iter().map(Subtree::size).sum();
            assert_eq!(sum, subtree.size(), "children of {subtree:?} do not add up");
            subtree.children().iter().for_each(check);
        }
        check(tree.green());
    }

    fn edited(tree: &Tree, text: &str, range: TextRange, replacement: &str) -> (Tree, String) {
        let edit = InputEdit::replace(text, range, replacement);
        let mut new_text = text.to_owned();
        edit.apply_to(&mut new_text, replacement);
        (tree.edit(&[edit]).unwrap(), new_text)
    }

    #[test]
    fn insertion_at_a_boundary_goes_to_the_left_leaf() {
        let (old, text) = sample();
        let (tree, new_text) = edited(&old, &text, TextRange::empty(3.into()), "7");
        assert_contiguous(&tree);
        expect![[r#"
            program@0..10
              stmt@0..5
                sum@0..5
                  num@0..2 "12"
                  +@2..4 "+7"
                  num@4..5 "3"
              space@5..6 " "
              stmt@6..10
                sum@6..10
                  num@6..7 "4"
                  +@7..8 "+"
                  num@8..10 "56"
        "#]]
        .assert_eq(&tree.debug_dump(&new_text));

        let stmt = tree.root().child(0).unwrap();
        assert!(stmt.has_changes());
        assert!(!tree.root().child(2).unwrap().has_changes());
    }

    #[test]
    fn untouched_subtrees_are_shared() {
        let (old, text) = sample();
        let (tree, _) = edited(&old, &text, TextRange::new(0.into(), 1.into()), "");

        assert!(old.green().children()[2].ptr_eq(&tree.green().children()[2]));
        assert!(!old.green().children()[0].ptr_eq(&tree.green().children()[0]));
        assert!(!old.root().child(0).unwrap().has_changes());
    }

    #[test]
    fn deletion_spanning_siblings_shrinks_both() {
        let (old, text) = sample();
        let (tree, new_text) = edited(&old, &text, TextRange::new(4.into(), 7.into()), "\n");
        assert_contiguous(&tree);
        expect![[r#"
            program@0..7
              stmt@0..4
                sum@0..4
                  num@0..2 "12"
                  +@2..3 "+"
                  num@3..4 "3"
              space@4..5 "\n"
              stmt@5..7
                sum@5..7
                  num@5..5 ""
                  +@5..5 ""
                  num@5..7 "56"
        "#]]
        .assert_eq(&tree.debug_dump(&new_text));
        assert!(tree.root().child(0).unwrap().has_changes());
        assert_eq!(tree.root().child(0).unwrap().end_point(), Point::new(0, 4));
        assert_eq!(tree.root().child(2).unwrap().start_point(), Point::new(1, 0));
    }

    #[test]
    fn replacement_after_a_boundary_keeps_the_left_neighbour() {
        let (old, text) = sample();
        let (tree, new_text) = edited(&old, &text, TextRange::new(3.into(), 4.into()), "33");
        assert_contiguous(&tree);
        let sum = tree.root().child(0).unwrap().child(0).unwrap();
        let texts: Vec<_> = sum.children().map(|leaf| leaf.text(&new_text)).collect();
        assert_eq!(texts, ["12", "+", "33"]);
        assert!(sum.child(1).unwrap().has_changes());
    }

    #[test]
    fn deep_trees_are_edited_without_recursion() {
        let mut builder = Builder::new(symbols());
        let depth = 100_000;
        for _ in 0..depth {
            builder.start_node(SUM);
        }
        builder.token(NUM, "1");
        for _ in 0..depth {
            builder.finish_node();
        }
        let (tree, text) = builder.finish();

        let (tree, new_text) = edited(&tree, &text, TextRange::new(0.into(), 1.into()), "22");
        assert_eq!(new_text, "22");
        assert_eq!(tree.len(), TextSize::new(2));
        assert!(tree.green().has_changes());
    }

    #[test]
    fn edits_apply_in_sequence() {
        let (tree, text) = sample();
        let first = InputEdit::replace(&text, TextRange::new(0.into(), 2.into()), "1");
        let mut new_text = text.clone();
        first.apply_to(&mut new_text, "1");
        let second = InputEdit::replace(&new_text, TextRange::empty(7.into()), "0");
        second.apply_to(&mut new_text, "0");

        let tree = tree.edit(&[first, second]).unwrap();
        assert_contiguous(&tree);
        assert_eq!(new_text, "1+3 4+506");
        assert_eq!(tree.len(), TextSize::of(&new_text));
        let last = tree.root().child(2).unwrap().child(0).unwrap().child(2).unwrap();
        assert_eq!(last.text(&new_text), "506");
    }

    #[test]
    fn rejects_malformed_batches() {
        let (tree, text) = sample();
        let at = |start: u32, end: u32| InputEdit::replace(&text, TextRange::new(start.into(), end.into()), "x");

        let out_of_order = tree.edit(&[at(4, 5), at(2, 3)]).unwrap_err();
        assert_eq!(
            out_of_order,
            EditError::OutOfOrder { index: 1, start: 2.into(), previous: 4.into() }
        );

        let overlapping = tree.edit(&[at(2, 4), at(2, 5)]).unwrap_err();
        assert!(matches!(overlapping, EditError::OutOfOrder { index: 1, .. }));

        let mut inside = at(4, 4);
        inside.new_end_byte = 8.into();
        let overlapping = tree.edit(&[at(0, 1), inside, at(6, 6)]).unwrap_err();
        assert_eq!(
            overlapping,
            EditError::Overlapping { index: 2, start: 6.into(), previous_end: 8.into() }
        );

        let mut past_end = at(0, 1);
        past_end.old_end_byte = 20.into();
        assert_eq!(
            tree.edit(&[past_end]).unwrap_err(),
            EditError::OutOfBounds { index: 0, offset: 20.into(), len: 9.into() }
        );

        let mut inverted = at(3, 3);
        inverted.new_end_byte = 1.into();
        assert_eq!(tree.edit(&[inverted]).unwrap_err(), EditError::InvertedRange { index: 0 });
    }

    #[test]
    #[should_panic = "byte index 5 is out of bounds"]
    fn replace_panics_past_the_end() {
        InputEdit::replace("abc", TextRange::new(2.into(), 5.into()), "x");
    }

    #[test]
    #[should_panic = "is not a char boundary"]
    fn replace_panics_inside_a_character() {
        InputEdit::replace("é", TextRange::empty(1.into()), "x");
    }
}
