use std::fmt::Display;

use annotate_snippets::{Level, Renderer, Snippet};
use trellis_tree::{SyntaxNode, TextRange, Tree, WalkEvent};

/// A syntax error found in a parsed tree.
pub(crate) struct Diagnostic {
    message: String,
    range: TextRange,
}

impl Diagnostic {
    /// Reports every outermost ERROR node of `tree`, in text order.
    pub(crate) fn collect(tree: &Tree, text: &str) -> Vec<Self> {
        let mut diagnostics = Vec::new();
        let mut nesting = 0usize;
        for event in tree.root().preorder() {
            match event {
                WalkEvent::Enter(node) if node.is_error() => {
                    if nesting == 0 {
                        diagnostics.push(Self::from_error(node, text));
                    }
                    nesting += 1;
                }
                WalkEvent::Leave(node) if node.is_error() => nesting -= 1,
                _ => {}
            }
        }
        diagnostics
    }

    fn from_error(node: SyntaxNode<'_>, text: &str) -> Self {
        let message = match node.text(text).trim().lines().next() {
            Some(first) if !first.is_empty() => format!("unexpected `{first}`"),
            _ => "syntax error".to_owned(),
        };
        Self { message, range: node.range() }
    }

    pub(crate) fn render<'a>(&'a self, renderer: &'a Renderer, path: &'a str, text: &'a str) -> impl Display + 'a {
        let message = Level::Error.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(Level::Error.span(self.range.into()).label("here"))
                .fold(true),
        );
        renderer.render(message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trellis_tree::{Builder, Symbol, SymbolInfo, SymbolTable, TextRange};

    use super::Diagnostic;

    #[test]
    fn reports_outermost_errors_only() {
        let symbols = SymbolTable::new(
            "t",
            1,
            vec![
                SymbolInfo::new("end", false, false),
                SymbolInfo::new("word", true, true),
                SymbolInfo::new("root", true, true),
            ],
        );
        let mut builder = Builder::new(Arc::new(symbols));
        builder.start_node(Symbol::new(2));
        builder.token(Symbol::new(1), "ok");
        builder.start_node(Symbol::ERROR);
        builder.token(Symbol::new(1), "bad");
        builder.start_node(Symbol::ERROR);
        builder.token(Symbol::new(1), "worse");
        builder.finish_node();
        builder.finish_node();
        builder.finish_node();
        let (tree, text) = builder.finish();

        let diagnostics = Diagnostic::collect(&tree, &text);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "unexpected `badworse`");
        assert_eq!(diagnostics[0].range, TextRange::new(2.into(), 10.into()));
    }
}
