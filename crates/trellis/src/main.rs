mod diagnostic;

use std::ops::Range;
use std::process::ExitCode;
use std::sync::Arc;

use annotate_snippets::Renderer;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser as _;
use diagnostic::Diagnostic;
use trellis_parse::{ParseOptions, Parser};
use trellis_table::Language;
use trellis_tree::{InputEdit, TextRange, TextSize, Tree};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Clone, Copy, clap::ValueEnum)]
enum Format {
    /// Indented dump of every node with its range.
    Tree,
    /// S-expression of the named nodes.
    Sexp,
}

#[derive(clap::Args)]
struct Common {
    /// Parse table in JSON form.
    #[arg(long)]
    language: Utf8PathBuf,
    /// Engine options in JSON form.
    #[arg(long)]
    options: Option<Utf8PathBuf>,
    #[arg(long, value_enum, default_value_t = Format::Tree)]
    format: Format,
}

#[derive(clap::Parser)]
enum Options {
    /// Parse a file and report its syntax errors.
    Parse {
        #[command(flatten)]
        common: Common,
        path: Utf8PathBuf,
    },
    /// Parse `old`, then reparse it incrementally into `new`.
    Edit {
        #[command(flatten)]
        common: Common,
        old: Utf8PathBuf,
        new: Utf8PathBuf,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Options::parse() {
        Options::Parse { common, path } => {
            let parser = common.parser()?;
            let text = read(&path)?;
            let tree = parser.parse(&text);
            common.print(&tree, &text);
            Ok(report(&tree, &path, &text))
        }
        Options::Edit { common, old, new } => {
            let parser = common.parser()?;
            let old_text = read(&old)?;
            let new_text = read(&new)?;
            let tree = parser.parse(&old_text);

            let (removed, inserted) = diff(&old_text, &new_text);
            let range = TextRange::new(offset(removed.start)?, offset(removed.end)?);
            let edit = InputEdit::replace(&old_text, range, &new_text[inserted]);
            tracing::debug!(?edit, "derived edit");

            let reparse = parser.reparse(&tree, &[edit], &new_text)?;
            for changed in &reparse.changed_ranges {
                println!("changed {changed:?}");
            }
            common.print(&reparse.tree, &new_text);
            Ok(report(&reparse.tree, &new, &new_text))
        }
    }
}

impl Common {
    fn parser(&self) -> anyhow::Result<Parser> {
        let language =
            Language::from_file(&self.language).with_context(|| format!("failed to load `{}`", self.language))?;
        let mut parser = Parser::new(Arc::new(language));
        if let Some(path) = &self.options {
            let options: ParseOptions = serde_json::from_str(&read(path)?)
                .with_context(|| format!("failed to parse options in `{path}`"))?;
            parser = parser.with_options(options);
        }
        Ok(parser)
    }

    fn print(&self, tree: &Tree, text: &str) {
        match self.format {
            Format::Tree => print!("{}", tree.debug_dump(text)),
            Format::Sexp => println!("{}", tree.to_sexp()),
        }
    }
}

fn read(path: &Utf8Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read `{path}`"))
}

fn report(tree: &Tree, path: &Utf8Path, text: &str) -> ExitCode {
    let diagnostics = Diagnostic::collect(tree, text);
    let renderer = Renderer::styled();
    for diagnostic in &diagnostics {
        eprintln!("{}", diagnostic.render(&renderer, path.as_str(), text));
    }
    tracing::debug!(errors = diagnostics.len(), "done");
    if diagnostics.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn offset(offset: usize) -> anyhow::Result<TextSize> {
    TextSize::try_from(offset).with_context(|| format!("offset {offset} does not fit in 32 bits"))
}

/// The single replacement turning `old` into `new`: the byte range of `old`
/// between the common prefix and suffix, and what `new` has there instead.
fn diff(old: &str, new: &str) -> (Range<usize>, Range<usize>) {
    let mut prefix = old.bytes().zip(new.bytes()).take_while(|(a, b)| a == b).count();
    while !old.is_char_boundary(prefix) {
        prefix -= 1;
    }
    let max_suffix = old.len().min(new.len()) - prefix;
    let mut suffix =
        old.bytes().rev().zip(new.bytes().rev()).take(max_suffix).take_while(|(a, b)| a == b).count();
    while !old.is_char_boundary(old.len() - suffix) {
        suffix -= 1;
    }
    (prefix..old.len() - suffix, prefix..new.len() - suffix)
}
