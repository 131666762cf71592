use std::sync::Arc;

use trellis_lexer::TableLexer;
use trellis_table::format::RuleDef;
use trellis_table::{Action, Language, LanguageBuilder};
use trellis_tree::{Symbol, Tree};

use super::{Engine, Version};
use crate::ParseOptions;

/// `program -> value id`, `value -> name | word`, `name -> id`, `word -> id`.
///
/// Both readings of the first `id` reach the state after `value` once the
/// second `id` is shifted.
fn converging(name_precedence: i32, word_precedence: i32) -> Language {
    let mut builder = LanguageBuilder::new("converging");
    let id = builder.pattern("id", "[a-z]+");
    builder.extra("ws", "\\s+");
    let program = builder.nonterminal("program");
    let value = builder.nonterminal("value");
    let name = builder.nonterminal("name");
    let word = builder.nonterminal("word");

    let to_program = builder.rule(program, 2);
    let rule = |lhs: Symbol, dynamic_precedence| RuleDef {
        lhs: lhs.raw(),
        child_count: 1,
        precedence: 0,
        associativity: None,
        dynamic_precedence,
    };
    let from_name = builder.rule_with(rule(value, name_precedence));
    let from_word = builder.rule_with(rule(value, word_precedence));
    let to_name = builder.rule(name, 1);
    let to_word = builder.rule(word, 1);

    let states: Vec<_> = (0..7).map(|_| builder.state()).collect();
    builder
        .action(states[0], id, Action::Shift { state: states[1] })
        .goto(states[0], program, states[6])
        .goto(states[0], value, states[4])
        .goto(states[0], name, states[2])
        .goto(states[0], word, states[3])
        .action(states[1], id, Action::Reduce { rule: to_name })
        .action(states[1], id, Action::Reduce { rule: to_word })
        .action(states[2], id, Action::Reduce { rule: from_name })
        .action(states[3], id, Action::Reduce { rule: from_word })
        .action(states[4], id, Action::Shift { state: states[5] })
        .action(states[5], Symbol::END, Action::Reduce { rule: to_program })
        .action(states[6], Symbol::END, Action::Accept);
    builder.build().unwrap()
}

/// Runs the engine step by step, returning the sexp of the result and the
/// number of live versions after every step.
fn trace(language: &Language, options: &ParseOptions, text: &str) -> (String, Vec<usize>) {
    let lexer = TableLexer::new(language, text);
    let mut engine = Engine::new(language, options, lexer, None);
    engine.versions.push(Version::new(language.start_state()));
    let mut counts = Vec::new();
    while !engine.versions.is_empty() {
        engine.step();
        counts.push(engine.versions.len());
    }
    let tree = Tree::new(engine.finish(), Arc::clone(language.symbols()));
    (tree.to_sexp(), counts)
}

#[test]
fn converging_versions_merge_into_the_better_one() {
    let options = ParseOptions::default();

    let (sexp, counts) = trace(&converging(0, 1), &options, "a b");
    assert_eq!(sexp, "(program (value (word (id))) (id))");
    // Shift `a`, shift the space, fork and shift `b`, catch up and merge, accept.
    assert_eq!(counts, [1, 1, 2, 1, 0]);

    let (sexp, counts) = trace(&converging(1, 0), &options, "a b");
    assert_eq!(sexp, "(program (value (name (id))) (id))");
    assert_eq!(counts, [1, 1, 2, 1, 0]);
}

#[test]
fn the_version_limit_drops_the_worst_version() {
    let options = ParseOptions { max_versions: 1, ..ParseOptions::default() };

    // The `word` reading would win a merge, but it is dropped while its
    // reduction is still pending and its path ranks after the first action.
    let (sexp, counts) = trace(&converging(0, 1), &options, "a b");
    assert_eq!(sexp, "(program (value (name (id))) (id))");
    assert_eq!(counts, [1, 1, 1, 0]);
}
