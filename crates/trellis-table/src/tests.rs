use expect_test::expect;
use trellis_tree::{StateId, Symbol};

use crate::format::TableFile;
use crate::{Action, Language, LanguageBuilder, RuleId, TableError};

const PAIRS: &str = include_str!("../test_data/pairs.json");

const ID: Symbol = Symbol::new(1);
const WS: Symbol = Symbol::new(2);
const PROGRAM: Symbol = Symbol::new(3);
const CALL: Symbol = Symbol::new(4);

fn state(raw: u16) -> StateId {
    StateId::new(raw)
}

fn load(json: &str) -> Result<Language, TableError> {
    Language::from_json(json)
}

#[test]
fn loads_a_json_table() {
    let language = load(PAIRS).unwrap();

    assert_eq!(language.name(), "pairs");
    assert_eq!(language.abi_version(), 1);
    assert_eq!(language.symbol_count(), 6);
    assert_eq!(language.state_count(), 6);
    assert_eq!(language.symbols().name(CALL), "call");
    assert!(!language.symbols().is_visible(Symbol::END));

    assert_eq!(
        language.actions(state(2), Symbol::END),
        [Action::Reduce { rule: RuleId::new(2) }, Action::Reduce { rule: RuleId::new(3) }]
    );
    assert!(language.actions(state(2), ID).is_empty());
    assert!(language.actions(StateId::ERROR_RECOVERY, ID).is_empty());
    assert_eq!(language.goto(state(0), CALL), Some(state(3)));
    assert_eq!(language.next_state(state(0), ID), Some(state(1)));
    assert_eq!(language.next_state(state(0), PROGRAM), Some(state(5)));
    assert_eq!(language.rule(RuleId::new(2)).dynamic_precedence, 1);

    assert!(language.is_extra(WS));
    assert!(language.is_terminal(ID));
    assert!(language.is_terminal(Symbol::ERROR));
    assert!(!language.is_terminal(PROGRAM));
}

#[test]
fn states_with_the_same_terminals_share_a_lex_mode() {
    let language = load(PAIRS).unwrap();

    let modes: Vec<u16> = (0..6).map(|raw| language.lex_mode_id(state(raw))).collect();
    assert_eq!(modes, [0, 0, 1, 1, 1, 1]);
    assert_eq!(language.lex_mode_id(StateId::ERROR_RECOVERY), 2);
    assert_eq!(language.recovery_lex_mode(), 2);

    let valid = |mode: u16| language.lex_mode(mode).valid().iter().collect::<Vec<_>>();
    assert_eq!(valid(0), [ID, WS]);
    assert_eq!(valid(1), [Symbol::END, WS]);
    assert_eq!(valid(2), [Symbol::END, ID, WS]);
    assert_eq!(language.lex_mode(1).rules(), [1]);
    assert_eq!(language.lex_mode(2).rules(), [0, 1]);
}

#[test]
fn rejects_other_abi_versions() {
    let json = PAIRS.replace("\"abi_version\": 1", "\"abi_version\": 2");
    let err = load(&json).unwrap_err();

    assert!(matches!(err, TableError::UnsupportedVersion { found: 2, expected: 1 }));
    expect!["table ABI version 2 is not supported (expected 1)"].assert_eq(&err.to_string());
}

#[test]
fn rejects_dangling_references() {
    let err = load(&PAIRS.replace("{ \"shift\": 2 }", "{ \"shift\": 9 }")).unwrap_err();
    expect!["state 1 refers to state 9, which does not exist"].assert_eq(&err.to_string());

    let err = load(&PAIRS.replace("{ \"reduce\": 3 }", "{ \"reduce\": 7 }")).unwrap_err();
    expect!["state 2 refers to rule 7, which does not exist"].assert_eq(&err.to_string());

    let err = load(&PAIRS.replace("\"4\": 3", "\"1\": 3")).unwrap_err();
    expect!["goto of state 0 expects a nonterminal, but `id` is not one"]
        .assert_eq(&err.to_string());

    let err = load(&PAIRS.replace("{ \"lhs\": 5,", "{ \"lhs\": 8,")).unwrap_err();
    expect!["rule 3 refers to symbol 8, which does not exist"].assert_eq(&err.to_string());
}

#[test]
fn rejects_malformed_input() {
    let err = load(&PAIRS.replace("[a-z]+", "[a-")).unwrap_err();
    assert!(matches!(&err, TableError::Regex { name, pattern, .. } if name == "id" && pattern == "[a-"));

    assert!(matches!(load("{ \"name\": ").unwrap_err(), TableError::Json(_)));
}

#[test]
fn builder_produces_the_json_table() {
    let mut builder = LanguageBuilder::new("pairs");
    let id = builder.pattern("id", "[a-z]+");
    builder.extra("ws", "\\s+");
    let program = builder.nonterminal("program");
    let call = builder.nonterminal("call");
    let pair = builder.nonterminal("pair");

    let program_call = builder.rule(program, 1);
    let program_pair = builder.rule(program, 1);
    let call_rule = builder.rule_with(crate::format::RuleDef {
        lhs: call.raw(),
        child_count: 2,
        precedence: 0,
        associativity: None,
        dynamic_precedence: 1,
    });
    let pair_rule = builder.rule(pair, 2);

    let states: Vec<StateId> = (0..6).map(|_| builder.state()).collect();
    builder
        .action(states[0], id, Action::Shift { state: states[1] })
        .goto(states[0], program, states[5])
        .goto(states[0], call, states[3])
        .goto(states[0], pair, states[4])
        .action(states[1], id, Action::Shift { state: states[2] })
        .action(states[2], Symbol::END, Action::Reduce { rule: call_rule })
        .action(states[2], Symbol::END, Action::Reduce { rule: pair_rule })
        .action(states[3], Symbol::END, Action::Reduce { rule: program_call })
        .action(states[4], Symbol::END, Action::Reduce { rule: program_pair })
        .action(states[5], Symbol::END, Action::Accept)
        .start_state(states[0]);

    assert!(builder.build().is_ok());
    let expected: TableFile = serde_json::from_str(PAIRS).unwrap();
    assert_eq!(builder.into_table(), expected);
}
