use trellis_tree::{StateId, Symbol};

use crate::format::{
    ActionDef, Associativity, LexRuleDef, PatternDef, RuleDef, StateDef, SymbolDef, SymbolKind,
    TableFile,
};
use crate::{ABI_VERSION, Action, Language, RuleId, TableError};

/// Assembles a table in code.
///
/// Symbol 0 is the end-of-input terminal and is declared up front. Names
/// starting with `_` are hidden from the syntax tree.
#[derive(Debug, Clone)]
pub struct LanguageBuilder {
    table: TableFile,
}

impl LanguageBuilder {
    pub fn new(name: &str) -> Self {
        let end = SymbolDef {
            name: "end".to_owned(),
            kind: SymbolKind::Terminal,
            visible: false,
            named: false,
            extra: false,
            precedence: 0,
            associativity: None,
        };
        Self {
            table: TableFile {
                name: name.to_owned(),
                abi_version: ABI_VERSION,
                symbols: vec![end],
                lex_rules: Vec::new(),
                rules: Vec::new(),
                states: Vec::new(),
                start_state: 0,
                external_tokens: Vec::new(),
            },
        }
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, named: bool) -> Symbol {
        let symbol = Symbol::new(self.table.symbols.len() as u16);
        self.table.symbols.push(SymbolDef {
            name: name.to_owned(),
            kind,
            visible: !name.starts_with('_'),
            named,
            extra: false,
            precedence: 0,
            associativity: None,
        });
        symbol
    }

    fn def_mut(&mut self, symbol: Symbol) -> &mut SymbolDef {
        &mut self.table.symbols[symbol.index()]
    }

    /// Declares an anonymous terminal matching `text` exactly.
    pub fn literal(&mut self, text: &str) -> Symbol {
        let symbol = self.declare(text, SymbolKind::Terminal, false);
        self.table.lex_rules.push(LexRuleDef {
            symbol: symbol.raw(),
            pattern: PatternDef::Literal(text.to_owned()),
        });
        symbol
    }

    /// Declares a named terminal matching `regex`.
    pub fn pattern(&mut self, name: &str, regex: &str) -> Symbol {
        let symbol = self.declare(name, SymbolKind::Terminal, true);
        self.table.lex_rules.push(LexRuleDef {
            symbol: symbol.raw(),
            pattern: PatternDef::Regex(regex.to_owned()),
        });
        symbol
    }

    /// Declares an anonymous terminal matching `regex` that may appear
    /// anywhere.
    pub fn extra(&mut self, name: &str, regex: &str) -> Symbol {
        let symbol = self.declare(name, SymbolKind::Terminal, false);
        self.def_mut(symbol).extra = true;
        self.table.lex_rules.push(LexRuleDef {
            symbol: symbol.raw(),
            pattern: PatternDef::Regex(regex.to_owned()),
        });
        symbol
    }

    /// Declares a terminal produced by an external scanner.
    pub fn external(&mut self, name: &str) -> Symbol {
        let symbol = self.declare(name, SymbolKind::External, true);
        self.table.external_tokens.push(symbol.raw());
        symbol
    }

    pub fn nonterminal(&mut self, name: &str) -> Symbol {
        self.declare(name, SymbolKind::Nonterminal, true)
    }

    /// Sets the precedence of a terminal.
    pub fn precedence(
        &mut self,
        symbol: Symbol,
        precedence: i32,
        associativity: Option<Associativity>,
    ) -> &mut Self {
        let def = self.def_mut(symbol);
        def.precedence = precedence;
        def.associativity = associativity;
        self
    }

    pub fn rule(&mut self, lhs: Symbol, child_count: u16) -> RuleId {
        self.rule_with(RuleDef {
            lhs: lhs.raw(),
            child_count,
            precedence: 0,
            associativity: None,
            dynamic_precedence: 0,
        })
    }

    pub fn rule_with(&mut self, rule: RuleDef) -> RuleId {
        self.table.rules.push(rule);
        RuleId::new((self.table.rules.len() - 1) as u16)
    }

    pub fn state(&mut self) -> StateId {
        self.table.states.push(StateDef::default());
        StateId::new((self.table.states.len() - 1) as u16)
    }

    pub fn action(&mut self, state: StateId, symbol: Symbol, action: Action) -> &mut Self {
        let action = match action {
            Action::Shift { state } => ActionDef::Shift(state.raw()),
            Action::ShiftExtra => ActionDef::ShiftExtra,
            Action::Reduce { rule } => ActionDef::Reduce(rule.raw()),
            Action::Accept => ActionDef::Accept,
        };
        self.table.states[state.index()].actions.entry(symbol.raw()).or_default().push(action);
        self
    }

    pub fn goto(&mut self, state: StateId, symbol: Symbol, target: StateId) -> &mut Self {
        self.table.states[state.index()].gotos.insert(symbol.raw(), target.raw());
        self
    }

    pub fn start_state(&mut self, state: StateId) -> &mut Self {
        self.table.start_state = state.raw();
        self
    }

    /// Returns the table in its serializable form.
    pub fn into_table(self) -> TableFile {
        self.table
    }

    pub fn build(&self) -> Result<Language, TableError> {
        Language::from_table(&self.table)
    }
}
