//! Runtime form of a parse table.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexSet;
use rustc_hash::FxHashMap;
use trellis_tree::{StateId, Symbol, SymbolInfo, SymbolSet, SymbolTable};

use crate::format::{ActionDef, Associativity, PatternDef, SymbolKind, TableFile};
use crate::{LexRule, TableError};

/// Table layout version this crate understands.
pub const ABI_VERSION: u32 = 1;

/// Index of a grammar rule.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(u16);

impl RuleId {
    #[inline]
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Shift { state: StateId },
    /// Shift an extra without leaving the current state.
    ShiftExtra,
    Reduce { rule: RuleId },
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymbolMetadata {
    pub kind: SymbolKind,
    pub extra: bool,
    pub precedence: i32,
    pub associativity: Option<Associativity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub lhs: Symbol,
    /// Number of non-extra children the rule pops.
    pub child_count: u16,
    pub precedence: i32,
    pub associativity: Option<Associativity>,
    pub dynamic_precedence: i32,
}

#[derive(Debug, Default)]
struct ParseState {
    actions: FxHashMap<Symbol, Box<[Action]>>,
    gotos: FxHashMap<Symbol, StateId>,
}

/// The terminals the lexer may produce in a group of states.
#[derive(Debug)]
pub struct LexMode {
    valid: SymbolSet,
    rules: Box<[u16]>,
    externals: SymbolSet,
}

impl LexMode {
    #[inline]
    pub fn valid(&self) -> &SymbolSet {
        &self.valid
    }

    /// Indices into [`Language::lex_rules`] of the rules valid in this mode,
    /// in declaration order.
    #[inline]
    pub fn rules(&self) -> &[u16] {
        &self.rules
    }

    /// External tokens valid in this mode.
    #[inline]
    pub fn externals(&self) -> &SymbolSet {
        &self.externals
    }
}

/// An immutable, validated parse table with compiled lexical rules.
pub struct Language {
    symbols: Arc<SymbolTable>,
    metadata: Box<[SymbolMetadata]>,
    rules: Box<[Rule]>,
    states: Box<[ParseState]>,
    lex_rules: Box<[LexRule]>,
    lex_modes: Box<[LexMode]>,
    state_lex_modes: Box<[u16]>,
    recovery_lex_mode: u16,
    extras: SymbolSet,
    external_tokens: Box<[Symbol]>,
    start_state: StateId,
}

const NO_ACTIONS: &[Action] = &[];

impl Language {
    /// Parses and validates a JSON table.
    pub fn from_json(json: &str) -> Result<Self, TableError> {
        Self::from_table(&serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let file = std::fs::File::open(path)?;
        Self::from_table(&serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Validates a table and compiles its lexical rules.
    pub fn from_table(table: &TableFile) -> Result<Self, TableError> {
        if table.abi_version != ABI_VERSION {
            return Err(TableError::UnsupportedVersion {
                found: table.abi_version,
                expected: ABI_VERSION,
            });
        }
        if table.symbols.is_empty() {
            return Err(TableError::NoSymbols);
        }
        let max = usize::from(u16::MAX) - 1;
        for (what, count) in
            [("symbols", table.symbols.len()), ("states", table.states.len()), ("rules", table.rules.len())]
        {
            if count > max {
                return Err(TableError::TooLarge { what, count, max });
            }
        }

        let check = Checker { table };
        let symbols = Arc::new(SymbolTable::new(
            table.name.as_str(),
            table.abi_version,
            table.symbols.iter().map(|def| SymbolInfo::new(def.name.as_str(), def.visible, def.named)).collect(),
        ));
        let metadata: Box<[SymbolMetadata]> = table
            .symbols
            .iter()
            .map(|def| SymbolMetadata {
                kind: def.kind,
                extra: def.extra,
                precedence: def.precedence,
                associativity: def.associativity,
            })
            .collect();

        let mut extras = SymbolSet::with_capacity(table.symbols.len());
        for (raw, def) in table.symbols.iter().enumerate() {
            if def.extra {
                let raw = raw as u16;
                check.terminal(raw, || format!("extra `{}`", def.name))?;
                extras.insert(Symbol::new(raw));
            }
        }

        let mut rules = Vec::with_capacity(table.rules.len());
        for (index, def) in table.rules.iter().enumerate() {
            check.nonterminal(def.lhs, || format!("rule {index}"))?;
            rules.push(Rule {
                lhs: Symbol::new(def.lhs),
                child_count: def.child_count,
                precedence: def.precedence,
                associativity: def.associativity,
                dynamic_precedence: def.dynamic_precedence,
            });
        }

        let mut lex_rules = Vec::with_capacity(table.lex_rules.len());
        for (index, def) in table.lex_rules.iter().enumerate() {
            check.terminal(def.symbol, || format!("lexical rule {index}"))?;
            if table.symbols[usize::from(def.symbol)].kind == SymbolKind::External {
                return Err(check.wrong_kind(def.symbol, format!("lexical rule {index}"), "terminal"));
            }
            let symbol = Symbol::new(def.symbol);
            lex_rules.push(match &def.pattern {
                PatternDef::Literal(text) => LexRule::literal(symbol, text),
                PatternDef::Regex(pattern) => {
                    LexRule::regex(symbol, pattern).map_err(|message| TableError::Regex {
                        name: table.symbols[usize::from(def.symbol)].name.clone(),
                        pattern: pattern.clone(),
                        message,
                    })?
                }
            });
        }

        let mut external_tokens = Vec::with_capacity(table.external_tokens.len());
        for &raw in &table.external_tokens {
            check.symbol(raw, || "external token list".to_owned())?;
            if table.symbols[usize::from(raw)].kind != SymbolKind::External {
                return Err(check.wrong_kind(raw, "external token list".to_owned(), "external token"));
            }
            external_tokens.push(Symbol::new(raw));
        }

        let mut states = Vec::with_capacity(table.states.len());
        for (index, def) in table.states.iter().enumerate() {
            let mut state = ParseState::default();
            for (&raw, actions) in &def.actions {
                check.terminal(raw, || format!("state {index}"))?;
                let actions = actions
                    .iter()
                    .map(|action| check.action(*action, || format!("state {index}")))
                    .collect::<Result<Box<[_]>, _>>()?;
                state.actions.insert(Symbol::new(raw), actions);
            }
            for (&raw, &target) in &def.gotos {
                check.nonterminal(raw, || format!("goto of state {index}"))?;
                check.state(target, || format!("goto of state {index}"))?;
                state.gotos.insert(Symbol::new(raw), StateId::new(target));
            }
            states.push(state);
        }
        check.state(table.start_state, || "start state".to_owned())?;

        // One lex mode per distinct set of valid terminals.
        let mut mode_sets: IndexSet<SymbolSet> = IndexSet::new();
        let state_lex_modes: Box<[u16]> = states
            .iter()
            .map(|state| {
                let valid: SymbolSet = state.actions.keys().copied().collect();
                mode_sets.insert_full(valid.union(&extras)).0 as u16
            })
            .collect();
        let all_terminals: SymbolSet = metadata
            .iter()
            .enumerate()
            .filter(|(_, meta)| meta.kind != SymbolKind::Nonterminal)
            .map(|(raw, _)| Symbol::new(raw as u16))
            .collect();
        let recovery_lex_mode = mode_sets.insert_full(all_terminals).0 as u16;

        let external_set: SymbolSet = external_tokens.iter().copied().collect();
        let lex_modes: Box<[LexMode]> = mode_sets
            .into_iter()
            .map(|valid| LexMode {
                rules: lex_rules
                    .iter()
                    .enumerate()
                    .filter(|(_, rule)| valid.contains(rule.symbol()))
                    .map(|(index, _)| index as u16)
                    .collect(),
                externals: valid.iter().filter(|symbol| external_set.contains(*symbol)).collect(),
                valid,
            })
            .collect();

        tracing::debug!(
            language = %table.name,
            symbols = metadata.len(),
            states = states.len(),
            lex_modes = lex_modes.len(),
            "loaded parse table"
        );

        Ok(Self {
            symbols,
            metadata,
            rules: rules.into_boxed_slice(),
            states: states.into_boxed_slice(),
            lex_rules: lex_rules.into_boxed_slice(),
            lex_modes,
            state_lex_modes,
            recovery_lex_mode,
            extras,
            external_tokens: external_tokens.into_boxed_slice(),
            start_state: StateId::new(table.start_state),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.symbols.language()
    }

    #[inline]
    pub fn abi_version(&self) -> u32 {
        self.symbols.version()
    }

    /// Names and visibility of every symbol, shared with the trees.
    #[inline]
    pub fn symbols(&self) -> &Arc<SymbolTable> {
        &self.symbols
    }

    #[inline]
    pub fn symbol_count(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[inline]
    pub fn start_state(&self) -> StateId {
        self.start_state
    }

    pub fn metadata(&self, symbol: Symbol) -> Option<&SymbolMetadata> {
        self.metadata.get(symbol.index())
    }

    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.extras.contains(symbol)
    }

    #[inline]
    pub fn extras(&self) -> &SymbolSet {
        &self.extras
    }

    /// Returns `true` for anything the lexer can produce, `ERROR` included.
    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        symbol.is_error() || self.metadata(symbol).is_some_and(|meta| meta.kind != SymbolKind::Nonterminal)
    }

    pub fn rule(&self, rule: RuleId) -> &Rule {
        &self.rules[rule.index()]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Returns the actions for `symbol` in `state`, possibly several when the
    /// table has a conflict there.
    pub fn actions(&self, state: StateId, symbol: Symbol) -> &[Action] {
        self.states
            .get(state.index())
            .and_then(|parse_state| parse_state.actions.get(&symbol))
            .map_or(NO_ACTIONS, |actions| &actions[..])
    }

    pub fn has_actions(&self, state: StateId, symbol: Symbol) -> bool {
        !self.actions(state, symbol).is_empty()
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        self.states.get(state.index())?.gotos.get(&symbol).copied()
    }

    /// Returns the state reached by shifting `symbol` in `state`, following a
    /// goto for nonterminals.
    pub fn next_state(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        if let Some(target) = self.goto(state, symbol) {
            return Some(target);
        }
        self.actions(state, symbol).iter().find_map(|action| match action {
            Action::Shift { state } => Some(*state),
            _ => None,
        })
    }

    #[inline]
    pub fn lex_rules(&self) -> &[LexRule] {
        &self.lex_rules
    }

    /// Returns the lex mode id of `state`. The error-recovery state lexes
    /// with every terminal.
    pub fn lex_mode_id(&self, state: StateId) -> u16 {
        if state == StateId::ERROR_RECOVERY {
            return self.recovery_lex_mode;
        }
        self.state_lex_modes.get(state.index()).copied().unwrap_or(self.recovery_lex_mode)
    }

    pub fn lex_mode(&self, id: u16) -> &LexMode {
        &self.lex_modes[usize::from(id)]
    }

    /// The mode with every terminal valid.
    #[inline]
    pub fn recovery_lex_mode(&self) -> u16 {
        self.recovery_lex_mode
    }

    #[inline]
    pub fn external_tokens(&self) -> &[Symbol] {
        &self.external_tokens
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("name", &self.name())
            .field("abi_version", &self.abi_version())
            .field("symbols", &self.metadata.len())
            .field("states", &self.states.len())
            .finish_non_exhaustive()
    }
}

/// Reference checks against the raw table.
struct Checker<'a> {
    table: &'a TableFile,
}

impl Checker<'_> {
    fn symbol(&self, raw: u16, context: impl FnOnce() -> String) -> Result<SymbolKind, TableError> {
        match self.table.symbols.get(usize::from(raw)) {
            Some(def) => Ok(def.kind),
            None => Err(TableError::DanglingSymbol { context: context(), symbol: raw }),
        }
    }

    fn terminal(&self, raw: u16, context: impl FnOnce() -> String) -> Result<(), TableError> {
        let context = context();
        match self.symbol(raw, || context.clone())? {
            SymbolKind::Nonterminal => Err(self.wrong_kind(raw, context, "terminal")),
            SymbolKind::Terminal | SymbolKind::External => Ok(()),
        }
    }

    fn nonterminal(&self, raw: u16, context: impl FnOnce() -> String) -> Result<(), TableError> {
        let context = context();
        match self.symbol(raw, || context.clone())? {
            SymbolKind::Nonterminal => Ok(()),
            SymbolKind::Terminal | SymbolKind::External => {
                Err(self.wrong_kind(raw, context, "nonterminal"))
            }
        }
    }

    fn state(&self, raw: u16, context: impl FnOnce() -> String) -> Result<(), TableError> {
        if usize::from(raw) < self.table.states.len() {
            Ok(())
        } else {
            Err(TableError::DanglingState { context: context(), state: raw })
        }
    }

    fn action(&self, action: ActionDef, context: impl FnOnce() -> String) -> Result<Action, TableError> {
        Ok(match action {
            ActionDef::Shift(state) => {
                self.state(state, context)?;
                Action::Shift { state: StateId::new(state) }
            }
            ActionDef::Reduce(rule) => {
                if usize::from(rule) >= self.table.rules.len() {
                    return Err(TableError::DanglingRule { context: context(), rule });
                }
                Action::Reduce { rule: RuleId::new(rule) }
            }
            ActionDef::Accept => Action::Accept,
            ActionDef::ShiftExtra => Action::ShiftExtra,
        })
    }

    fn wrong_kind(&self, raw: u16, context: String, expected: &'static str) -> TableError {
        TableError::WrongKind {
            context,
            name: self.table.symbols[usize::from(raw)].name.clone(),
            expected,
        }
    }
}
