//! On-disk JSON representation of a parse table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A whole table file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFile {
    pub name: String,
    pub abi_version: u32,
    /// Symbol 0 is the end-of-input terminal.
    pub symbols: Vec<SymbolDef>,
    #[serde(default)]
    pub lex_rules: Vec<LexRuleDef>,
    #[serde(default)]
    pub rules: Vec<RuleDef>,
    pub states: Vec<StateDef>,
    #[serde(default)]
    pub start_state: u16,
    /// Terminals produced by an external scanner, in the order the scanner
    /// knows them.
    #[serde(default)]
    pub external_tokens: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Associativity {
    Left,
    Right,
    #[serde(rename = "nonassoc")]
    NonAssoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default)]
    pub named: bool,
    #[serde(default)]
    pub extra: bool,
    #[serde(default)]
    pub precedence: i32,
    #[serde(default)]
    pub associativity: Option<Associativity>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternDef {
    Literal(String),
    Regex(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexRuleDef {
    pub symbol: u16,
    pub pattern: PatternDef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    pub lhs: u16,
    pub child_count: u16,
    #[serde(default)]
    pub precedence: i32,
    #[serde(default)]
    pub associativity: Option<Associativity>,
    #[serde(default)]
    pub dynamic_precedence: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionDef {
    Shift(u16),
    Reduce(u16),
    Accept,
    ShiftExtra,
}

/// Actions keyed by terminal, gotos keyed by nonterminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDef {
    #[serde(default)]
    pub actions: BTreeMap<u16, Vec<ActionDef>>,
    #[serde(default)]
    pub gotos: BTreeMap<u16, u16>,
}
