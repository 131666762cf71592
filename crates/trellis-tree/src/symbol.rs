use std::fmt;

/// A grammar symbol: a terminal or a nonterminal.
///
/// Symbols index into the language's symbol list, except for the two
/// reserved values [`Symbol::END`] and [`Symbol::ERROR`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u16);

impl Symbol {
    /// End of input.
    pub const END: Self = Self(0);
    /// Lexical error tokens and error nodes.
    pub const ERROR: Self = Self(u16::MAX);

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

    #[inline]
    pub const fn is_error(self) -> bool {
        self.0 == Self::ERROR.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::END => f.write_str("Symbol(END)"),
            Self::ERROR => f.write_str("Symbol(ERROR)"),
            Self(raw) => write!(f, "Symbol({raw})"),
        }
    }
}

/// A state of the compiled parse table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StateId(u16);

impl StateId {
    /// Pseudo state used while recovering from errors: the lexer accepts
    /// every token in it.
    pub const ERROR_RECOVERY: Self = Self(u16::MAX);

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

impl fmt::Debug for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ERROR_RECOVERY {
            f.write_str("StateId(ERROR_RECOVERY)")
        } else {
            write!(f, "StateId({})", self.0)
        }
    }
}

/// Display information about one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: Box<str>,
    /// Hidden symbols are kept in the green tree but flattened out of the
    /// red API.
    pub visible: bool,
    /// Named symbols show up in S-expressions; anonymous ones (punctuation,
    /// keywords) don't.
    pub named: bool,
}

impl SymbolInfo {
    pub fn new(name: impl Into<Box<str>>, visible: bool, named: bool) -> Self {
        Self { name: name.into(), visible, named }
    }
}

/// Names and visibility of a language's symbols, plus the language identity
/// every tree carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    language: Box<str>,
    version: u32,
    symbols: Box<[SymbolInfo]>,
}

impl SymbolTable {
    pub fn new(language: impl Into<Box<str>>, version: u32, symbols: Vec<SymbolInfo>) -> Self {
        Self { language: language.into(), version, symbols: symbols.into_boxed_slice() }
    }

    /// Returns the language name.
    #[inline]
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Returns the ABI version of the table the symbols come from.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the number of declared symbols.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Returns `symbol`'s display information, if it is declared.
    #[inline]
    pub fn get(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.symbols.get(symbol.index())
    }

    /// Returns the name of `symbol`.
    pub fn name(&self, symbol: Symbol) -> &str {
        if symbol.is_error() {
            return "ERROR";
        }
        self.get(symbol).map_or("<unknown>", |info| &info.name)
    }

    /// Returns `true` if nodes of this symbol appear in the red API.
    pub fn is_visible(&self, symbol: Symbol) -> bool {
        symbol.is_error() || self.get(symbol).is_some_and(|info| info.visible)
    }

    /// Returns `true` if nodes of this symbol are named.
    pub fn is_named(&self, symbol: Symbol) -> bool {
        symbol.is_error() || self.get(symbol).is_some_and(|info| info.named)
    }

    /// Looks a symbol up by name.
    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        if name == "ERROR" {
            return Some(Symbol::ERROR);
        }
        self.symbols.iter().position(|info| &*info.name == name).map(|index| Symbol(index as u16))
    }
}
