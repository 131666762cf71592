use std::hash::{Hash, Hasher};

use crate::Symbol;

const BITS_PER_SLOT: usize = u64::BITS as usize;

/// Set of symbols backed by a bitset sized for the language.
#[derive(Debug, Clone, Default)]
pub struct SymbolSet {
    bits: Vec<u64>,
}

impl PartialEq for SymbolSet {
    fn eq(&self, other: &Self) -> bool {
        self.significant() == other.significant()
    }
}

impl Eq for SymbolSet {}

impl Hash for SymbolSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant().hash(state);
    }
}

impl SymbolSet {
    pub const EMPTY: Self = Self { bits: Vec::new() };

    /// Creates an empty set with room for `capacity` symbols.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { bits: vec![0; capacity.div_ceil(BITS_PER_SLOT)] }
    }

    pub fn insert(&mut self, symbol: Symbol) {
        let (slot, mask) = Self::slot(symbol);
        if slot >= self.bits.len() {
            self.bits.resize(slot + 1, 0);
        }
        self.bits[slot] |= mask;
    }

    pub fn contains(&self, symbol: Symbol) -> bool {
        let (slot, mask) = Self::slot(symbol);
        self.bits.get(slot).is_some_and(|bits| bits & mask != 0)
    }

    pub fn union(mut self, other: &Self) -> Self {
        if self.bits.len() < other.bits.len() {
            self.bits.resize(other.bits.len(), 0);
        }
        for (bits, other) in self.bits.iter_mut().zip(&other.bits) {
            *bits |= other;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&bits| bits == 0)
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.bits.iter().enumerate().flat_map(|(slot, &bits)| {
            (0..BITS_PER_SLOT)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| Symbol::new((slot * BITS_PER_SLOT + bit) as u16))
        })
    }

    /// Bits without trailing empty slots.
    fn significant(&self) -> &[u64] {
        let len = self.bits.iter().rposition(|&bits| bits != 0).map_or(0, |last| last + 1);
        &self.bits[..len]
    }

    #[inline]
    fn slot(symbol: Symbol) -> (usize, u64) {
        let index = symbol.index();
        (index / BITS_PER_SLOT, 1 << (index % BITS_PER_SLOT))
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for symbol in iter {
            set.insert(symbol);
        }
        set
    }
}
