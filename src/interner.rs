use std::collections::HashMap;
use std::sync::Arc;

use foldhash::fast::FixedState;

/// Handle to a string stored in an [`Interner`].
///
/// Symbols are dense indices assigned in first-interned order, which lets the
/// pool compactor map them with a plain vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Symbol(u32);

impl Symbol {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Build-phase string deduplicator.
///
/// Every distinct byte string is stored once; interning the same content
/// again returns the existing [`Symbol`]. The interner only lives as long as
/// the builder and is dropped by [`FrozenMapBuilder::freeze`](crate::FrozenMapBuilder::freeze).
#[derive(Debug)]
pub(crate) struct Interner {
    index: HashMap<Arc<[u8]>, Symbol, FixedState>,
    strings: Vec<Arc<[u8]>>,
    bytes: usize,
}

impl Default for Interner {
    fn default() -> Self {
        Self {
            index: HashMap::with_hasher(FixedState::default()),
            strings: Vec::new(),
            bytes: 0,
        }
    }
}

impl Interner {
    /// Returns the canonical symbol for `bytes`, storing a copy on first sight.
    pub(crate) fn intern(&mut self, bytes: &[u8]) -> Symbol {
        if let Some(&symbol) = self.index.get(bytes) {
            return symbol;
        }
        assert!(
            self.strings.len() < u32::MAX as usize,
            "interner exhausted its symbol space"
        );
        let symbol = Symbol(self.strings.len() as u32);
        let stored: Arc<[u8]> = Arc::from(bytes);
        self.bytes += stored.len();
        self.strings.push(stored.clone());
        self.index.insert(stored, symbol);
        symbol
    }

    /// Resolves a symbol produced by this interner.
    pub(crate) fn resolve(&self, symbol: Symbol) -> &[u8] {
        &self.strings[symbol.index()]
    }

    /// Iterates over every distinct string in first-interned order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (Symbol, &[u8])> + '_ {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (Symbol(i as u32), &s[..]))
    }

    pub(crate) fn len(&self) -> usize {
        self.strings.len()
    }

    /// Total number of content bytes held, before padding.
    pub(crate) fn bytes(&self) -> usize {
        self.bytes
    }
}
