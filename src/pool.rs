use crate::interner::Interner;

/// Alignment, in bytes, of every string copied into the frozen pool.
pub const POOL_ALIGNMENT: usize = 4;

/// Location of a string inside a [`StringPool`].
///
/// The length is stored explicitly; the pool holds no terminators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PoolStr {
    offset: u32,
    len: u32,
}

/// Rounds `len` up to the next multiple of [`POOL_ALIGNMENT`].
pub(crate) fn padded_len(len: usize) -> usize {
    (len + POOL_ALIGNMENT - 1) & !(POOL_ALIGNMENT - 1)
}

/// Single contiguous buffer holding every distinct string of a frozen map.
#[derive(Debug)]
pub(crate) struct StringPool {
    buffer: Box<[u8]>,
}

impl StringPool {
    /// Copies the strings of `interner` marked in `live` into one allocation.
    ///
    /// Returns the pool and a table mapping each interner symbol (by index)
    /// to its location in the pool. Live strings are laid out in
    /// first-interned order, so the same interner always yields the same
    /// pool. Symbols not marked live map to an empty string and take no
    /// space.
    ///
    /// # Panics
    ///
    /// Panics if `live` does not cover every symbol, or if the pool would
    /// exceed `u32::MAX` bytes.
    pub(crate) fn compact(interner: &Interner, live: &[bool]) -> (Self, Vec<PoolStr>) {
        assert_eq!(live.len(), interner.len());
        let total: usize = interner
            .iter()
            .filter(|(symbol, _)| live[symbol.index()])
            .map(|(_, s)| padded_len(s.len()))
            .sum();
        assert!(
            total <= u32::MAX as usize,
            "string pool of {total} bytes exceeds the 4 GiB limit"
        );

        let mut buffer = vec![0u8; total].into_boxed_slice();
        let mut mapping = Vec::with_capacity(interner.len());
        let mut offset = 0usize;
        for (symbol, bytes) in interner.iter() {
            debug_assert_eq!(symbol.index(), mapping.len());
            if !live[symbol.index()] {
                mapping.push(PoolStr { offset: 0, len: 0 });
                continue;
            }
            buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
            mapping.push(PoolStr {
                offset: offset as u32,
                len: bytes.len() as u32,
            });
            offset += padded_len(bytes.len());
        }
        debug_assert_eq!(offset, total);

        (StringPool { buffer }, mapping)
    }

    #[inline]
    pub(crate) fn resolve(&self, s: PoolStr) -> &[u8] {
        let start = s.offset as usize;
        &self.buffer[start..start + s.len as usize]
    }

    /// Size of the pool in bytes, padding included.
    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }

    #[cfg(test)]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_len() {
        assert_eq!(padded_len(0), 0);
        assert_eq!(padded_len(1), 4);
        assert_eq!(padded_len(4), 4);
        assert_eq!(padded_len(5), 8);
        assert_eq!(padded_len(11), 12);
    }

    #[test]
    fn test_compact() {
        let mut interner = Interner::default();
        let words: [&[u8]; 5] = [b"a", b"hello world", b"", b"abcd", b"a"];
        let symbols: Vec<_> = words.iter().map(|w| interner.intern(w)).collect();

        let (pool, mapping) = StringPool::compact(&interner, &[true; 4]);
        assert_eq!(mapping.len(), 4);
        assert_eq!(pool.len(), 4 + 12 + 0 + 4);

        for (word, symbol) in words.iter().zip(&symbols) {
            let s = mapping[symbol.index()];
            assert!(s.offset as usize + s.len as usize <= pool.len());
            assert_eq!(s.offset as usize % POOL_ALIGNMENT, 0);
            assert_eq!(pool.resolve(s), *word);
        }
        assert_eq!(mapping[symbols[0].index()], mapping[symbols[4].index()]);
    }

    #[test]
    fn test_compact_empty() {
        let interner = Interner::default();
        let (pool, mapping) = StringPool::compact(&interner, &[]);
        assert_eq!(pool.len(), 0);
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_compact_skips_dead_strings() {
        let mut interner = Interner::default();
        let a = interner.intern(b"alive");
        let dead = interner.intern(&[b'x'; 1000]);
        let b = interner.intern(b"ok");

        let (pool, mapping) = StringPool::compact(&interner, &[true, false, true]);
        assert_eq!(pool.len(), 8 + 4);
        assert_eq!(pool.resolve(mapping[a.index()]), b"alive");
        assert_eq!(pool.resolve(mapping[b.index()]), b"ok");
        assert_eq!(mapping[b.index()].offset, 8);
        assert_eq!(mapping[dead.index()].len, 0);
    }
}
