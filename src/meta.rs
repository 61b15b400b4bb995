use serde::Serialize;

/// Summary of a frozen map, produced by
/// [`FrozenMapBuilder::freeze`](crate::FrozenMapBuilder::freeze).
#[derive(Debug, Serialize, Default, Clone, PartialEq, Eq)]
pub struct FrozenMapInfo {
    /// Number of keys stored.
    pub entry_count: usize,
    /// Number of slots in the entry array (a power of two).
    pub capacity: usize,
    /// Number of distinct strings copied into the pool.
    pub distinct_strings: usize,
    /// Length of the longest collision chain.
    pub max_chain_length: usize,
    /// Size of the string pool, padding included.
    pub pool_bytes: usize,
    /// Bytes taken by the element arrays of table values.
    ///
    /// The table records themselves sit inline in the entry array and are
    /// counted in `entry_bytes`.
    pub table_bytes: usize,
    /// Bytes taken by the entry array.
    pub entry_bytes: usize,
    /// Bytes taken by the map handle itself.
    pub header_bytes: usize,
    /// Total memory held by the frozen map.
    pub footprint: usize,
}
