use std::io::{Error, ErrorKind, Result};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::interner::{Interner, Symbol};
use crate::pool::{PoolStr, StringPool};
use crate::table::{HashTable, MAX_CAPACITY, Node, Stored};
use crate::{FrozenMap, Table, Value, hash_bytes};

/// What [`FrozenMapBuilder::insert`] does with a key that is already present.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeys {
    /// Replace the stored value; the last write wins.
    #[default]
    Overwrite,
    /// Fail with `ErrorKind::AlreadyExists` and keep the first value.
    Reject,
}

/// Build-time settings of a [`FrozenMapBuilder`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FrozenMapConfig {
    /// Number of slots allocated up front, rounded up to a power of two.
    pub initial_capacity: usize,
    /// Policy applied when a key is inserted twice.
    pub duplicate_keys: DuplicateKeys,
}

impl Default for FrozenMapConfig {
    fn default() -> Self {
        FrozenMapConfig {
            initial_capacity: 1,
            duplicate_keys: DuplicateKeys::default(),
        }
    }
}

/// Mutable, single-threaded handle used to load a [`FrozenMap`].
///
/// Keys and values are copied in by [`insert`](Self::insert); every byte
/// string (keys, string and code payloads, table elements) is deduplicated
/// through an internal interner. Once loading is done,
/// [`freeze`](Self::freeze) consumes the builder and compacts everything into
/// a read-only [`FrozenMap`].
///
/// ```
/// use frozenmap::{FrozenMapBuilder, Value};
///
/// # fn main() -> std::io::Result<()> {
/// let mut builder = FrozenMapBuilder::default();
/// builder.insert("a", Value::Number(1.0))?;
/// builder.insert("b", Value::from("hello world"))?;
/// let map = builder.freeze();
/// assert_eq!(map.get("a"), Some(Value::Number(1.0)));
/// assert_eq!(map.get("z"), None);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FrozenMapBuilder {
    config: FrozenMapConfig,
    table: HashTable<Symbol>,
    interner: Interner,
}

impl Default for FrozenMapBuilder {
    fn default() -> Self {
        let config = FrozenMapConfig::default();
        Self {
            table: HashTable::with_capacity(config.initial_capacity),
            config,
            interner: Interner::default(),
        }
    }
}

fn check_capacity(capacity: usize) -> Result<()> {
    if capacity > MAX_CAPACITY {
        return Err(Error::new(
            ErrorKind::InvalidInput,
            format!("initial capacity {capacity} exceeds the limit of {MAX_CAPACITY} slots"),
        ));
    }
    Ok(())
}

impl FrozenMapBuilder {
    /// Creates an empty builder from an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidInput` if `config.initial_capacity` exceeds
    /// [`MAX_CAPACITY`](crate::MAX_CAPACITY).
    pub fn with_config(config: FrozenMapConfig) -> Result<Self> {
        check_capacity(config.initial_capacity)?;
        Ok(Self {
            table: HashTable::with_capacity(config.initial_capacity),
            config,
            interner: Interner::default(),
        })
    }

    /// Pre-sizes the entry array to avoid rehashing while loading.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::InvalidInput` if `capacity` exceeds
    /// [`MAX_CAPACITY`](crate::MAX_CAPACITY).
    ///
    /// # Panics
    ///
    /// Panics if entries have already been inserted.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Result<Self> {
        assert!(
            self.table.len() == 0,
            "initial capacity must be set before inserting"
        );
        check_capacity(capacity)?;
        self.config.initial_capacity = capacity;
        self.table = HashTable::with_capacity(capacity);
        Ok(self)
    }

    /// Sets the policy for keys that are inserted more than once.
    pub fn with_duplicate_keys(mut self, policy: DuplicateKeys) -> Self {
        self.config.duplicate_keys = policy;
        self
    }

    /// Returns the configuration this builder was created with.
    pub fn config(&self) -> &FrozenMapConfig {
        &self.config
    }

    /// Inserts `value` under `key`, copying and interning all byte payloads.
    ///
    /// # Errors
    ///
    /// Returns `ErrorKind::AlreadyExists` when `key` is already present and
    /// the builder was configured with [`DuplicateKeys::Reject`].
    pub fn insert<K: AsRef<[u8]> + ?Sized>(&mut self, key: &K, value: Value<'_>) -> Result<()> {
        let key = key.as_ref();
        let hash = hash_bytes(key);
        if let Some(index) = self.find(hash, key) {
            return match self.config.duplicate_keys {
                DuplicateKeys::Reject => Err(Error::new(
                    ErrorKind::AlreadyExists,
                    format!("duplicate key: {:?}", String::from_utf8_lossy(key)),
                )),
                DuplicateKeys::Overwrite => {
                    let value = self.absorb(value);
                    if let Some(node) = self.table.node_mut(index) {
                        node.value = value;
                    }
                    Ok(())
                }
            };
        }

        let key = self.interner.intern(key);
        let value = self.absorb(value);
        self.table.insert(Node::new(hash, key, value));
        Ok(())
    }

    /// Copies an external value into interner-owned storage.
    fn absorb(&mut self, value: Value<'_>) -> Stored<Symbol> {
        match value {
            Value::Nil => Stored::Nil,
            Value::Number(n) => Stored::Number(n),
            Value::Boolean(b) => Stored::Boolean(b),
            Value::String(s) => Stored::String(self.interner.intern(s)),
            Value::Code(s) => Stored::Code(self.interner.intern(s)),
            Value::Table(items) => {
                Stored::Table(items.iter().map(|s| self.interner.intern(s)).collect())
            }
        }
    }

    fn find(&self, hash: u32, key: &[u8]) -> Option<usize> {
        self.table.find(hash, |s| self.interner.resolve(*s) == key)
    }

    /// Looks up `key` in the partially built map.
    ///
    /// Returned values borrow interner memory; they are logically identical
    /// to what the frozen map returns for the same key.
    pub fn get<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Option<Value<'_>> {
        let key = key.as_ref();
        let index = self.find(hash_bytes(key), key)?;
        let node = self.table.node(index)?;
        let interner = &self.interner;
        Some(Value::from_stored(
            &node.value,
            move |s| interner.resolve(s),
            move |items| Table::interned(interner, items),
        ))
    }

    /// Returns `true` if `key` has been inserted.
    pub fn contains_key<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> bool {
        let key = key.as_ref();
        self.find(hash_bytes(key), key).is_some()
    }

    /// Number of distinct keys inserted so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if nothing has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Current number of slots in the entry array.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Number of distinct byte strings held by the interner.
    pub fn interned_count(&self) -> usize {
        self.interner.len()
    }

    /// Lists every distinct string held by the interner, in first-seen order.
    pub fn interned_strings(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.interner.iter().map(|(_, s)| s)
    }

    /// Compacts the builder into an immutable [`FrozenMap`].
    ///
    /// Every distinct string still referenced by a key or value is copied
    /// once into a single pool buffer, every key, payload and table element
    /// is rewritten to point into it, and the interner is released. Strings
    /// only used by overwritten values are left out. The returned map reports its memory
    /// [`footprint`](FrozenMap::footprint).
    ///
    /// Taking `self` by value makes inserting after a freeze, or freezing
    /// twice, impossible.
    pub fn freeze(self) -> FrozenMap {
        let FrozenMapBuilder { table, interner, .. } = self;
        debug!(
            "Compacting {} interned strings ({} bytes) for {} entries",
            interner.len(),
            interner.bytes(),
            table.len()
        );

        let mut live = vec![false; interner.len()];
        for node in table.iter() {
            live[node.key.index()] = true;
            for s in node.value.refs() {
                live[s.index()] = true;
            }
        }
        let distinct_strings = live.iter().filter(|&&l| l).count();
        if distinct_strings < interner.len() {
            debug!(
                "Dropping {} strings only referenced by overwritten values",
                interner.len() - distinct_strings
            );
        }

        let (pool, mapping) = StringPool::compact(&interner, &live);
        let table = table.map(|s| mapping[s.index()]);
        drop(interner);

        let table_bytes = table
            .iter()
            .map(|node| match &node.value {
                Stored::Table(items) => std::mem::size_of_val::<[PoolStr]>(items),
                _ => 0,
            })
            .sum();

        let map = FrozenMap::from_parts(table, pool, distinct_strings, table_bytes);
        let info = map.info();
        info!(
            "Frozen map ready: {} entries, footprint {} bytes (pool {}, tables {}, entries {}, header {})",
            info.entry_count,
            info.footprint,
            info.pool_bytes,
            info.table_bytes,
            info.entry_bytes,
            info.header_bytes
        );
        map
    }
}
