use crate::pool::{PoolStr, StringPool};
use crate::table::{HashTable, Node};
use crate::{FrozenMapInfo, Table, Value, hash_bytes};

/// Immutable hash map produced by [`FrozenMapBuilder::freeze`](crate::FrozenMapBuilder::freeze).
///
/// All keys and string payloads live in one contiguous pool owned by the map,
/// so the map references no memory outside itself. Nothing is mutated after
/// construction: a `FrozenMap` is `Send + Sync` and can be shared by any
/// number of reader threads, typically behind an `Arc`. Dropping the last
/// handle releases the entry array, the pool and every table array.
#[derive(Debug)]
pub struct FrozenMap {
    table: HashTable<PoolStr>,
    pool: StringPool,
    info: FrozenMapInfo,
}

impl FrozenMap {
    pub(crate) fn from_parts(
        table: HashTable<PoolStr>,
        pool: StringPool,
        distinct_strings: usize,
        table_bytes: usize,
    ) -> Self {
        let header_bytes = std::mem::size_of::<FrozenMap>();
        let entry_bytes = table.slot_bytes();
        let pool_bytes = pool.len();
        let info = FrozenMapInfo {
            entry_count: table.len(),
            capacity: table.capacity(),
            distinct_strings,
            max_chain_length: table.max_chain_length(),
            pool_bytes,
            table_bytes,
            entry_bytes,
            header_bytes,
            footprint: pool_bytes + table_bytes + entry_bytes + header_bytes,
        };
        FrozenMap { table, pool, info }
    }

    /// Returns the value stored under `key`, or `None` if it was never inserted.
    ///
    /// Keys are compared by hash, then by exact length and content.
    pub fn get<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> Option<Value<'_>> {
        let node = self.find(key.as_ref())?;
        Some(self.view(node))
    }

    /// Returns `true` if `key` is present.
    pub fn contains_key<K: AsRef<[u8]> + ?Sized>(&self, key: &K) -> bool {
        self.find(key.as_ref()).is_some()
    }

    /// Performs multiple lookups; results preserve the order of `keys`.
    pub fn batch_get<I>(&self, keys: I) -> Vec<Option<Value<'_>>>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        keys.into_iter().map(|key| self.get(key.as_ref())).collect()
    }

    /// Iterates over every entry in slot order.
    pub fn iter(&self) -> FrozenMapIter<'_> {
        FrozenMapIter {
            map: self,
            slots: self.table.slots().iter(),
        }
    }

    /// Number of keys stored.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map holds no keys.
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Number of slots in the entry array.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Total bytes held by this map, as computed at freeze time.
    pub fn footprint(&self) -> usize {
        self.info.footprint
    }

    /// Layout summary computed at freeze time.
    pub fn info(&self) -> &FrozenMapInfo {
        &self.info
    }

    fn find(&self, key: &[u8]) -> Option<&Node<PoolStr>> {
        let index = self
            .table
            .find(hash_bytes(key), |s| self.pool.resolve(*s) == key)?;
        self.table.node(index)
    }

    fn view<'a>(&'a self, node: &'a Node<PoolStr>) -> Value<'a> {
        let pool = &self.pool;
        Value::from_stored(
            &node.value,
            move |s| pool.resolve(s),
            move |items| Table::pooled(pool, items),
        )
    }
}

/// Iterator over the `(key, value)` pairs of a [`FrozenMap`].
pub struct FrozenMapIter<'a> {
    map: &'a FrozenMap,
    slots: std::slice::Iter<'a, Option<Node<PoolStr>>>,
}

impl<'a> Iterator for FrozenMapIter<'a> {
    type Item = (&'a [u8], Value<'a>);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.slots.by_ref() {
            if let Some(node) = slot {
                return Some((self.map.pool.resolve(node.key), self.map.view(node)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::*;

    fn in_pool(map: &FrozenMap, bytes: &[u8]) -> bool {
        let pool = map.pool.as_bytes().as_ptr_range();
        let slice = bytes.as_ptr_range();
        bytes.is_empty() || (pool.start <= slice.start && slice.end <= pool.end)
    }

    #[test]
    fn test_mixed_types() {
        let mut builder = FrozenMapBuilder::default();
        builder.insert("a", Value::Number(1.0)).unwrap();
        builder.insert("b", Value::from("hello world")).unwrap();
        builder.insert("c", Value::Nil).unwrap();
        let map = builder.freeze();

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a"), Some(Value::Number(1.0)));
        assert_eq!(map.get("b"), Some(Value::String(b"hello world")));
        assert_eq!(map.get("c"), Some(Value::Nil));
        assert_eq!(map.get("z"), None);
        assert!(map.contains_key("c"));
        assert!(!map.contains_key("z"));
    }

    #[test]
    fn test_growth_transparency() {
        let mut builder = FrozenMapBuilder::default();
        for i in 0..100 {
            builder.insert(&(i * 2).to_string(), Value::Number(i as f64)).unwrap();
        }
        let map = builder.freeze();
        for i in 0..100 {
            assert_eq!(map.get(&(i * 2).to_string()), Some(Value::Number(i as f64)));
        }
        for i in 0..100 {
            assert_eq!(map.get(&(i * 2 + 1).to_string()), None);
        }
    }

    #[test]
    fn test_table_round_trip() {
        let mut builder = FrozenMapBuilder::default();
        builder.insert("t", Value::table(["x", "y", "z"])).unwrap();
        builder.insert("empty", Value::table::<_, str>([])).unwrap();
        let map = builder.freeze();

        let value = map.get("t").unwrap();
        let table = value.as_table().unwrap();
        assert_eq!(table.len(), 3);
        let items: Vec<&[u8]> = table.iter().collect();
        assert_eq!(items, vec![&b"x"[..], &b"y"[..], &b"z"[..]]);
        assert!(items.iter().all(|s| in_pool(&map, s)));
        assert_eq!(value, Value::table(["x", "y", "z"]));

        assert_eq!(map.get("empty").unwrap().as_table().map(|t| t.len()), Some(0));
    }

    #[test]
    fn test_code_round_trip() {
        let mut builder = FrozenMapBuilder::default();
        builder.insert("f", Value::code("return 42")).unwrap();
        let map = builder.freeze();
        assert_eq!(map.get("f").and_then(|v| v.as_code()), Some(&b"return 42"[..]));
        assert_eq!(map.get("f").unwrap().as_bytes(), None);
    }

    #[test]
    fn test_shared_payloads() {
        let mut builder = FrozenMapBuilder::default();
        builder.insert("k1", Value::from("same payload")).unwrap();
        builder.insert("k2", Value::from("same payload")).unwrap();
        builder.insert("k3", Value::table(["same payload", "k1"])).unwrap();
        let map = builder.freeze();

        let a = map.get("k1").and_then(|v| v.as_bytes()).unwrap();
        let b = map.get("k2").and_then(|v| v.as_bytes()).unwrap();
        assert_eq!(a, b"same payload");
        assert_eq!(a.as_ptr(), b.as_ptr());
        let value = map.get("k3").unwrap();
        let table = value.as_table().unwrap();
        assert_eq!(table.get(0).unwrap().as_ptr(), a.as_ptr());

        // "k1" the key and "k1" the table element share storage too.
        let key = map.iter().find(|(k, _)| *k == b"k1").unwrap().0;
        assert_eq!(table.get(1).unwrap().as_ptr(), key.as_ptr());

        assert_eq!(map.info().distinct_strings, 4);
    }

    #[test]
    fn test_references_point_into_pool() {
        let mut builder = FrozenMapBuilder::default();
        for i in 0..50 {
            let key = format!("key-{i}");
            let value = format!("value-{}", i % 7);
            builder.insert(&key, Value::from(value.as_str())).unwrap();
        }
        let map = builder.freeze();
        let base = map.pool.as_bytes().as_ptr() as usize;
        for (key, value) in map.iter() {
            assert!(in_pool(&map, key));
            let v = value.as_bytes().unwrap();
            assert!(in_pool(&map, v));
            assert_eq!((v.as_ptr() as usize - base) % POOL_ALIGNMENT, 0);
        }
    }

    #[test]
    fn test_lookup_matches_builder() {
        let mut builder = FrozenMapBuilder::default();
        let keys: Vec<String> = (0..300).map(|i| format!("k{i}")).collect();
        for (i, key) in keys.iter().enumerate() {
            let value = match i % 5 {
                0 => Value::Nil,
                1 => Value::Number(i as f64 * 0.5),
                2 => Value::Boolean(i % 2 == 0),
                3 => Value::from(keys[i / 2].as_str()),
                _ => Value::table([keys[i / 3].as_str(), "tail"]),
            };
            builder.insert(key, value).unwrap();
        }

        let before: Vec<Option<OwnedValue>> = keys
            .iter()
            .map(|k| builder.get(k).map(|v| v.to_owned_value()))
            .collect();
        assert!(builder.get("absent").is_none());

        let map = builder.freeze();
        let after: Vec<Option<OwnedValue>> = map
            .batch_get(&keys)
            .into_iter()
            .map(|v| v.map(|v| v.to_owned_value()))
            .collect();
        assert_eq!(before, after);
        assert!(after.iter().all(Option::is_some));
        assert!(map.get("absent").is_none());
    }

    #[test]
    fn test_footprint() {
        let build = || {
            let mut builder = FrozenMapBuilder::default();
            builder.insert("a", Value::Number(1.0)).unwrap();
            builder.insert("b", Value::from("hello world")).unwrap();
            builder.insert("t", Value::table(["x", "y", "z"])).unwrap();
            builder.insert("u", Value::table(["x"])).unwrap();
            builder.freeze()
        };
        let first = build();
        let second = build();
        assert_eq!(first.footprint(), second.footprint());
        assert_eq!(first.info(), second.info());

        let info = first.info();
        assert_eq!(
            info.footprint,
            info.entry_bytes + info.pool_bytes + info.table_bytes + info.header_bytes
        );
        // a, b, hello world, t, x, y, z, u
        assert_eq!(info.distinct_strings, 8);
        assert_eq!(info.pool_bytes, 4 * 7 + 12);
        assert_eq!(info.table_bytes, 4 * std::mem::size_of::<crate::pool::PoolStr>());
        assert_eq!(info.capacity, first.capacity());
        assert_eq!(info.entry_count, 4);
    }

    #[test]
    fn test_empty_map() {
        let map = FrozenMapBuilder::default().freeze();
        assert!(map.is_empty());
        assert_eq!(map.capacity(), 1);
        assert_eq!(map.get(""), None);
        assert_eq!(map.iter().count(), 0);
        assert_eq!(map.info().pool_bytes, 0);
    }

    #[test]
    fn test_iter() {
        let mut builder = FrozenMapBuilder::default();
        for i in 0..64u32 {
            builder.insert(&i.to_be_bytes(), Value::Number(i as f64)).unwrap();
        }
        let map = builder.freeze();
        let mut collected: Vec<(u32, f64)> = map
            .iter()
            .map(|(k, v)| (u32::from_be_bytes(k.try_into().unwrap()), v.as_number().unwrap()))
            .collect();
        collected.sort_by_key(|(k, _)| *k);
        assert_eq!(collected.len(), 64);
        for (i, (k, v)) in collected.into_iter().enumerate() {
            assert_eq!(k, i as u32);
            assert_eq!(v, i as f64);
        }
    }

    #[test]
    fn test_100k_random_lookups() {
        const N: u64 = 100_000;
        let mut builder = FrozenMapBuilder::default();
        for i in 0..N {
            builder.insert(&i.to_string(), Value::Number(i as f64)).unwrap();
        }
        let map = builder.freeze();
        assert_eq!(map.len(), N as usize);
        assert!(map.capacity().is_power_of_two());
        assert!(map.info().max_chain_length >= 1);

        for _ in 0..1000 {
            let k = rand::random::<u64>() % N;
            assert_eq!(map.get(&k.to_string()), Some(Value::Number(k as f64)));

            let k = k + N;
            assert_eq!(map.get(&k.to_string()), None);
        }
    }

    #[test]
    fn test_concurrent_readers() {
        const N: usize = 10_000;
        const P: usize = 8;

        let mut builder = FrozenMapBuilder::default();
        for i in 0..N {
            let value = format!("v{}", i % 100);
            builder.insert(&format!("key{i}"), Value::from(value.as_str())).unwrap();
        }
        let map = Arc::new(builder.freeze());

        let mut threads = Vec::with_capacity(P);
        for p in 0..P {
            let map = map.clone();
            threads.push(std::thread::spawn(move || {
                for i in (p..N).step_by(P) {
                    let expected = format!("v{}", i % 100);
                    let value = map.get(&format!("key{i}")).unwrap();
                    assert_eq!(value.as_str(), Some(expected.as_str()));
                }
                assert_eq!(map.get("missing"), None);
            }));
        }
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(Arc::strong_count(&map), 1);
    }
}
