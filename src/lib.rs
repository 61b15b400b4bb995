//! Build-once, read-many key-value maps backed by a single compacted string pool.
//!
//! The `frozenmap` crate loads a dataset into a growable open-addressing hash
//! table, deduplicating every byte string as it goes, then freezes it into an
//! immutable layout where all keys and string payloads live in one contiguous
//! buffer. A frozen map owns everything it references, so it can be shared by
//! any number of reader threads without copying.
//!
//! Values are tagged: nil, numbers, booleans, byte strings, opaque code blobs
//! and flat tables of strings.
//!
//! Typical usage feeds entries into a [`FrozenMapBuilder`], calls
//! [`freeze`](FrozenMapBuilder::freeze) once, then shares the resulting
//! [`FrozenMap`] behind an `Arc`.
//!
//! ```
//! use std::sync::Arc;
//! use frozenmap::{FrozenMapBuilder, Value};
//!
//! # fn main() -> std::io::Result<()> {
//! let mut builder = FrozenMapBuilder::default();
//! builder.insert("apple", Value::Number(1.0))?;
//! builder.insert("fruits", Value::table(["apple", "banana"]))?;
//! let map = Arc::new(builder.freeze());
//!
//! let reader = Arc::clone(&map);
//! std::thread::spawn(move || {
//!     assert_eq!(reader.get("apple"), Some(Value::Number(1.0)));
//! })
//! .join()
//! .unwrap();
//! assert_eq!(map.get("fruits"), Some(Value::table(["apple", "banana"])));
//! println!("footprint: {} bytes", map.footprint());
//! # Ok(())
//! # }
//! ```
mod hasher;
pub use hasher::hash_bytes;

mod interner;

mod pool;
pub use pool::POOL_ALIGNMENT;

mod table;
pub use table::MAX_CAPACITY;

mod value;
pub use value::{OwnedValue, Table, TableIter, Value};

mod meta;
pub use meta::FrozenMapInfo;

mod frozen;
pub use frozen::{FrozenMap, FrozenMapIter};

mod builder;
pub use builder::{DuplicateKeys, FrozenMapBuilder, FrozenMapConfig};

pub mod loader;
