use std::fmt;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::interner::{Interner, Symbol};
use crate::pool::{PoolStr, StringPool};
use crate::table::Stored;

/// A value stored under a key.
///
/// The same type is used to feed values into a
/// [`FrozenMapBuilder`](crate::FrozenMapBuilder) and to read them back; string
/// payloads borrow from whichever side owns the bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Nil,
    Number(f64),
    Boolean(bool),
    String(&'a [u8]),
    /// Opaque blob, stored and returned verbatim.
    Code(&'a [u8]),
    /// Ordered list of strings. Only one level of nesting is supported.
    Table(Table<'a>),
}

impl<'a> Value<'a> {
    /// Borrows a string payload from anything byte-like.
    pub fn string<S: AsRef<[u8]> + ?Sized>(s: &'a S) -> Self {
        Value::String(s.as_ref())
    }

    /// Borrows a code blob from anything byte-like.
    pub fn code<S: AsRef<[u8]> + ?Sized>(s: &'a S) -> Self {
        Value::Code(s.as_ref())
    }

    /// Builds a table value from any sequence of string-like items.
    ///
    /// ```
    /// use frozenmap::Value;
    ///
    /// let value = Value::table(["x", "y", "z"]);
    /// assert_eq!(value.as_table().map(|t| t.len()), Some(3));
    /// ```
    pub fn table<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = &'a S>,
        S: AsRef<[u8]> + ?Sized + 'a,
    {
        Value::Table(Table {
            repr: TableRepr::Slices(items.into_iter().map(<S as AsRef<[u8]>>::as_ref).collect()),
        })
    }

    /// Short lowercase name of the variant, e.g. `"table"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
            Value::String(_) => "string",
            Value::Code(_) => "code",
            Value::Table(_) => "table",
        }
    }

    /// Returns `true` for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Returns the number, if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag, if this is a [`Value::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the raw string payload; code blobs are not strings.
    pub fn as_bytes(&self) -> Option<&'a [u8]> {
        match self {
            Value::String(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the string payload if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&'a str> {
        self.as_bytes().and_then(|s| std::str::from_utf8(s).ok())
    }

    /// Returns the blob, if this is a [`Value::Code`].
    pub fn as_code(&self) -> Option<&'a [u8]> {
        match self {
            Value::Code(s) => Some(*s),
            _ => None,
        }
    }

    /// Returns the table view, if this is a [`Value::Table`].
    pub fn as_table(&self) -> Option<&Table<'a>> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// Copies the value out so it no longer borrows from its map.
    pub fn to_owned_value(&self) -> OwnedValue {
        match self {
            Value::Nil => OwnedValue::Nil,
            Value::Number(n) => OwnedValue::Number(*n),
            Value::Boolean(b) => OwnedValue::Boolean(*b),
            Value::String(s) => OwnedValue::String(s.to_vec()),
            Value::Code(s) => OwnedValue::Code(s.to_vec()),
            Value::Table(t) => OwnedValue::Table(t.iter().map(<[u8]>::to_vec).collect()),
        }
    }

    pub(crate) fn from_stored<S: Copy>(
        stored: &'a Stored<S>,
        resolve: impl Fn(S) -> &'a [u8],
        table: impl FnOnce(&'a [S]) -> Table<'a>,
    ) -> Self {
        match stored {
            Stored::Nil => Value::Nil,
            Stored::Number(n) => Value::Number(*n),
            Stored::Boolean(b) => Value::Boolean(*b),
            Stored::String(s) => Value::String(resolve(*s)),
            Stored::Code(s) => Value::Code(resolve(*s)),
            Stored::Table(items) => Value::Table(table(&items[..])),
        }
    }
}

impl From<f64> for Value<'_> {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<'a> From<&'a str> for Value<'a> {
    fn from(s: &'a str) -> Self {
        Value::String(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Value<'a> {
    fn from(s: &'a [u8]) -> Self {
        Value::String(s)
    }
}

impl Serialize for Value<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(&String::from_utf8_lossy(s)),
            Value::Code(s) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("code", &String::from_utf8_lossy(s))?;
                map.end()
            }
            Value::Table(t) => serializer.collect_seq(t.iter().map(String::from_utf8_lossy)),
        }
    }
}

/// Read-only view over the strings of a table value.
#[derive(Clone)]
pub struct Table<'a> {
    repr: TableRepr<'a>,
}

#[derive(Clone)]
enum TableRepr<'a> {
    Slices(Vec<&'a [u8]>),
    Interned(&'a Interner, &'a [Symbol]),
    Pooled(&'a StringPool, &'a [PoolStr]),
}

impl<'a> Table<'a> {
    pub(crate) fn interned(interner: &'a Interner, items: &'a [Symbol]) -> Self {
        Table {
            repr: TableRepr::Interned(interner, items),
        }
    }

    pub(crate) fn pooled(pool: &'a StringPool, items: &'a [PoolStr]) -> Self {
        Table {
            repr: TableRepr::Pooled(pool, items),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match &self.repr {
            TableRepr::Slices(items) => items.len(),
            TableRepr::Interned(_, items) => items.len(),
            TableRepr::Pooled(_, items) => items.len(),
        }
    }

    /// Returns `true` if the table has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the element at `index`, or `None` if out of range.
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        match &self.repr {
            TableRepr::Slices(items) => items.get(index).copied(),
            TableRepr::Interned(interner, items) => items.get(index).map(|s| interner.resolve(*s)),
            TableRepr::Pooled(pool, items) => items.get(index).map(|s| pool.resolve(*s)),
        }
    }

    /// Iterates over the elements in insertion order.
    pub fn iter(&self) -> TableIter<'_, 'a> {
        TableIter {
            table: self,
            index: 0,
        }
    }
}

impl PartialEq for Table<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(String::from_utf8_lossy))
            .finish()
    }
}

impl<'t, 'a> IntoIterator for &'t Table<'a> {
    type Item = &'a [u8];
    type IntoIter = TableIter<'t, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the elements of a [`Table`].
pub struct TableIter<'t, 'a> {
    table: &'t Table<'a>,
    index: usize,
}

impl<'a> Iterator for TableIter<'_, 'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.table.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.table.len() - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TableIter<'_, '_> {}

/// Owned counterpart of [`Value`], produced by loaders that parse input
/// before the builder exists.
#[derive(Debug, Clone, PartialEq)]
pub enum OwnedValue {
    Nil,
    Number(f64),
    Boolean(bool),
    String(Vec<u8>),
    Code(Vec<u8>),
    Table(Vec<Vec<u8>>),
}

impl OwnedValue {
    pub fn as_value(&self) -> Value<'_> {
        match self {
            OwnedValue::Nil => Value::Nil,
            OwnedValue::Number(n) => Value::Number(*n),
            OwnedValue::Boolean(b) => Value::Boolean(*b),
            OwnedValue::String(s) => Value::String(s),
            OwnedValue::Code(s) => Value::Code(s),
            OwnedValue::Table(items) => Value::table(items),
        }
    }
}

impl Serialize for OwnedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_value().serialize(serializer)
    }
}
