//! JSON front end that turns a document into entries for a
//! [`FrozenMapBuilder`](crate::FrozenMapBuilder).
//!
//! Accepted layouts:
//!
//! - an object mapping keys to values,
//! - an array of `{"key": ..., "value": ...}` objects,
//! - an array of `[key, value]` pairs.
//!
//! JSON scalars map onto the matching [`OwnedValue`] variant. An array becomes
//! a table and must contain only strings. An object of the form
//! `{"code": "..."}` becomes a code blob. Anything else is rejected with
//! `ErrorKind::InvalidData` before it reaches the builder.

use std::fs::File;
use std::io::{BufReader, Error, ErrorKind, Result};
use std::path::Path;

use serde_json::Value as Json;

use crate::{FrozenMap, FrozenMapBuilder, OwnedValue};

/// Reads and converts the JSON document at `path`.
pub fn load_entries_from_json(path: &Path) -> Result<Vec<(String, OwnedValue)>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let value: Json = serde_json::from_reader(reader)
        .map_err(|e| invalid_json(format!("Failed to parse JSON input: {e}")))?;
    entries_from_json(value)
}

/// Converts an already parsed JSON document into entries.
pub fn entries_from_json(value: Json) -> Result<Vec<(String, OwnedValue)>> {
    match value {
        Json::Object(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = convert_value(&key, value)?;
                Ok((key, value))
            })
            .collect(),
        Json::Array(items) => {
            let mut entries = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let (key, value) = match item {
                    Json::Object(mut obj) => {
                        let key = obj.remove("key").ok_or_else(|| {
                            invalid_json(format!("entry {index} missing 'key' field"))
                        })?;
                        let value = obj.remove("value").ok_or_else(|| {
                            invalid_json(format!("entry {index} missing 'value' field"))
                        })?;
                        (key, value)
                    }
                    Json::Array(pair) => {
                        let Ok([key, value]) = <[Json; 2]>::try_from(pair) else {
                            return Err(invalid_json(format!(
                                "entry {index} expected array of length 2"
                            )));
                        };
                        (key, value)
                    }
                    other => {
                        return Err(invalid_json(format!(
                            "unsupported entry format at index {index}: {other}"
                        )));
                    }
                };
                let key = expect_string(key, index)?;
                let value = convert_value(&key, value)?;
                entries.push((key, value));
            }
            Ok(entries)
        }
        other => Err(invalid_json(format!(
            "unsupported JSON top-level type: {other}"
        ))),
    }
}

/// Loads `path` into `builder` and freezes it.
pub fn freeze_json_file(mut builder: FrozenMapBuilder, path: &Path) -> Result<FrozenMap> {
    let entries = load_entries_from_json(path)?;
    for (key, value) in &entries {
        builder.insert(key, value.as_value())?;
    }
    Ok(builder.freeze())
}

fn convert_value(key: &str, value: Json) -> Result<OwnedValue> {
    Ok(match value {
        Json::Null => OwnedValue::Nil,
        Json::Bool(b) => OwnedValue::Boolean(b),
        Json::Number(n) => OwnedValue::Number(n.as_f64().ok_or_else(|| {
            invalid_json(format!("value of {key:?} is not representable as f64: {n}"))
        })?),
        Json::String(s) => OwnedValue::String(s.into_bytes()),
        Json::Array(items) => {
            let mut strings = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                match item {
                    Json::String(s) => strings.push(s.into_bytes()),
                    other => {
                        return Err(invalid_json(format!(
                            "table {key:?} element {index} is not a string: {other}"
                        )));
                    }
                }
            }
            OwnedValue::Table(strings)
        }
        Json::Object(mut obj) => match (obj.remove("code"), obj.is_empty()) {
            (Some(Json::String(code)), true) => OwnedValue::Code(code.into_bytes()),
            _ => {
                return Err(invalid_json(format!(
                    "value of {key:?} is an object other than {{\"code\": \"...\"}}"
                )));
            }
        },
    })
}

fn expect_string(value: Json, index: usize) -> Result<String> {
    match value {
        Json::String(s) => Ok(s),
        other => Err(invalid_json(format!(
            "entry {index} expects string key, found {other}"
        ))),
    }
}

fn invalid_json(message: String) -> Error {
    Error::new(ErrorKind::InvalidData, message)
}
