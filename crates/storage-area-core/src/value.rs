//! The value model: everything a storage area can hold.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::key::Key;

/// Element type of a typed view over a binary buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    Int8,
    Uint8,
    Uint8Clamped,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Float64,
    BigInt64,
    BigUint64,
    DataView,
}

/// A range selector over keys.
///
/// Range selectors are neither valid keys nor storable values. They exist in
/// the value model so callers handing one to a key-accepting operation get a
/// proper rejection instead of a type error at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRange {
    pub lower: Option<Key>,
    pub upper: Option<Key>,
    pub lower_open: bool,
    pub upper_open: bool,
}

impl KeyRange {
    /// A range matching exactly one key.
    pub fn only(key: Key) -> Self {
        Self {
            lower: Some(key.clone()),
            upper: Some(key),
            lower_open: false,
            upper_open: false,
        }
    }

    /// Check whether `key` falls inside the range.
    pub fn includes(&self, key: &Key) -> bool {
        let above = match &self.lower {
            Some(lower) if self.lower_open => key > lower,
            Some(lower) => key >= lower,
            None => true,
        };
        let below = match &self.upper {
            Some(upper) if self.upper_open => key < upper,
            Some(upper) => key <= upper,
            None => true,
        };
        above && below
    }
}

/// A structured value.
///
/// Mirrors the structured-storage domain of the host database: primitives,
/// dates, binary buffers and views, arrays, and string-keyed objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// Milliseconds since the Unix epoch. May be NaN for an invalid date.
    Date(f64),
    /// A fixed-length binary buffer.
    Binary(Bytes),
    /// A typed view over a binary buffer.
    View { kind: ViewKind, bytes: Bytes },
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    KeyRange(KeyRange),
}

impl Value {
    /// Build a date value from milliseconds since the epoch.
    pub fn date(millis: f64) -> Self {
        Value::Date(millis)
    }

    /// Build an array value from anything convertible.
    pub fn array<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::Array(items.into_iter().map(Into::into).collect())
    }

    /// Build an object value from `(name, value)` pairs.
    pub fn object<I, K, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<String>,
        T: Into<Value>,
    {
        Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Binary(_) => "binary",
            Value::View { .. } => "view",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::KeyRange(_) => "key range",
        }
    }

    /// Whether the host's structured storage can persist this value.
    ///
    /// Range selectors cannot be stored, at any depth.
    pub fn is_storable(&self) -> bool {
        match self {
            Value::KeyRange(_) => false,
            Value::Array(items) => items.iter().all(Value::is_storable),
            Value::Object(fields) => fields.values().all(Value::is_storable),
            _ => true,
        }
    }
}

impl From<Key> for Value {
    fn from(key: Key) -> Self {
        match key {
            Key::Number(n) => Value::Number(n),
            Key::Date(ms) => Value::Date(ms),
            Key::String(s) => Value::String(s),
            Key::Binary(b) => Value::Binary(b),
            Key::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
        }
    }
}

impl From<&Key> for Value {
    fn from(key: &Key) -> Self {
        Value::from(key.clone())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Binary(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Binary(Bytes::copy_from_slice(b))
    }
}

impl From<KeyRange> for Value {
    fn from(range: KeyRange) -> Self {
        Value::KeyRange(range)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(items: [T; N]) -> Self {
        Value::array(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_conversions() {
        assert_eq!(
            Value::from([1, 2, 3]),
            Value::Array(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0)
            ])
        );
        assert_eq!(Value::from(vec!["a"]), Value::array(["a"]));
    }

    #[test]
    fn test_key_range_never_storable() {
        let range = KeyRange::only(Key::Number(1.0));
        assert!(!Value::from(range.clone()).is_storable());
        assert!(!Value::object([("nested", Value::array([Value::from(range)]))]).is_storable());
        assert!(Value::object([("a", 1)]).is_storable());
    }

    #[test]
    fn test_key_range_includes() {
        let range = KeyRange {
            lower: Some(Key::Number(1.0)),
            upper: Some(Key::String("a".into())),
            lower_open: true,
            upper_open: false,
        };
        assert!(!range.includes(&Key::Number(1.0)));
        assert!(range.includes(&Key::Number(2.0)));
        assert!(range.includes(&Key::Date(0.0)));
        assert!(range.includes(&Key::String("a".into())));
        assert!(!range.includes(&Key::String("b".into())));
    }

    #[test]
    fn test_key_into_value() {
        let key = Key::Array(vec![Key::Number(1.0), Key::Binary(Bytes::from_static(b"x"))]);
        assert_eq!(
            Value::from(key),
            Value::Array(vec![Value::Number(1.0), Value::Binary(Bytes::from_static(b"x"))])
        );
    }
}
