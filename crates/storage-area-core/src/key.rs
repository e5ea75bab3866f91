//! The restricted key domain.

use std::cmp::Ordering;
use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::KeyError;
use crate::validation::require_allowed_key;
use crate::value::Value;

/// A record key.
///
/// Keys are totally ordered across types:
/// `Number < Date < String < Binary < Array`.
/// Within a type, numbers and dates compare numerically, strings by UTF-16
/// code unit, binary data bytewise, and arrays element by element with a
/// shorter prefix sorting first.
///
/// Build keys through [`Key::try_from`] on a [`Value`] to get the finiteness
/// and `-0` normalization guarantees.
#[derive(Clone, Serialize, Deserialize)]
pub enum Key {
    Number(f64),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    String(String),
    Binary(Bytes),
    Array(Vec<Key>),
}

impl Key {
    /// Rank of the key type in the cross-type ordering.
    fn rank(&self) -> u8 {
        match self {
            Key::Number(_) => 0,
            Key::Date(_) => 1,
            Key::String(_) => 2,
            Key::Binary(_) => 3,
            Key::Array(_) => 4,
        }
    }

    /// Collapse `-0` onto `0` so the two compare and encode identically.
    pub(crate) fn normalize(n: f64) -> f64 {
        if n == 0.0 {
            0.0
        } else {
            n
        }
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Key::Number(a), Key::Number(b)) | (Key::Date(a), Key::Date(b)) => {
                Key::normalize(*a).total_cmp(&Key::normalize(*b))
            }
            (Key::String(a), Key::String(b)) => a.encode_utf16().cmp(b.encode_utf16()),
            (Key::Binary(a), Key::Binary(b)) => a.cmp(b),
            (Key::Array(a), Key::Array(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Key {}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Number(n) => write!(f, "{}", n),
            Key::Date(ms) => write!(f, "Date({})", ms),
            Key::String(s) => write!(f, "{:?}", s),
            Key::Binary(b) => write!(f, "Binary({})", hex::encode(b)),
            Key::Array(items) => f.debug_list().entries(items).finish(),
        }
    }
}

impl TryFrom<&Value> for Key {
    type Error = KeyError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        require_allowed_key(value)
    }
}

impl TryFrom<Value> for Key {
    type Error = KeyError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        require_allowed_key(&value)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::String(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::String(s)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Number(n as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cross_type_ordering() {
        let mut keys = vec![
            Key::Array(vec![]),
            Key::Binary(Bytes::from_static(b"\x00")),
            Key::String("a".into()),
            Key::Date(0.0),
            Key::Number(10.0),
        ];
        keys.sort();
        assert!(matches!(keys[0], Key::Number(_)));
        assert!(matches!(keys[1], Key::Date(_)));
        assert!(matches!(keys[2], Key::String(_)));
        assert!(matches!(keys[3], Key::Binary(_)));
        assert!(matches!(keys[4], Key::Array(_)));
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(Key::Number(-0.0), Key::Number(0.0));
    }

    #[test]
    fn test_strings_compare_by_utf16_code_unit() {
        // U+FF61 is one code unit; U+10000 is a surrogate pair starting at 0xD800.
        let bmp = Key::String("\u{ff61}".into());
        let astral = Key::String("\u{10000}".into());
        assert!(astral < bmp);
    }

    #[test]
    fn test_array_prefix_sorts_first() {
        let short = Key::Array(vec![Key::Number(1.0)]);
        let long = Key::Array(vec![Key::Number(1.0), Key::Number(0.0)]);
        assert!(short < long);
    }

    proptest! {
        #[test]
        fn number_order_matches_f64(a in -1e12f64..1e12, b in -1e12f64..1e12) {
            let ka = Key::Number(a);
            let kb = Key::Number(b);
            prop_assert_eq!(ka.cmp(&kb), a.partial_cmp(&b).unwrap());
        }
    }
}
