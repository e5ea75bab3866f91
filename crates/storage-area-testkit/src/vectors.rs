//! Golden test vectors for the key encoding.
//!
//! The SQLite backend stores records under their encoded keys and relies on
//! byte order matching key order, so these encodings are part of the
//! on-disk format.

use bytes::Bytes;
use storage_area_core::{encode_key, require_allowed_key, Value, ViewKind};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The key, before validation.
    pub key: Value,
    /// Expected encoding (hex).
    pub expected: &'static str,
}

/// Get all golden test vectors, in ascending key order.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "negative one",
            key: Value::Number(-1.0),
            expected: "10400fffffffffffff",
        },
        GoldenVector {
            name: "zero",
            key: Value::Number(0.0),
            expected: "108000000000000000",
        },
        GoldenVector {
            name: "negative zero normalizes to zero",
            key: Value::Number(-0.0),
            expected: "108000000000000000",
        },
        GoldenVector {
            name: "one",
            key: Value::Number(1.0),
            expected: "10bff0000000000000",
        },
        GoldenVector {
            name: "one and a half",
            key: Value::Number(1.5),
            expected: "10bff8000000000000",
        },
        GoldenVector {
            name: "epoch date",
            key: Value::date(0.0),
            expected: "208000000000000000",
        },
        GoldenVector {
            name: "date 2025-01-14",
            key: Value::date(1736870400000.0),
            expected: "20c2794658b1000000",
        },
        GoldenVector {
            name: "empty string",
            key: Value::from(""),
            expected: "3000",
        },
        GoldenVector {
            name: "ascii string",
            key: Value::from("a"),
            expected: "3001006100",
        },
        GoldenVector {
            name: "latin-1 string",
            key: Value::from("\u{e9}"),
            expected: "300100e900",
        },
        GoldenVector {
            name: "surrogate pair string",
            key: Value::from("\u{1f600}"),
            expected: "3001d83d01de0000",
        },
        GoldenVector {
            name: "empty buffer",
            key: Value::Binary(Bytes::new()),
            expected: "4000",
        },
        GoldenVector {
            name: "buffer with zero byte",
            key: Value::from(&[0x00u8, 0xff][..]),
            expected: "40010001ff00",
        },
        GoldenVector {
            name: "view keys by viewed bytes",
            key: Value::View {
                kind: ViewKind::Uint8,
                bytes: Bytes::from_static(&[0x00, 0xff]),
            },
            expected: "40010001ff00",
        },
        GoldenVector {
            name: "empty array",
            key: Value::Array(Vec::new()),
            expected: "5000",
        },
        GoldenVector {
            name: "mixed array",
            key: Value::array([Value::from("a"), Value::from(1)]),
            expected: "50300100610010bff000000000000000",
        },
        GoldenVector {
            name: "nested array",
            key: Value::array([Value::array([0])]),
            expected: "50501080000000000000000000",
        },
    ]
}

/// Encode each vector's key and compare with the expected hex.
///
/// Returns `(name, matches, actual hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let hex = match require_allowed_key(&v.key) {
                Ok(key) => hex::encode(encode_key(&key)),
                Err(e) => format!("invalid key: {}", e),
            };
            let matches = hex == v.expected;
            (v.name.to_string(), matches, hex)
        })
        .collect()
}
