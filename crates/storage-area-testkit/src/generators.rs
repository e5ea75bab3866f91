//! Proptest generators for property-based testing.

use bytes::Bytes;
use proptest::prelude::*;

use storage_area_core::{require_allowed_key, Key, KeyRange, Value, ViewKind};

/// Generate a finite number, including zero and subnormals.
pub fn finite_number() -> impl Strategy<Value = f64> {
    prop::num::f64::POSITIVE
        | prop::num::f64::NEGATIVE
        | prop::num::f64::NORMAL
        | prop::num::f64::SUBNORMAL
        | prop::num::f64::ZERO
}

/// Generate a number that is never a valid key.
pub fn non_finite_number() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(f64::NAN),
        Just(f64::INFINITY),
        Just(f64::NEG_INFINITY),
    ]
}

/// Generate a short string, including non-BMP characters.
pub fn text() -> impl Strategy<Value = String> {
    prop::collection::vec(any::<char>(), 0..8).prop_map(|chars| chars.into_iter().collect())
}

/// Generate buffer contents.
pub fn buffer(max_len: usize) -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..=max_len).prop_map(Bytes::from)
}

/// Generate a typed view kind.
pub fn view_kind() -> impl Strategy<Value = ViewKind> {
    prop_oneof![
        Just(ViewKind::Int8),
        Just(ViewKind::Uint8),
        Just(ViewKind::Uint8Clamped),
        Just(ViewKind::Int16),
        Just(ViewKind::Uint16),
        Just(ViewKind::Int32),
        Just(ViewKind::Uint32),
        Just(ViewKind::Float32),
        Just(ViewKind::Float64),
        Just(ViewKind::BigInt64),
        Just(ViewKind::BigUint64),
        Just(ViewKind::DataView),
    ]
}

/// Generate a value that passes key validation: finite numbers, strings,
/// dates, buffers, views, and arrays of those.
pub fn key_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        finite_number().prop_map(Value::Number),
        text().prop_map(Value::String),
        finite_number().prop_map(Value::Date),
        buffer(16).prop_map(Value::Binary),
        (view_kind(), buffer(16)).prop_map(|(kind, bytes)| Value::View { kind, bytes }),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(Value::Array)
    })
}

/// Generate a validated key.
pub fn key() -> impl Strategy<Value = Key> {
    key_value().prop_filter_map("key validation failed", |value| {
        require_allowed_key(&value).ok()
    })
}

/// Generate a value that key validation must reject.
pub fn disallowed_key_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        non_finite_number().prop_map(Value::Number),
        non_finite_number().prop_map(Value::Date),
        prop::collection::btree_map(text(), finite_number().prop_map(Value::Number), 0..3)
            .prop_map(Value::Object),
        Just(Value::KeyRange(KeyRange::only(Key::Number(0.0)))),
    ];
    // An otherwise valid array holding one bad element is rejected too.
    leaf.prop_flat_map(|bad| {
        prop_oneof![
            Just(bad.clone()),
            prop::collection::vec(key_value(), 0..3).prop_map(move |mut items| {
                items.push(bad.clone());
                Value::Array(items)
            }),
        ]
    })
}

/// Generate a value that can be stored and read back deep-equal.
///
/// Numbers are finite so equality is meaningful.
pub fn storable_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Undefined),
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        finite_number().prop_map(Value::Number),
        text().prop_map(Value::String),
        finite_number().prop_map(Value::Date),
        buffer(32).prop_map(Value::Binary),
        (view_kind(), buffer(32)).prop_map(|(kind, bytes)| Value::View { kind, bytes }),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(text(), inner, 0..4).prop_map(Value::Object),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage_area_core::{decode_value, encode_value, is_allowed_key};

    proptest! {
        #[test]
        fn test_generated_keys_are_allowed(value in key_value()) {
            prop_assert!(is_allowed_key(&value));
        }

        #[test]
        fn test_disallowed_values_are_rejected(value in disallowed_key_value()) {
            prop_assert!(!is_allowed_key(&value));
            prop_assert!(require_allowed_key(&value).is_err());
        }

        #[test]
        fn test_storable_values_survive_encoding(value in storable_value()) {
            prop_assert!(value.is_storable());
            let bytes = encode_value(&value).unwrap();
            prop_assert_eq!(decode_value(&bytes).unwrap(), value);
        }
    }
}
