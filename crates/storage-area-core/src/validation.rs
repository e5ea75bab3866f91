//! Key validation: classify arbitrary values against the key domain.

use crate::error::KeyError;
use crate::key::Key;
use crate::value::Value;

/// Check whether `value` is acceptable as a storage key.
pub fn is_allowed_key(value: &Value) -> bool {
    require_allowed_key(value).is_ok()
}

/// Convert `value` into a [`Key`], rejecting anything outside the key domain.
///
/// Accepted:
/// - finite numbers
/// - strings
/// - dates with a finite time value
/// - binary buffers, and typed views over them (the key is the viewed bytes)
/// - arrays whose every element is itself an accepted key
///
/// Everything else, range selectors included, is rejected.
pub fn require_allowed_key(value: &Value) -> Result<Key, KeyError> {
    match value {
        Value::Number(n) if n.is_finite() => Ok(Key::Number(Key::normalize(*n))),
        Value::Number(_) => Err(KeyError::NonFiniteNumber),
        Value::String(s) => Ok(Key::String(s.clone())),
        Value::Date(ms) if ms.is_finite() => Ok(Key::Date(Key::normalize(*ms))),
        Value::Date(_) => Err(KeyError::InvalidDate),
        Value::Binary(bytes) => Ok(Key::Binary(bytes.clone())),
        Value::View { bytes, .. } => Ok(Key::Binary(bytes.clone())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                require_allowed_key(item).map_err(|e| KeyError::InvalidElement {
                    index,
                    source: Box::new(e),
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Key::Array),
        Value::Undefined
        | Value::Null
        | Value::Bool(_)
        | Value::Object(_)
        | Value::KeyRange(_) => Err(KeyError::NotAllowed(value.type_name())),
    }
}
