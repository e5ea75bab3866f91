//! Key and value encodings.
//!
//! ## Key encoding
//!
//! Keys encode to self-delimiting byte strings whose lexicographic order is
//! exactly [`Key`] order. Any engine that sorts primary keys bytewise (SQLite
//! `BLOB` columns, LSM trees) can therefore hold records in native key order.
//!
//! ```text
//! number  = 0x10 f64-sortable(8)
//! date    = 0x20 f64-sortable(8)
//! string  = 0x30 (0x01 u16-be)* 0x00
//! binary  = 0x40 (0x01 byte)* 0x00
//! array   = 0x50 key* 0x00
//! ```
//!
//! `f64-sortable` flips the sign bit of non-negative numbers and every bit of
//! negative numbers, so the big-endian bit patterns sort numerically.
//!
//! ## Value encoding
//!
//! Values are stored as CBOR of their serde form.

use bytes::Bytes;

use crate::error::CodecError;
use crate::key::Key;
use crate::value::Value;

const TAG_NUMBER: u8 = 0x10;
const TAG_DATE: u8 = 0x20;
const TAG_STRING: u8 = 0x30;
const TAG_BINARY: u8 = 0x40;
const TAG_ARRAY: u8 = 0x50;

const TERMINATOR: u8 = 0x00;
const CONTINUATION: u8 = 0x01;

const SIGN_BIT: u64 = 1 << 63;

/// Encode a key into its order-preserving byte form.
pub fn encode_key(key: &Key) -> Vec<u8> {
    let mut out = Vec::new();
    write_key(&mut out, key);
    out
}

fn write_key(out: &mut Vec<u8>, key: &Key) {
    match key {
        Key::Number(n) => {
            out.push(TAG_NUMBER);
            write_f64(out, *n);
        }
        Key::Date(ms) => {
            out.push(TAG_DATE);
            write_f64(out, *ms);
        }
        Key::String(s) => {
            out.push(TAG_STRING);
            for unit in s.encode_utf16() {
                out.push(CONTINUATION);
                out.extend_from_slice(&unit.to_be_bytes());
            }
            out.push(TERMINATOR);
        }
        Key::Binary(bytes) => {
            out.push(TAG_BINARY);
            for byte in bytes.iter() {
                out.push(CONTINUATION);
                out.push(*byte);
            }
            out.push(TERMINATOR);
        }
        Key::Array(items) => {
            out.push(TAG_ARRAY);
            for item in items {
                write_key(out, item);
            }
            out.push(TERMINATOR);
        }
    }
}

fn write_f64(out: &mut Vec<u8>, n: f64) {
    let bits = Key::normalize(n).to_bits();
    let sortable = if bits & SIGN_BIT != 0 {
        !bits
    } else {
        bits ^ SIGN_BIT
    };
    out.extend_from_slice(&sortable.to_be_bytes());
}

/// Decode a key produced by [`encode_key`].
pub fn decode_key(bytes: &[u8]) -> Result<Key, CodecError> {
    let mut reader = Reader { bytes, pos: 0 };
    let key = reader.key()?;
    let rest = bytes.len() - reader.pos;
    if rest != 0 {
        return Err(CodecError::TrailingBytes(rest));
    }
    Ok(key)
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn byte(&mut self) -> Result<u8, CodecError> {
        let b = *self.bytes.get(self.pos).ok_or(CodecError::Truncated)?;
        self.pos += 1;
        Ok(b)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(CodecError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn peek(&self) -> Result<u8, CodecError> {
        self.bytes.get(self.pos).copied().ok_or(CodecError::Truncated)
    }

    fn key(&mut self) -> Result<Key, CodecError> {
        match self.byte()? {
            TAG_NUMBER => Ok(Key::Number(self.f64()?)),
            TAG_DATE => Ok(Key::Date(self.f64()?)),
            TAG_STRING => {
                let mut units = Vec::new();
                while self.marker()? {
                    let pair = self.take(2)?;
                    units.push(u16::from_be_bytes([pair[0], pair[1]]));
                }
                String::from_utf16(&units)
                    .map(Key::String)
                    .map_err(|_| CodecError::InvalidUtf16)
            }
            TAG_BINARY => {
                let mut buf = Vec::new();
                while self.marker()? {
                    buf.push(self.byte()?);
                }
                Ok(Key::Binary(Bytes::from(buf)))
            }
            TAG_ARRAY => {
                let mut items = Vec::new();
                while self.peek()? != TERMINATOR {
                    items.push(self.key()?);
                }
                self.pos += 1;
                Ok(Key::Array(items))
            }
            tag => Err(CodecError::UnknownTag(tag)),
        }
    }

    /// Read a continuation/terminator marker; `true` means another unit follows.
    fn marker(&mut self) -> Result<bool, CodecError> {
        match self.byte()? {
            CONTINUATION => Ok(true),
            TERMINATOR => Ok(false),
            other => Err(CodecError::UnexpectedByte(other)),
        }
    }

    fn f64(&mut self) -> Result<f64, CodecError> {
        let raw = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(raw);
        let sortable = u64::from_be_bytes(buf);
        let bits = if sortable & SIGN_BIT != 0 {
            sortable ^ SIGN_BIT
        } else {
            !sortable
        };
        Ok(f64::from_bits(bits))
    }
}

/// Encode a value as CBOR.
pub fn encode_value(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CodecError::Encoding(e.to_string()))?;
    Ok(buf)
}

/// Decode a value produced by [`encode_value`].
pub fn decode_value(bytes: &[u8]) -> Result<Value, CodecError> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::Decoding(e.to_string()))
}

/// Size in bytes of a value's stored form. Used for quota accounting.
pub fn encoded_value_len(value: &Value) -> Result<usize, CodecError> {
    encode_value(value).map(|buf| buf.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key_strategy() -> impl Strategy<Value = Key> {
        let leaf = prop_oneof![
            (-1e15f64..1e15).prop_map(Key::Number),
            (0f64..4e12).prop_map(Key::Date),
            "\\PC{0,8}".prop_map(Key::String),
            prop::collection::vec(any::<u8>(), 0..8).prop_map(|b| Key::Binary(Bytes::from(b))),
        ];
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop::collection::vec(inner, 0..4).prop_map(Key::Array)
        })
    }

    #[test]
    fn test_number_encoding_layout() {
        assert_eq!(
            hex::encode(encode_key(&Key::Number(0.0))),
            "108000000000000000"
        );
        assert_eq!(encode_key(&Key::Number(-0.0)), encode_key(&Key::Number(0.0)));
    }

    #[test]
    fn test_string_encoding_layout() {
        assert_eq!(hex::encode(encode_key(&Key::String("a".into()))), "3001006100");
        assert_eq!(hex::encode(encode_key(&Key::String(String::new()))), "3000");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert_eq!(decode_key(&[]), Err(CodecError::Truncated));
        assert_eq!(decode_key(&[0x99]), Err(CodecError::UnknownTag(0x99)));
        assert_eq!(decode_key(&[TAG_BINARY, 0x07]), Err(CodecError::UnexpectedByte(0x07)));
        assert_eq!(
            decode_key(&[TAG_BINARY, TERMINATOR, 0xff]),
            Err(CodecError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_value_cbor_round_trip() {
        let value = Value::object([
            ("list", Value::array([1, 2, 3])),
            ("when", Value::date(1.5e12)),
            ("blob", Value::from(&b"\xde\xad"[..])),
        ]);
        let encoded = encode_value(&value).unwrap();
        assert_eq!(decode_value(&encoded).unwrap(), value);
        assert_eq!(encoded_value_len(&value).unwrap(), encoded.len());
    }

    proptest! {
        #[test]
        fn encoding_preserves_order(a in key_strategy(), b in key_strategy()) {
            let ea = encode_key(&a);
            let eb = encode_key(&b);
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }

        #[test]
        fn decode_inverts_encode(key in key_strategy()) {
            let decoded = decode_key(&encode_key(&key)).unwrap();
            prop_assert_eq!(decoded, key);
        }
    }
}
