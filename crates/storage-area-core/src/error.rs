//! Error types for the storage area core.

use thiserror::Error;

/// A value was offered as a key but lies outside the key domain.
///
/// Surfaces to callers as a DataError.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("the given value is not allowed as a key: {0}")]
    NotAllowed(&'static str),

    #[error("number keys must be finite")]
    NonFiniteNumber,

    #[error("date keys must carry a finite time value")]
    InvalidDate,

    #[error("array key element {index} is not allowed: {source}")]
    InvalidElement {
        index: usize,
        #[source]
        source: Box<KeyError>,
    },
}

/// Errors from the key and value codecs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("encoded key is truncated")]
    Truncated,

    #[error("unknown key tag: 0x{0:02x}")]
    UnknownTag(u8),

    #[error("unexpected byte 0x{0:02x} in encoded key")]
    UnexpectedByte(u8),

    #[error("encoded string key is not valid UTF-16")]
    InvalidUtf16,

    #[error("{0} trailing bytes after encoded key")]
    TrailingBytes(usize),

    #[error("value encoding error: {0}")]
    Encoding(String),

    #[error("value decoding error: {0}")]
    Decoding(String),
}
