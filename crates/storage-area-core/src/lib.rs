//! # Storage Area Core
//!
//! Pure primitives for storage areas: the value model, the restricted key
//! domain, key validation, and the order-preserving key encoding.
//!
//! This crate contains no I/O and no storage. It is pure computation over
//! values and keys.
//!
//! ## Key Types
//!
//! - [`Value`] - Anything a storage area can persist
//! - [`Key`] - The subset of values usable as record keys
//! - [`KeyRange`] - A range selector; never a key, never storable
//!
//! ## Key Ordering
//!
//! Keys are totally ordered: numbers, then dates, then strings, then binary
//! data, then arrays. [`encode_key`] produces bytes whose lexicographic order
//! matches that ordering, so any byte-ordered engine can serve as the record
//! store. See the [`codec`] module.

pub mod codec;
pub mod error;
pub mod key;
pub mod validation;
pub mod value;

pub use codec::{decode_key, decode_value, encode_key, encode_value, encoded_value_len};
pub use error::{CodecError, KeyError};
pub use key::Key;
pub use validation::{is_allowed_key, require_allowed_key};
pub use value::{KeyRange, Value, ViewKind};
