//! # Storage Area Testkit
//!
//! Testing utilities for storage areas.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known keys with their expected encodings, pinning
//!   the on-disk key order
//! - **Generators**: Proptest strategies for keys and storable values
//! - **Fixtures**: A factory plus helpers that create areas and clear them
//!   afterwards, and a backend that fails chosen requests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use storage_area_testkit::vectors::verify_all_vectors;
//!
//! for (name, ok, hex) in verify_all_vectors() {
//!     assert!(ok, "{}: {}", name, hex);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use storage_area_testkit::generators::key_value;
//!
//! proptest! {
//!     #[test]
//!     fn keys_are_allowed(value in key_value()) {
//!         prop_assert!(storage_area::is_allowed_key(&value));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use storage_area_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::memory();
//! fixture
//!     .with_area(|area| async move {
//!         area.set(1, "one").await.unwrap();
//!     })
//!     .await;
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{Fault, FaultyBackend, TestFixture};
pub use generators::{disallowed_key_value, key, key_value, storable_value};
pub use vectors::{all_vectors, verify_all_vectors, GoldenVector};
