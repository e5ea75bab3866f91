//! # Storage Area
//!
//! Asynchronous key-value storage areas: a map-like API (`get`, `set`,
//! `has`, `delete`, `clear`, `keys`, `values`, `entries`) over a
//! transactional, versioned host database.
//!
//! ## Overview
//!
//! Each [`StorageArea`] is a named, independent namespace backed by one host
//! database holding one object store. The area hides the host's connection
//! lifecycle, transactions, and schema versioning:
//!
//! - **Lazy connection**: the first operation opens the database (creating
//!   the object store on first use); concurrent first operations share that
//!   one open.
//! - **Transparent recovery**: if the host closes the connection or another
//!   party requests a version change, the next operation reopens.
//! - **Durable writes**: `set` and `delete` resolve only once their
//!   transaction has committed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use storage_area::{Factory, StorageArea, Value};
//!
//! async fn example() -> storage_area::Result<()> {
//!     let factory = Factory::memory();
//!     let area = StorageArea::new("settings", &factory)?;
//!
//!     area.set("theme", "dark").await?;
//!     assert_eq!(area.get("theme").await?, Some(Value::from("dark")));
//!
//!     area.clear().await?;
//!     assert!(area.keys().await?.is_empty());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `storage_area::core` - Values, keys, and key validation
//! - `storage_area::host` - The host database and its backends

pub mod area;
pub mod config;
pub mod error;
pub mod executor;
pub mod manager;

pub use storage_area_core as core;
pub use storage_area_host as host;

pub use area::{BackingStore, StorageArea};
pub use config::{StorageConfig, DEFAULT_AREA_NAME, DEFAULT_DATABASE_PREFIX};
pub use error::{Result, StorageError};
pub use executor::{OperationExecutor, Settle};
pub use manager::{ConnectionManager, ConnectionState, OperationPermit, SCHEMA_VERSION, STORE_NAME};

pub use storage_area_core::{is_allowed_key, require_allowed_key, Key, KeyRange, Value, ViewKind};
pub use storage_area_host::{Factory, MemoryBackend, SqliteBackend};
