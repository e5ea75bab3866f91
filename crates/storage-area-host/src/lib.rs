//! # Storage Area Host
//!
//! The host database that storage areas run on: a transactional, versioned,
//! embedded key-value engine with an event-driven connection model.
//!
//! ## Overview
//!
//! A [`Factory`] opens named databases at a schema version. Opening at a
//! version higher than the stored one runs an upgrade step that may create
//! object stores, after notifying every other open [`Connection`] of the
//! version change. Connections create [`Transaction`]s scoped to one object
//! store in read-only or read-write mode; each request on a transaction is
//! its own [`Request`] future, and [`Completion`] resolves once the whole
//! transaction has committed.
//!
//! Physical storage sits behind the blocking [`Backend`] trait:
//!
//! - [`SqliteBackend`] - one SQLite file per database
//! - [`MemoryBackend`] - in-memory, with an optional byte quota
//!
//! ## Usage
//!
//! ```rust,no_run
//! use storage_area_host::{Factory, TransactionMode};
//! use storage_area_core::{Key, Value};
//!
//! async fn example() -> storage_area_host::Result<()> {
//!     let factory = Factory::memory();
//!     let db = factory
//!         .open("notes", 1, |upgrade| upgrade.create_object_store("store"))
//!         .await?;
//!
//!     let mut tx = db.transaction("store", TransactionMode::ReadWrite)?;
//!     tx.object_store("store")?.put(Value::from("hello"), Key::from(1))?;
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Write durability**: a request succeeding does not mean its transaction
//!   committed. Only [`Completion`] reports durability.
//! - **Revocation**: connections are closed from the outside by version
//!   changes and forced closure; holders learn about it through
//!   [`ConnectionObserver`].
//! - **Blocking work**: backend calls run on `spawn_blocking` threads and
//!   run to completion even if nobody awaits the result.

pub mod backend;
pub mod connection;
pub mod error;
pub mod factory;
pub mod memory;
pub mod migration;
pub mod request;
pub mod sqlite;
pub mod transaction;

pub use backend::{Backend, StoreAccess, TransactionMode};
pub use connection::{Connection, ConnectionObserver, VersionChange, VersionChangeTransaction};
pub use error::{HostError, Result};
pub use factory::Factory;
pub use memory::MemoryBackend;
pub use request::{Completion, Request};
pub use sqlite::SqliteBackend;
pub use transaction::{ObjectStore, Transaction};
