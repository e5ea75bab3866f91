//! Backend trait: the physical storage beneath the host database.
//!
//! Backends are blocking and object safe. The connection layer calls them
//! from `spawn_blocking` threads and owns all async, versioning, and
//! notification concerns.

use storage_area_core::{Key, Value};

use crate::error::Result;

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    ReadOnly,
    ReadWrite,
}

impl TransactionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionMode::ReadOnly => "readonly",
            TransactionMode::ReadWrite => "readwrite",
        }
    }
}

/// Record-level access to one object store inside an open transaction.
pub trait StoreAccess {
    fn get(&mut self, key: &Key) -> Result<Option<Value>>;

    /// Insert or overwrite the record for `key`.
    fn put(&mut self, key: &Key, value: &Value) -> Result<()>;

    /// Remove the record for `key`. Absent keys are not an error.
    fn delete(&mut self, key: &Key) -> Result<()>;

    /// Number of records matching `key` (0 or 1).
    fn count(&mut self, key: &Key) -> Result<u64>;

    /// All keys, ascending.
    fn keys(&mut self) -> Result<Vec<Key>>;

    /// All values, in ascending key order.
    fn values(&mut self) -> Result<Vec<Value>>;
}

/// Physical storage for named, versioned databases.
pub trait Backend: Send + Sync + 'static {
    /// Stored version of `database`, 0 if it does not exist.
    fn version(&self, database: &str) -> Result<u32>;

    /// Object store names of `database`, empty if it does not exist.
    fn store_names(&self, database: &str) -> Result<Vec<String>>;

    /// Atomically set the version and create `new_stores`, creating the
    /// database if needed.
    fn upgrade(&self, database: &str, version: u32, new_stores: &[String]) -> Result<()>;

    /// Run `work` inside one transaction over `store`.
    ///
    /// Commits if `work` succeeds and rolls back otherwise. A commit failure
    /// is returned even though every record operation succeeded.
    fn transact(
        &self,
        database: &str,
        store: &str,
        mode: TransactionMode,
        work: &mut dyn FnMut(&mut dyn StoreAccess) -> Result<()>,
    ) -> Result<()>;

    /// Remove `database` entirely. Deleting a missing database succeeds.
    fn delete(&self, database: &str) -> Result<()>;
}
