//! Test fixtures and helpers.
//!
//! Common setup code for integration tests, plus a backend that injects
//! request failures.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use storage_area::{Factory, Key, StorageArea, Value};
use storage_area_host::{Backend, HostError, MemoryBackend, Result, StoreAccess, TransactionMode};
use tempfile::TempDir;

/// A factory to create areas on, plus whatever keeps its storage alive.
pub struct TestFixture {
    pub factory: Factory,
    root: Option<TempDir>,
    next_area: AtomicU64,
}

impl TestFixture {
    /// Fixture over a fresh in-memory database.
    pub fn memory() -> Self {
        Self::with_factory(Factory::memory())
    }

    /// Fixture over an in-memory database with a byte quota.
    pub fn with_quota(bytes: usize) -> Self {
        Self::with_factory(Factory::new(MemoryBackend::with_quota(bytes)))
    }

    /// Fixture over an in-memory database where every `fault` request fails.
    pub fn faulty(fault: Fault) -> Self {
        Self::with_factory(Factory::new(FaultyBackend::new(fault)))
    }

    /// Fixture over SQLite files in a temporary directory.
    pub fn sqlite() -> Self {
        let root = TempDir::new().expect("create temp dir");
        let factory = Factory::sqlite(root.path()).expect("open sqlite backend");
        Self {
            factory,
            root: Some(root),
            next_area: AtomicU64::new(0),
        }
    }

    fn with_factory(factory: Factory) -> Self {
        Self {
            factory,
            root: None,
            next_area: AtomicU64::new(0),
        }
    }

    /// Directory holding the SQLite files, if any.
    pub fn root(&self) -> Option<&std::path::Path> {
        self.root.as_ref().map(TempDir::path)
    }

    /// Create the area `name`.
    pub fn area(&self, name: &str) -> StorageArea {
        StorageArea::new(name, &self.factory).expect("create storage area")
    }

    /// Create an area with a name not used before on this fixture.
    pub fn fresh_area(&self) -> StorageArea {
        let n = self.next_area.fetch_add(1, Ordering::Relaxed);
        self.area(&format!("test-area-{}", n))
    }

    /// Run `test` against a fresh area, then clear the area.
    ///
    /// The area is cleared even when `test` left records behind, so later
    /// tests on the same factory start from an empty database.
    pub async fn with_area<F, Fut, T>(&self, test: F) -> T
    where
        F: FnOnce(StorageArea) -> Fut,
        Fut: Future<Output = T>,
    {
        let area = self.fresh_area();
        let result = test(area.clone()).await;
        area.clear().await.expect("clear storage area");
        result
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::memory()
    }
}

/// Record operation that [`FaultyBackend`] makes fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    Get,
    Count,
    Keys,
    Values,
}

/// Memory backend whose store access fails for one kind of request.
///
/// Failures surface as [`HostError::Constraint`] carrying the name of the
/// faulted operation. Opening, upgrading, and deleting work normally.
pub struct FaultyBackend {
    inner: MemoryBackend,
    fault: Fault,
}

impl FaultyBackend {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: MemoryBackend::new(),
            fault,
        }
    }
}

impl Backend for FaultyBackend {
    fn version(&self, database: &str) -> Result<u32> {
        self.inner.version(database)
    }

    fn store_names(&self, database: &str) -> Result<Vec<String>> {
        self.inner.store_names(database)
    }

    fn upgrade(&self, database: &str, version: u32, new_stores: &[String]) -> Result<()> {
        self.inner.upgrade(database, version, new_stores)
    }

    fn transact(
        &self,
        database: &str,
        store: &str,
        mode: TransactionMode,
        work: &mut dyn FnMut(&mut dyn StoreAccess) -> Result<()>,
    ) -> Result<()> {
        let fault = self.fault;
        self.inner.transact(database, store, mode, &mut |access| {
            work(&mut FaultyAccess {
                inner: access,
                fault,
            })
        })
    }

    fn delete(&self, database: &str) -> Result<()> {
        self.inner.delete(database)
    }
}

struct FaultyAccess<'a> {
    inner: &'a mut dyn StoreAccess,
    fault: Fault,
}

impl FaultyAccess<'_> {
    fn check(&self, operation: Fault) -> Result<()> {
        if self.fault == operation {
            return Err(HostError::Constraint(format!("{:?} failed", operation)));
        }
        Ok(())
    }
}

impl StoreAccess for FaultyAccess<'_> {
    fn get(&mut self, key: &Key) -> Result<Option<Value>> {
        self.check(Fault::Get)?;
        self.inner.get(key)
    }

    fn put(&mut self, key: &Key, value: &Value) -> Result<()> {
        self.inner.put(key, value)
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.inner.delete(key)
    }

    fn count(&mut self, key: &Key) -> Result<u64> {
        self.check(Fault::Count)?;
        self.inner.count(key)
    }

    fn keys(&mut self) -> Result<Vec<Key>> {
        self.check(Fault::Keys)?;
        self.inner.keys()
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        self.check(Fault::Values)?;
        self.inner.values()
    }
}
