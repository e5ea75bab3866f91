//! In-memory backend.
//!
//! Same semantics as the SQLite backend with no persistence. Transactions
//! work on a copy-on-write snapshot of the store, so an aborted or
//! over-quota transaction leaves no trace.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use storage_area_core::{encode_key, encoded_value_len, Key, Value};

use crate::backend::{Backend, StoreAccess, TransactionMode};
use crate::error::{lock, HostError, Result};

type Records = BTreeMap<Key, Value>;

/// In-memory backend. All data is lost when the backend is dropped.
#[derive(Default)]
pub struct MemoryBackend {
    databases: Mutex<HashMap<String, Arc<Mutex<MemoryDatabase>>>>,
    /// Byte limit across all stores of one database, checked at commit.
    quota: Option<usize>,
}

#[derive(Default)]
struct MemoryDatabase {
    version: u32,
    stores: BTreeMap<String, Records>,
}

impl MemoryBackend {
    /// Create a new empty backend with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend that rejects commits growing a database past
    /// `bytes` of encoded keys and values.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            databases: Mutex::new(HashMap::new()),
            quota: Some(bytes),
        }
    }

    fn database(&self, name: &str) -> Result<Option<Arc<Mutex<MemoryDatabase>>>> {
        Ok(lock(&self.databases)?.get(name).cloned())
    }
}

/// Bytes used by `db` if `store` were replaced with `records`.
fn usage(db: &MemoryDatabase, store: &str, records: &Records) -> Result<usize> {
    let mut used = 0;
    for (name, existing) in &db.stores {
        let records = if name == store { records } else { existing };
        for (key, value) in records {
            used += encode_key(key).len() + encoded_value_len(value)?;
        }
    }
    Ok(used)
}

impl Backend for MemoryBackend {
    fn version(&self, database: &str) -> Result<u32> {
        let Some(db) = self.database(database)? else {
            return Ok(0);
        };
        let version = lock(&db)?.version;
        Ok(version)
    }

    fn store_names(&self, database: &str) -> Result<Vec<String>> {
        let Some(db) = self.database(database)? else {
            return Ok(Vec::new());
        };
        let names = lock(&db)?.stores.keys().cloned().collect();
        Ok(names)
    }

    fn upgrade(&self, database: &str, version: u32, new_stores: &[String]) -> Result<()> {
        let db = lock(&self.databases)?
            .entry(database.to_string())
            .or_default()
            .clone();
        let mut db = lock(&db)?;

        if let Some(existing) = new_stores.iter().find(|s| db.stores.contains_key(*s)) {
            return Err(HostError::Constraint(format!(
                "object store {} already exists",
                existing
            )));
        }

        for store in new_stores {
            db.stores.insert(store.clone(), Records::new());
        }
        db.version = version;
        Ok(())
    }

    fn transact(
        &self,
        database: &str,
        store: &str,
        _mode: TransactionMode,
        work: &mut dyn FnMut(&mut dyn StoreAccess) -> Result<()>,
    ) -> Result<()> {
        let db = self
            .database(database)?
            .ok_or_else(|| HostError::NotFound(format!("database {}", database)))?;
        let mut db = lock(&db)?;

        let records = db
            .stores
            .get(store)
            .ok_or_else(|| HostError::NotFound(format!("object store {}", store)))?;
        let mut access = MemoryAccess {
            records: Cow::Borrowed(records),
        };
        work(&mut access)?;

        if let Cow::Owned(records) = access.records {
            if let Some(limit) = self.quota {
                let used = usage(&db, store, &records)?;
                if used > limit {
                    return Err(HostError::QuotaExceeded { used, limit });
                }
            }
            db.stores.insert(store.to_string(), records);
        }
        Ok(())
    }

    fn delete(&self, database: &str) -> Result<()> {
        lock(&self.databases)?.remove(database);
        Ok(())
    }
}

struct MemoryAccess<'a> {
    records: Cow<'a, Records>,
}

impl StoreAccess for MemoryAccess<'_> {
    fn get(&mut self, key: &Key) -> Result<Option<Value>> {
        Ok(self.records.get(key).cloned())
    }

    fn put(&mut self, key: &Key, value: &Value) -> Result<()> {
        self.records.to_mut().insert(key.clone(), value.clone());
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        if self.records.contains_key(key) {
            self.records.to_mut().remove(key);
        }
        Ok(())
    }

    fn count(&mut self, key: &Key) -> Result<u64> {
        Ok(u64::from(self.records.contains_key(key)))
    }

    fn keys(&mut self) -> Result<Vec<Key>> {
        Ok(self.records.keys().cloned().collect())
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        Ok(self.records.values().cloned().collect())
    }
}
