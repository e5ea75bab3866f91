//! SQLite backend.
//!
//! One SQLite file per host database under a root directory. Records live in
//! one table per object store, keyed by the order-preserving key encoding so
//! `ORDER BY key` is native key order. Values are stored as CBOR.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use storage_area_core::{decode_key, decode_value, encode_key, encode_value, Key, Value};
use tracing::debug;

use crate::backend::{Backend, StoreAccess, TransactionMode};
use crate::error::{lock, HostError, Result};
use crate::migration;

/// SQLite-based backend.
///
/// Thread-safe via internal mutexes: one per database file, so transactions
/// on the same database are serialized.
pub struct SqliteBackend {
    root: PathBuf,
    handles: Mutex<HashMap<String, Arc<Mutex<Connection>>>>,
}

impl SqliteBackend {
    /// Use `root` as the directory holding database files, creating it if
    /// needed.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            handles: Mutex::new(HashMap::new()),
        })
    }

    /// Directory holding the database files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `database`. The name is hex-encoded so any string is a
    /// valid, distinct file name.
    pub fn path_for(&self, database: &str) -> PathBuf {
        self.root.join(format!("{}.sqlite", hex::encode(database)))
    }

    /// Get the cached handle for `database`, opening the file if needed.
    ///
    /// Returns `None` when the file does not exist and `create` is false.
    fn handle(&self, database: &str, create: bool) -> Result<Option<Arc<Mutex<Connection>>>> {
        let mut handles = lock(&self.handles)?;
        if let Some(handle) = handles.get(database) {
            return Ok(Some(handle.clone()));
        }

        let path = self.path_for(database);
        if !create && !path.exists() {
            return Ok(None);
        }

        debug!(database, path = %path.display(), "opening sqlite file");
        let mut conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        migration::migrate(&mut conn)?;

        let handle = Arc::new(Mutex::new(conn));
        handles.insert(database.to_string(), handle.clone());
        Ok(Some(handle))
    }
}

impl Backend for SqliteBackend {
    fn version(&self, database: &str) -> Result<u32> {
        let Some(handle) = self.handle(database, false)? else {
            return Ok(0);
        };
        let conn = lock(&handle)?;
        migration::read_version(&conn)
    }

    fn store_names(&self, database: &str) -> Result<Vec<String>> {
        let Some(handle) = self.handle(database, false)? else {
            return Ok(Vec::new());
        };
        let conn = lock(&handle)?;
        migration::store_names(&conn)
    }

    fn upgrade(&self, database: &str, version: u32, new_stores: &[String]) -> Result<()> {
        let handle = self
            .handle(database, true)?
            .ok_or_else(|| HostError::NotFound(format!("database {}", database)))?;
        let mut conn = lock(&handle)?;

        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        migration::apply_upgrade(&tx, version, new_stores)?;
        tx.commit()?;
        Ok(())
    }

    fn transact(
        &self,
        database: &str,
        store: &str,
        mode: TransactionMode,
        work: &mut dyn FnMut(&mut dyn StoreAccess) -> Result<()>,
    ) -> Result<()> {
        let handle = self
            .handle(database, false)?
            .ok_or_else(|| HostError::NotFound(format!("database {}", database)))?;
        let mut conn = lock(&handle)?;

        let behavior = match mode {
            TransactionMode::ReadOnly => TransactionBehavior::Deferred,
            TransactionMode::ReadWrite => TransactionBehavior::Immediate,
        };
        let tx = conn.transaction_with_behavior(behavior)?;

        let table = migration::store_table(&tx, store)?
            .ok_or_else(|| HostError::NotFound(format!("object store {}", store)))?;

        // Dropping `tx` on the error path rolls back.
        work(&mut SqliteAccess { conn: &tx, table: &table })?;
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, database: &str) -> Result<()> {
        let handle = lock(&self.handles)?.remove(database);
        if let Some(handle) = handle {
            // Wait out any in-flight transaction before the file goes away.
            drop(lock(&handle)?);
        }

        let path = self.path_for(database);
        for suffix in ["", "-wal", "-shm", "-journal"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            match std::fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        debug!(database, "deleted sqlite file");
        Ok(())
    }
}

struct SqliteAccess<'a> {
    conn: &'a Connection,
    table: &'a str,
}

impl StoreAccess for SqliteAccess<'_> {
    fn get(&mut self, key: &Key) -> Result<Option<Value>> {
        let raw: Option<Vec<u8>> = self
            .conn
            .prepare_cached(&format!("SELECT value FROM {} WHERE key = ?1", self.table))?
            .query_row(params![encode_key(key)], |row| row.get(0))
            .optional()?;
        raw.map(|bytes| decode_value(&bytes).map_err(HostError::from))
            .transpose()
    }

    fn put(&mut self, key: &Key, value: &Value) -> Result<()> {
        let encoded = encode_value(value)?;
        self.conn
            .prepare_cached(&format!(
                "INSERT OR REPLACE INTO {} (key, value) VALUES (?1, ?2)",
                self.table
            ))?
            .execute(params![encode_key(key), encoded])?;
        Ok(())
    }

    fn delete(&mut self, key: &Key) -> Result<()> {
        self.conn
            .prepare_cached(&format!("DELETE FROM {} WHERE key = ?1", self.table))?
            .execute(params![encode_key(key)])?;
        Ok(())
    }

    fn count(&mut self, key: &Key) -> Result<u64> {
        let count: i64 = self
            .conn
            .prepare_cached(&format!("SELECT COUNT(*) FROM {} WHERE key = ?1", self.table))?
            .query_row(params![encode_key(key)], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn keys(&mut self) -> Result<Vec<Key>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT key FROM {} ORDER BY key", self.table))?;
        let raw = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter()
            .map(|bytes| decode_key(bytes).map_err(HostError::from))
            .collect()
    }

    fn values(&mut self) -> Result<Vec<Value>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT value FROM {} ORDER BY key", self.table))?;
        let raw = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.iter()
            .map(|bytes| decode_value(bytes).map_err(HostError::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, SqliteBackend) {
        let dir = tempfile::tempdir().unwrap();
        let backend = SqliteBackend::open(dir.path()).unwrap();
        (dir, backend)
    }

    #[test]
    fn test_missing_database_has_version_zero() {
        let (_dir, backend) = backend();
        assert_eq!(backend.version("nope").unwrap(), 0);
        assert!(backend.store_names("nope").unwrap().is_empty());
        assert!(!backend.path_for("nope").exists());
    }

    #[test]
    fn test_records_come_back_in_key_order() {
        let (_dir, backend) = backend();
        backend.upgrade("db", 1, &["store".to_string()]).unwrap();

        backend
            .transact("db", "store", TransactionMode::ReadWrite, &mut |access| {
                access.put(&Key::from("b"), &Value::from(2))?;
                access.put(&Key::from(10), &Value::from(1))?;
                access.put(&Key::from(-3), &Value::from(0))?;
                access.put(&Key::from("a"), &Value::from(3))
            })
            .unwrap();

        backend
            .transact("db", "store", TransactionMode::ReadOnly, &mut |access| {
                assert_eq!(
                    access.keys()?,
                    vec![Key::from(-3), Key::from(10), Key::from("a"), Key::from("b")]
                );
                assert_eq!(
                    access.values()?,
                    vec![Value::from(0), Value::from(1), Value::from(3), Value::from(2)]
                );
                assert_eq!(access.count(&Key::from("a"))?, 1);
                assert_eq!(access.get(&Key::from("zz"))?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let backend = SqliteBackend::open(dir.path()).unwrap();
            backend.upgrade("db", 1, &["store".to_string()]).unwrap();
            backend
                .transact("db", "store", TransactionMode::ReadWrite, &mut |access| {
                    access.put(&Key::from(1), &Value::from("persisted"))
                })
                .unwrap();
        }

        let backend = SqliteBackend::open(dir.path()).unwrap();
        assert_eq!(backend.version("db").unwrap(), 1);
        backend
            .transact("db", "store", TransactionMode::ReadOnly, &mut |access| {
                assert_eq!(access.get(&Key::from(1))?, Some(Value::from("persisted")));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_delete_removes_file() {
        let (_dir, backend) = backend();
        backend.upgrade("db", 1, &["store".to_string()]).unwrap();
        assert!(backend.path_for("db").exists());

        backend.delete("db").unwrap();
        assert!(!backend.path_for("db").exists());
        assert_eq!(backend.version("db").unwrap(), 0);

        let err = backend
            .transact("db", "store", TransactionMode::ReadOnly, &mut |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }
}
