//! The storage area facade.

use std::sync::Arc;

use futures_util::future::{self, FutureExt};
use serde::Serialize;
use storage_area_core::{require_allowed_key, Key, Value};
use storage_area_host::{Factory, TransactionMode};

use crate::config::{StorageConfig, DEFAULT_AREA_NAME};
use crate::error::{Result, StorageError};
use crate::executor::{OperationExecutor, Settle};
use crate::manager::{ConnectionManager, ConnectionState, SCHEMA_VERSION, STORE_NAME};

/// Where an area's data physically lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackingStore {
    pub database: String,
    pub store: &'static str,
    pub version: u32,
}

/// A named, independent key-value namespace.
///
/// Cloning yields another handle onto the same area, sharing its connection.
///
/// Keys are validated before any database work starts, so a rejected key
/// never opens the database.
#[derive(Clone)]
pub struct StorageArea {
    name: String,
    executor: OperationExecutor,
}

impl StorageArea {
    /// Create the area `name` with the default configuration.
    pub fn new(name: impl Into<String>, factory: &Factory) -> Result<Self> {
        Self::with_config(name, factory, &StorageConfig::default())
    }

    /// Create the area `name`.
    ///
    /// Fails with a security error when `config` requires a secure context
    /// and `factory` is not one. Nothing is opened until the first operation.
    pub fn with_config(
        name: impl Into<String>,
        factory: &Factory,
        config: &StorageConfig,
    ) -> Result<Self> {
        if config.require_secure_context && !factory.is_secure_context() {
            return Err(StorageError::Security(
                "storage areas are only available in secure contexts".into(),
            ));
        }

        let name = name.into();
        let manager = ConnectionManager::new(factory.clone(), config.database_name(&name));
        Ok(Self {
            name,
            executor: OperationExecutor::new(Arc::new(manager)),
        })
    }

    /// The area named `"default"`.
    pub fn default_area(factory: &Factory) -> Result<Self> {
        Self::new(DEFAULT_AREA_NAME, factory)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database, store, and version backing this area.
    pub fn backing_store(&self) -> BackingStore {
        BackingStore {
            database: self.executor.manager().database().to_string(),
            store: STORE_NAME,
            version: SCHEMA_VERSION,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.executor.manager().state()
    }

    /// Store `value` under `key`, overwriting any existing record.
    ///
    /// Resolves once the write has committed.
    pub async fn set(&self, key: impl Into<Value>, value: impl Into<Value>) -> Result<()> {
        let key = require_allowed_key(&key.into())?;
        let value = value.into();

        self.executor
            .run(TransactionMode::ReadWrite, move |store| {
                store.put(value, key)?;
                Ok(Settle::OnComplete(()))
            })
            .await
            .map_err(StorageError::from)
    }

    /// Fetch the value under `key`; `None` when there is no record.
    pub async fn get(&self, key: impl Into<Value>) -> Result<Option<Value>> {
        let key = require_allowed_key(&key.into())?;

        self.executor
            .run(TransactionMode::ReadOnly, move |store| {
                Ok(Settle::OnRequest(store.get(&key).boxed()))
            })
            .await
            .map_err(StorageError::from)
    }

    /// Whether a record exists under `key`.
    pub async fn has(&self, key: impl Into<Value>) -> Result<bool> {
        let key = require_allowed_key(&key.into())?;

        self.executor
            .run(TransactionMode::ReadOnly, move |store| {
                let count = store.count(&key);
                Ok(Settle::OnRequest(
                    count.map(|count| count.map(|n| n > 0)).boxed(),
                ))
            })
            .await
            .map_err(StorageError::from)
    }

    /// Remove the record under `key`. Absent keys are not an error.
    ///
    /// Resolves once the delete has committed.
    pub async fn delete(&self, key: impl Into<Value>) -> Result<()> {
        let key = require_allowed_key(&key.into())?;

        self.executor
            .run(TransactionMode::ReadWrite, move |store| {
                store.delete(&key)?;
                Ok(Settle::OnComplete(()))
            })
            .await
            .map_err(StorageError::from)
    }

    /// Destroy the backing database. The next operation recreates it empty.
    pub async fn clear(&self) -> Result<()> {
        self.executor
            .manager()
            .reset()
            .await
            .map_err(StorageError::from)
    }

    /// All keys in ascending key order.
    pub async fn keys(&self) -> Result<Vec<Key>> {
        self.executor
            .run(TransactionMode::ReadOnly, |store| {
                Ok(Settle::OnRequest(store.get_all_keys().boxed()))
            })
            .await
            .map_err(StorageError::from)
    }

    /// All values in ascending key order.
    pub async fn values(&self) -> Result<Vec<Value>> {
        self.executor
            .run(TransactionMode::ReadOnly, |store| {
                Ok(Settle::OnRequest(store.get_all().boxed()))
            })
            .await
            .map_err(StorageError::from)
    }

    /// All `(key, value)` pairs in ascending key order.
    ///
    /// Keys and values are read by two requests in one transaction and
    /// paired by position; either request failing fails the call.
    pub async fn entries(&self) -> Result<Vec<(Key, Value)>> {
        self.executor
            .run(TransactionMode::ReadOnly, |store| {
                let keys = store.get_all_keys();
                let values = store.get_all();
                Ok(Settle::OnRequest(
                    future::try_join(keys, values)
                        .map(|result| {
                            result.map(|(keys, values)| keys.into_iter().zip(values).collect())
                        })
                        .boxed(),
                ))
            })
            .await
            .map_err(StorageError::from)
    }
}

impl std::fmt::Debug for StorageArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageArea")
            .field("name", &self.name)
            .field("backing_store", &self.backing_store())
            .field("state", &self.connection_state())
            .finish()
    }
}
