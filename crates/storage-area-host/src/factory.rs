//! The factory: opening, deleting, and tracking databases.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::backend::Backend;
use crate::connection::{
    Connection, ConnectionObserver, InFlight, VersionChange, VersionChangeTransaction,
};
use crate::error::{blocking, lock, HostError, Result};
use crate::memory::MemoryBackend;
use crate::sqlite::SqliteBackend;

/// Entry point to the host database.
///
/// Cheap to clone; clones share the backend and the registry of open
/// connections. Opens and deletes are serialized per factory.
#[derive(Clone)]
pub struct Factory {
    inner: Arc<FactoryInner>,
    secure: bool,
}

struct FactoryInner {
    backend: Arc<dyn Backend>,
    /// Open connections per database name.
    registry: Mutex<HashMap<String, Vec<Weak<Connection>>>>,
    /// Unfinished transactions per database name.
    in_flight: Mutex<HashMap<String, Arc<InFlight>>>,
    lifecycle: tokio::sync::Mutex<()>,
    next_id: AtomicU64,
}

impl Factory {
    /// Wrap a backend. The factory starts out as a secure context.
    pub fn new(backend: impl Backend) -> Self {
        Self {
            inner: Arc::new(FactoryInner {
                backend: Arc::new(backend),
                registry: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                lifecycle: tokio::sync::Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
            secure: true,
        }
    }

    /// Factory over a fresh [`MemoryBackend`].
    pub fn memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    /// Factory over a [`SqliteBackend`] rooted at `root`.
    pub fn sqlite(root: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SqliteBackend::open(root)?))
    }

    /// Whether the ambient execution context is trusted.
    pub fn is_secure_context(&self) -> bool {
        self.secure
    }

    /// Same factory, flagged as running in a secure or insecure context.
    pub fn with_secure_context(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Open `name` at `version`, running `upgrade` if the stored version is
    /// lower.
    pub async fn open<F>(&self, name: &str, version: u32, upgrade: F) -> Result<Arc<Connection>>
    where
        F: FnOnce(&mut VersionChangeTransaction) -> Result<()> + Send,
    {
        self.open_observed(name, version, upgrade, None).await
    }

    /// Like [`Factory::open`], registering `observer` before the connection
    /// becomes visible to any later open or delete.
    pub async fn open_observed<F>(
        &self,
        name: &str,
        version: u32,
        upgrade: F,
        observer: Option<Arc<dyn ConnectionObserver>>,
    ) -> Result<Arc<Connection>>
    where
        F: FnOnce(&mut VersionChangeTransaction) -> Result<()> + Send,
    {
        if version == 0 {
            return Err(HostError::InvalidVersion);
        }

        let _guard = self.inner.lifecycle.lock().await;

        let backend = self.inner.backend.clone();
        let database = name.to_string();
        let (existing, mut stores) = blocking(move || {
            Ok((backend.version(&database)?, backend.store_names(&database)?))
        })
        .await?;

        if version < existing {
            return Err(HostError::Version {
                requested: version,
                existing,
            });
        }

        if version > existing {
            debug!(database = name, old_version = existing, new_version = version, "upgrading");
            self.request_exclusive(name, existing, Some(version)).await?;

            let mut transaction = VersionChangeTransaction::new(existing, version, stores.clone());
            upgrade(&mut transaction)?;
            let created = transaction.into_created();

            let backend = self.inner.backend.clone();
            let database = name.to_string();
            let new_stores = created.clone();
            blocking(move || backend.upgrade(&database, version, &new_stores)).await?;
            stores.extend(created);
            stores.sort();
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Arc::new(Connection::new(
            id,
            name.to_string(),
            version,
            stores,
            self.inner.backend.clone(),
            self.in_flight(name)?,
        ));
        if let Some(observer) = observer {
            connection.observe(observer)?;
        }

        lock(&self.inner.registry)?
            .entry(name.to_string())
            .or_default()
            .push(Arc::downgrade(&connection));

        debug!(connection = id, database = name, version, "connection opened");
        Ok(connection)
    }

    /// Delete `name` entirely. Deleting a missing database succeeds.
    pub async fn delete_database(&self, name: &str) -> Result<()> {
        let _guard = self.inner.lifecycle.lock().await;

        let backend = self.inner.backend.clone();
        let database = name.to_string();
        let existing = blocking(move || backend.version(&database)).await?;
        self.request_exclusive(name, existing, None).await?;

        let backend = self.inner.backend.clone();
        let database = name.to_string();
        blocking(move || backend.delete(&database)).await?;

        lock(&self.inner.registry)?.remove(name);
        debug!(database = name, "database deleted");
        Ok(())
    }

    /// Close every open connection to `name` from the host side, as on an
    /// I/O failure or the user clearing site data.
    pub fn force_close(&self, name: &str) -> Result<()> {
        for connection in self.open_connections(name)? {
            connection.force_close();
        }
        Ok(())
    }

    /// Live, not-yet-closed connections to `name`.
    pub fn open_connections(&self, name: &str) -> Result<Vec<Arc<Connection>>> {
        let mut registry = lock(&self.inner.registry)?;
        let Some(entries) = registry.get_mut(name) else {
            return Ok(Vec::new());
        };
        entries.retain(|weak| weak.strong_count() > 0);
        Ok(entries
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|c| !c.is_closed())
            .collect())
    }

    fn in_flight(&self, name: &str) -> Result<Arc<InFlight>> {
        Ok(lock(&self.inner.in_flight)?
            .entry(name.to_string())
            .or_insert_with(InFlight::new)
            .clone())
    }

    /// Notify open connections of a version change, fail if any stay open,
    /// then wait for transactions still running on the database to finish,
    /// including those of closed or dropped connections.
    async fn request_exclusive(
        &self,
        name: &str,
        old_version: u32,
        new_version: Option<u32>,
    ) -> Result<()> {
        let event = VersionChange {
            old_version,
            new_version,
        };
        let connections = self.open_connections(name)?;
        for connection in &connections {
            connection.notify_version_change(&event);
        }

        let open = connections.iter().filter(|c| !c.is_closed()).count();
        if open > 0 {
            debug!(database = name, open, "version change blocked");
            return Err(HostError::Blocked {
                database: name.to_string(),
                open,
            });
        }

        self.in_flight(name)?.drained().await;
        Ok(())
    }
}
