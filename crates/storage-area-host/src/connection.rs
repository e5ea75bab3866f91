//! Connections and version-change notifications.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::debug;

use crate::backend::{Backend, TransactionMode};
use crate::error::{lock, HostError, Result};
use crate::transaction::Transaction;

/// Notification that another party needs exclusive access to a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionChange {
    pub old_version: u32,
    /// `None` when the database is being deleted.
    pub new_version: Option<u32>,
}

/// Receives host-driven revocation signals for one connection.
///
/// Callbacks run synchronously on the thread that triggered them and must
/// not block.
pub trait ConnectionObserver: Send + Sync {
    /// The host closed the connection (I/O failure, storage cleared).
    fn on_close(&self, connection: &Connection);

    /// Another open or a delete wants this database. The holder should close
    /// the connection, or that request fails as blocked.
    fn on_version_change(&self, connection: &Connection, event: &VersionChange);
}

/// An open connection to one database at a fixed version.
pub struct Connection {
    id: u64,
    name: String,
    version: u32,
    stores: Vec<String>,
    closed: AtomicBool,
    observers: Mutex<Vec<Arc<dyn ConnectionObserver>>>,
    in_flight: Arc<InFlight>,
    backend: Arc<dyn Backend>,
}

impl Connection {
    pub(crate) fn new(
        id: u64,
        name: String,
        version: u32,
        stores: Vec<String>,
        backend: Arc<dyn Backend>,
        in_flight: Arc<InFlight>,
    ) -> Self {
        Self {
            id,
            name,
            version,
            stores,
            closed: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
            in_flight,
            backend,
        }
    }

    /// Process-unique identifier, for diagnostics.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn object_store_names(&self) -> &[String] {
        &self.stores
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Start a transaction over one object store.
    pub fn transaction(&self, store: &str, mode: TransactionMode) -> Result<Transaction> {
        // Count the transaction before checking for closure, so a delete that
        // closes us afterwards still waits for it.
        let active = ActiveTransaction::new(self.in_flight.clone());
        if self.is_closed() {
            return Err(HostError::InvalidState(format!(
                "connection {} to {} is closed",
                self.id, self.name
            )));
        }
        if !self.stores.iter().any(|s| s == store) {
            return Err(HostError::NotFound(format!("object store {}", store)));
        }
        Ok(Transaction::new(
            self.backend.clone(),
            self.name.clone(),
            store.to_string(),
            mode,
            active,
        ))
    }

    /// Close the connection. New transactions are refused; ones already
    /// created still run, and a delete or upgrade of the database waits for
    /// them to finish.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!(connection = self.id, database = %self.name, "connection closed");
        }
    }

    /// Register an observer for revocation signals.
    pub fn observe(&self, observer: Arc<dyn ConnectionObserver>) -> Result<()> {
        lock(&self.observers)?.push(observer);
        Ok(())
    }

    fn observers(&self) -> Vec<Arc<dyn ConnectionObserver>> {
        lock(&self.observers)
            .map(|observers| observers.clone())
            .unwrap_or_default()
    }

    /// Host-initiated closure: mark closed, then tell observers.
    pub(crate) fn force_close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(connection = self.id, database = %self.name, "connection closed by host");
        for observer in self.observers() {
            observer.on_close(self);
        }
    }

    pub(crate) fn notify_version_change(&self, event: &VersionChange) {
        debug!(
            connection = self.id,
            database = %self.name,
            old_version = event.old_version,
            new_version = ?event.new_version,
            "version change requested"
        );
        for observer in self.observers() {
            observer.on_version_change(self, event);
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("stores", &self.stores)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Count of unfinished transactions on one database, shared by all of its
/// connections. Outlives the connections, which may be dropped while their
/// transactions still run.
#[derive(Debug)]
pub(crate) struct InFlight(watch::Sender<usize>);

impl InFlight {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self(watch::channel(0).0))
    }

    /// Wait until every transaction has been dropped or has finished its
    /// committed work.
    pub(crate) async fn drained(&self) {
        let mut count = self.0.subscribe();
        // The sender lives in `self`, so this only ends at zero.
        let _ = count.wait_for(|n| *n == 0).await;
    }
}

/// Marks one transaction as in flight on its database until dropped.
pub(crate) struct ActiveTransaction {
    in_flight: Arc<InFlight>,
}

impl ActiveTransaction {
    fn new(in_flight: Arc<InFlight>) -> Self {
        in_flight.0.send_modify(|n| *n += 1);
        Self { in_flight }
    }
}

impl Drop for ActiveTransaction {
    fn drop(&mut self) {
        self.in_flight.0.send_modify(|n| *n -= 1);
    }
}

/// Schema access during the upgrade step of an open.
#[derive(Debug)]
pub struct VersionChangeTransaction {
    old_version: u32,
    new_version: u32,
    existing: Vec<String>,
    created: Vec<String>,
}

impl VersionChangeTransaction {
    pub(crate) fn new(old_version: u32, new_version: u32, existing: Vec<String>) -> Self {
        Self {
            old_version,
            new_version,
            existing,
            created: Vec::new(),
        }
    }

    pub fn old_version(&self) -> u32 {
        self.old_version
    }

    pub fn new_version(&self) -> u32 {
        self.new_version
    }

    pub fn contains_object_store(&self, name: &str) -> bool {
        self.existing.iter().chain(&self.created).any(|s| s == name)
    }

    /// Create an object store. Fails if it already exists.
    pub fn create_object_store(&mut self, name: &str) -> Result<()> {
        if self.contains_object_store(name) {
            return Err(HostError::Constraint(format!(
                "object store {} already exists",
                name
            )));
        }
        self.created.push(name.to_string());
        Ok(())
    }

    pub(crate) fn into_created(self) -> Vec<String> {
        self.created
    }
}
