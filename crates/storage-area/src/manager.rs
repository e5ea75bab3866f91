//! Connection manager: one lazily opened, revocable connection per area.
//!
//! ```text
//!              acquire()                 open ok
//! Uninitialized ─────────▶ Opening ─────────────▶ Open
//!       ▲                     │                    │ host close / version change
//!       │      open failed    │                    ▼
//!       └─────────────────────┘          Closed | Invalidated
//!                                                  │ acquire()
//!                                                  ▼
//!                                               Opening
//! ```
//!
//! The in-flight open itself is cached, not just its result, so every
//! `acquire` issued while an open is pending resolves to the same
//! connection. Revocation is observed through a weak back-reference from
//! the connection to the manager's state.
//!
//! Operations hold a shared gate permit from `acquire` until their
//! transaction is created; `reset` takes the gate exclusively. A reset
//! therefore never closes a connection between an operation acquiring it
//! and starting its transaction, and the host's delete waits for
//! transactions already started.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use storage_area_host::{
    Connection, ConnectionObserver, Factory, HostError, VersionChange, VersionChangeTransaction,
};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

/// Name of the single object store in every area database.
pub const STORE_NAME: &str = "store";

/// Schema version of every area database.
pub const SCHEMA_VERSION: u32 = 1;

type SharedOpen = Shared<BoxFuture<'static, Result<Arc<Connection>, HostError>>>;

/// Observable lifecycle state of a managed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection yet, or the last one was reset or failed to open.
    Uninitialized,
    Opening,
    Open,
    /// The host closed the connection.
    Closed,
    /// Closed in response to a version change from another party.
    Invalidated,
}

struct ManagerState {
    /// Bumped on every new open and on reset; stale signals are ignored.
    generation: u64,
    phase: ConnectionState,
    open: Option<SharedOpen>,
}

/// Owns the lazily opened connection for one area database.
pub struct ConnectionManager {
    factory: Factory,
    database: String,
    state: Arc<Mutex<ManagerState>>,
    gate: RwLock<()>,
}

/// Shared gate permit; while held, no reset can start.
pub type OperationPermit<'a> = RwLockReadGuard<'a, ()>;

impl ConnectionManager {
    pub fn new(factory: Factory, database: impl Into<String>) -> Self {
        Self {
            factory,
            database: database.into(),
            state: Arc::new(Mutex::new(ManagerState {
                generation: 0,
                phase: ConnectionState::Uninitialized,
                open: None,
            })),
            gate: RwLock::new(()),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Current lifecycle phase. A poisoned state lock reads as
    /// `Uninitialized`; operations on it fail with [`HostError::Worker`].
    pub fn state(&self) -> ConnectionState {
        match self.lock() {
            Ok(state) => state.phase,
            Err(e) => {
                warn!(database = %self.database, error = %e, "connection state unavailable");
                ConnectionState::Uninitialized
            }
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ManagerState>, HostError> {
        self.state
            .lock()
            .map_err(|e| HostError::Worker(format!("connection state poisoned: {}", e)))
    }

    /// Take a shared gate permit, then acquire the connection.
    ///
    /// Hold the permit until the operation's transaction exists.
    pub async fn begin(&self) -> Result<(OperationPermit<'_>, Arc<Connection>), HostError> {
        let permit = self.gate.read().await;
        let connection = self.acquire().await?;
        Ok((permit, connection))
    }

    /// Get the open connection, starting an open if none is cached.
    ///
    /// Open failures are returned as-is and not retried; the next call
    /// starts a fresh open.
    pub async fn acquire(&self) -> Result<Arc<Connection>, HostError> {
        let open = {
            let mut state = self.lock()?;
            match &state.open {
                Some(open) => open.clone(),
                None => {
                    state.generation += 1;
                    state.phase = ConnectionState::Opening;
                    let open = self.start_open(state.generation);
                    state.open = Some(open.clone());
                    open
                }
            }
        };
        open.await
    }

    /// Spawn the open so it completes even if every waiter goes away.
    fn start_open(&self, generation: u64) -> SharedOpen {
        let factory = self.factory.clone();
        let database = self.database.clone();
        let state = Arc::downgrade(&self.state);
        let observer = Arc::new(Revocation {
            state: state.clone(),
            generation,
        });

        debug!(database = %database, generation, "opening area database");
        let task = tokio::spawn(async move {
            let result = factory
                .open_observed(
                    &database,
                    SCHEMA_VERSION,
                    |upgrade: &mut VersionChangeTransaction| {
                        debug!(
                            old_version = upgrade.old_version(),
                            new_version = upgrade.new_version(),
                            store = STORE_NAME,
                            "creating object store"
                        );
                        upgrade.create_object_store(STORE_NAME)
                    },
                    Some(observer),
                )
                .await;
            settle(&state, generation, &result);
            result
        });

        async move {
            task.await
                .map_err(|e| HostError::Worker(format!("open task failed: {}", e)))?
        }
        .boxed()
        .shared()
    }

    /// Drop the cached connection and delete the database.
    ///
    /// Waits for operations holding a gate permit, then for an open in
    /// flight to settle, whatever its outcome, so the database is never
    /// deleted under a connection still being established or a transaction
    /// about to start. The settled connection is then closed by the version
    /// change the delete raises.
    pub async fn reset(&self) -> Result<(), HostError> {
        let _exclusive = self.gate.write().await;
        let pending = self.lock()?.open.clone();
        if let Some(open) = pending {
            let _ = open.await;
        }

        {
            let mut state = self.lock()?;
            state.generation += 1;
            state.open = None;
            state.phase = ConnectionState::Uninitialized;
        }

        debug!(database = %self.database, "deleting area database");
        self.factory.delete_database(&self.database).await
    }
}

/// Record the outcome of an open if no reset or newer open superseded it.
fn settle(
    state: &Weak<Mutex<ManagerState>>,
    generation: u64,
    result: &Result<Arc<Connection>, HostError>,
) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let Ok(mut state) = state.lock() else {
        return;
    };
    if state.generation != generation {
        return;
    }
    match result {
        Ok(connection) => {
            debug!(generation, connection = connection.id(), "area connection open");
            state.phase = ConnectionState::Open;
        }
        Err(e) => {
            debug!(generation, error = %e, "open failed");
            state.open = None;
            state.phase = ConnectionState::Uninitialized;
        }
    }
}

/// Clears the manager's cached connection when the host revokes it.
struct Revocation {
    state: Weak<Mutex<ManagerState>>,
    generation: u64,
}

impl Revocation {
    fn revoke(&self, phase: ConnectionState) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let Ok(mut state) = state.lock() else {
            return;
        };
        if state.generation == self.generation && state.open.is_some() {
            debug!(generation = self.generation, ?phase, "connection revoked");
            state.open = None;
            state.phase = phase;
        }
    }
}

impl ConnectionObserver for Revocation {
    fn on_close(&self, _connection: &Connection) {
        self.revoke(ConnectionState::Closed);
    }

    fn on_version_change(&self, connection: &Connection, _event: &VersionChange) {
        connection.close();
        self.revoke(ConnectionState::Invalidated);
    }
}
