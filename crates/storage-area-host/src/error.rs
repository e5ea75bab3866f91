//! Error types for the host database.

use std::sync::Arc;

use storage_area_core::CodecError;
use thiserror::Error;

/// Errors surfaced by the host database.
///
/// `Clone` so that one outcome (e.g. of a shared open) can be handed to every
/// waiter; non-cloneable sources are wrapped in `Arc`.
#[derive(Debug, Clone, Error)]
pub enum HostError {
    /// A value could not be cloned into storage.
    #[error("data clone error: a {0} cannot be stored")]
    DataClone(&'static str),

    /// Write request on a read-only transaction.
    #[error("read-only transaction cannot be written to")]
    ReadOnly,

    /// Unknown database or object store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Schema constraint violated (e.g. creating an existing object store).
    #[error("constraint error: {0}")]
    Constraint(String),

    /// Operation on a closed connection or finished transaction.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The transaction was aborted before the request completed.
    #[error("transaction aborted")]
    Abort,

    /// Commit would exceed the storage quota.
    #[error("quota exceeded: {used} bytes needed, limit is {limit}")]
    QuotaExceeded { used: usize, limit: usize },

    /// Open requested a version lower than the stored one.
    #[error("requested version {requested} is less than the existing version {existing}")]
    Version { requested: u32, existing: u32 },

    /// Versions start at 1.
    #[error("database version must be at least 1")]
    InvalidVersion,

    /// Other connections stayed open through a version change.
    #[error("database {database} is blocked by {open} open connection(s)")]
    Blocked { database: String, open: usize },

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(Arc<rusqlite::Error>),

    /// Key or value codec error.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// A worker thread failed or a lock was poisoned.
    #[error("worker error: {0}")]
    Worker(String),
}

impl From<rusqlite::Error> for HostError {
    fn from(e: rusqlite::Error) -> Self {
        HostError::Database(Arc::new(e))
    }
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::Io(Arc::new(e))
    }
}

/// Result type for host database operations.
pub type Result<T> = std::result::Result<T, HostError>;

/// Lock a mutex, mapping poisoning to [`HostError::Worker`].
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|e| HostError::Worker(format!("mutex poisoned: {}", e)))
}

/// Run blocking backend work off the async runtime.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| HostError::Worker(format!("spawn_blocking failed: {}", e)))?
}
