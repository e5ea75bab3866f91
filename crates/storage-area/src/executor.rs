//! Operation executor: run one unit of work in one transaction.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use storage_area_host::{HostError, ObjectStore, TransactionMode};

use crate::manager::{ConnectionManager, STORE_NAME};

/// When a unit of work counts as finished.
pub enum Settle<T> {
    /// Resolve with the value once the transaction commits. Write-shaped
    /// calls use this: a request can succeed while the commit still fails.
    OnComplete(T),
    /// Resolve as soon as the given request(s) succeed. Read-shaped calls
    /// use this.
    OnRequest(BoxFuture<'static, Result<T, HostError>>),
}

/// Runs units of work against the area's single object store.
#[derive(Clone)]
pub struct OperationExecutor {
    manager: Arc<ConnectionManager>,
}

impl OperationExecutor {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Acquire the connection, open a `mode` transaction over the store,
    /// let `work` queue its requests, commit, and wait per [`Settle`].
    pub async fn run<T, W>(&self, mode: TransactionMode, work: W) -> Result<T, HostError>
    where
        W: FnOnce(&mut ObjectStore<'_>) -> Result<Settle<T>, HostError>,
    {
        let (permit, connection) = self.manager.begin().await?;
        let mut transaction = connection.transaction(STORE_NAME, mode)?;
        // The transaction is in flight on its connection now; a reset waits
        // for it from here on.
        drop(permit);

        let settle = work(&mut transaction.object_store(STORE_NAME)?)?;
        let completion = transaction.commit();

        match settle {
            Settle::OnComplete(value) => {
                completion.await?;
                Ok(value)
            }
            Settle::OnRequest(request) => request.await,
        }
    }
}
