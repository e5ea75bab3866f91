//! Transactions and object store handles.

use std::sync::Arc;

use storage_area_core::{Key, Value};
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::backend::{Backend, StoreAccess, TransactionMode};
use crate::connection::ActiveTransaction;
use crate::error::{HostError, Result};
use crate::request::{Completion, Outcome, Request};

/// One record operation queued on a transaction.
#[derive(Debug)]
enum Operation {
    Get(Key),
    Put(Key, Value),
    Delete(Key),
    Count(Key),
    GetAllKeys,
    GetAll,
}

impl Operation {
    fn name(&self) -> &'static str {
        match self {
            Operation::Get(_) => "get",
            Operation::Put(..) => "put",
            Operation::Delete(_) => "delete",
            Operation::Count(_) => "count",
            Operation::GetAllKeys => "getAllKeys",
            Operation::GetAll => "getAll",
        }
    }

    fn apply(self, access: &mut dyn StoreAccess) -> Result<Outcome> {
        match self {
            Operation::Get(key) => access.get(&key).map(Outcome::Value),
            Operation::Put(key, value) => access.put(&key, &value).map(|()| Outcome::Key(key)),
            Operation::Delete(key) => access.delete(&key).map(|()| Outcome::Done),
            Operation::Count(key) => access.count(&key).map(Outcome::Count),
            Operation::GetAllKeys => access.keys().map(Outcome::Keys),
            Operation::GetAll => access.values().map(Outcome::Values),
        }
    }
}

struct Queued {
    operation: Operation,
    reply: oneshot::Sender<Result<Outcome>>,
}

/// A transaction scoped to one object store.
///
/// Requests queue up until [`Transaction::commit`] hands them to the backend.
/// Dropping an uncommitted transaction discards its requests; their futures
/// resolve to [`HostError::Abort`].
///
/// The transaction counts as in flight on its connection from creation until
/// it is dropped or its committed work has finished. Deletes and upgrades of
/// the database wait for that.
pub struct Transaction {
    backend: Arc<dyn Backend>,
    database: String,
    store: String,
    mode: TransactionMode,
    queue: Vec<Queued>,
    active: ActiveTransaction,
}

impl Transaction {
    pub(crate) fn new(
        backend: Arc<dyn Backend>,
        database: String,
        store: String,
        mode: TransactionMode,
        active: ActiveTransaction,
    ) -> Self {
        Self {
            backend,
            database,
            store,
            mode,
            queue: Vec::new(),
            active,
        }
    }

    /// Handle onto the scoped object store.
    pub fn object_store(&mut self, name: &str) -> Result<ObjectStore<'_>> {
        if name != self.store {
            return Err(HostError::NotFound(format!(
                "object store {} is not in the transaction scope",
                name
            )));
        }
        Ok(ObjectStore { tx: self })
    }

    /// Hand the queued requests to the backend.
    ///
    /// The transaction runs on a blocking worker and finishes even if the
    /// returned [`Completion`] is dropped.
    pub fn commit(self) -> Completion {
        let Transaction {
            backend,
            database,
            store,
            mode,
            queue,
            active,
        } = self;
        Completion::new(tokio::task::spawn_blocking(move || {
            let result = execute(backend.as_ref(), &database, &store, mode, queue);
            drop(active);
            result
        }))
    }

    fn enqueue<T>(&mut self, operation: Operation, extract: fn(Outcome) -> Option<T>) -> Request<T> {
        let (reply, rx) = oneshot::channel();
        self.queue.push(Queued { operation, reply });
        Request::new(rx, extract)
    }
}

/// Run queued requests in order inside one backend transaction.
///
/// Each request's result is delivered as soon as it executes. The first
/// failing request aborts the transaction; requests after it fail with the
/// same error, as does the transaction itself.
fn execute(
    backend: &dyn Backend,
    database: &str,
    store: &str,
    mode: TransactionMode,
    queue: Vec<Queued>,
) -> Result<()> {
    let mut queue = queue.into_iter();
    let result = backend.transact(database, store, mode, &mut |access| {
        for Queued { operation, reply } in queue.by_ref() {
            trace!(database, store, request = operation.name(), "executing request");
            match operation.apply(access) {
                Ok(outcome) => {
                    let _ = reply.send(Ok(outcome));
                }
                Err(e) => {
                    let _ = reply.send(Err(e.clone()));
                    return Err(e);
                }
            }
        }
        Ok(())
    });

    if let Err(e) = &result {
        warn!(database, store, mode = mode.as_str(), error = %e, "transaction aborted");
        for Queued { reply, .. } in queue {
            let _ = reply.send(Err(e.clone()));
        }
    }
    result
}

/// Handle onto the object store of a [`Transaction`].
pub struct ObjectStore<'t> {
    tx: &'t mut Transaction,
}

impl ObjectStore<'_> {
    /// Fetch the value stored under `key`; `None` when absent.
    pub fn get(&mut self, key: &Key) -> Request<Option<Value>> {
        self.tx.enqueue(Operation::Get(key.clone()), |outcome| match outcome {
            Outcome::Value(value) => Some(value),
            _ => None,
        })
    }

    /// Number of records stored under `key`.
    pub fn count(&mut self, key: &Key) -> Request<u64> {
        self.tx.enqueue(Operation::Count(key.clone()), |outcome| match outcome {
            Outcome::Count(n) => Some(n),
            _ => None,
        })
    }

    /// All keys in ascending order.
    pub fn get_all_keys(&mut self) -> Request<Vec<Key>> {
        self.tx.enqueue(Operation::GetAllKeys, |outcome| match outcome {
            Outcome::Keys(keys) => Some(keys),
            _ => None,
        })
    }

    /// All values in ascending key order.
    pub fn get_all(&mut self) -> Request<Vec<Value>> {
        self.tx.enqueue(Operation::GetAll, |outcome| match outcome {
            Outcome::Values(values) => Some(values),
            _ => None,
        })
    }

    /// Insert or overwrite the record for `key`.
    ///
    /// Fails immediately on a read-only transaction or an unstorable value.
    pub fn put(&mut self, value: Value, key: Key) -> Result<Request<Key>> {
        self.check_writable()?;
        if !value.is_storable() {
            return Err(HostError::DataClone("key range"));
        }
        Ok(self.tx.enqueue(Operation::Put(key, value), |outcome| match outcome {
            Outcome::Key(key) => Some(key),
            _ => None,
        }))
    }

    /// Remove the record for `key`, if any.
    pub fn delete(&mut self, key: &Key) -> Result<Request<()>> {
        self.check_writable()?;
        Ok(self.tx.enqueue(Operation::Delete(key.clone()), |outcome| match outcome {
            Outcome::Done => Some(()),
            _ => None,
        }))
    }

    fn check_writable(&self) -> Result<()> {
        match self.tx.mode {
            TransactionMode::ReadWrite => Ok(()),
            TransactionMode::ReadOnly => Err(HostError::ReadOnly),
        }
    }
}
