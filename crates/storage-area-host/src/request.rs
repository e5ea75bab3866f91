//! Request and completion futures.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use storage_area_core::{Key, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::{HostError, Result};

/// Raw result of one executed request.
#[derive(Debug)]
pub(crate) enum Outcome {
    Value(Option<Value>),
    Key(Key),
    Done,
    Count(u64),
    Keys(Vec<Key>),
    Values(Vec<Value>),
}

/// A pending request queued on a transaction.
///
/// Resolves as soon as the backend has executed the request, which may be
/// before the transaction commits. Resolves to [`HostError::Abort`] if the
/// transaction is dropped without being committed.
pub struct Request<T> {
    rx: oneshot::Receiver<Result<Outcome>>,
    extract: fn(Outcome) -> Option<T>,
}

impl<T> Request<T> {
    pub(crate) fn new(
        rx: oneshot::Receiver<Result<Outcome>>,
        extract: fn(Outcome) -> Option<T>,
    ) -> Self {
        Self { rx, extract }
    }
}

impl<T> Future for Request<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let extract = self.extract;
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(Ok(outcome))) => Poll::Ready(
                extract(outcome)
                    .ok_or_else(|| HostError::Worker("request outcome of unexpected shape".into())),
            ),
            Poll::Ready(Ok(Err(e))) => Poll::Ready(Err(e)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(HostError::Abort)),
        }
    }
}

/// Resolves once a committed transaction is durable, or fails with the
/// error that aborted it.
///
/// Dropping a `Completion` does not cancel the transaction.
pub struct Completion {
    handle: JoinHandle<Result<()>>,
}

impl Completion {
    pub(crate) fn new(handle: JoinHandle<Result<()>>) -> Self {
        Self { handle }
    }
}

impl Future for Completion {
    type Output = Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) => Poll::Ready(Err(HostError::Worker(format!(
                "transaction worker failed: {}",
                e
            )))),
        }
    }
}
