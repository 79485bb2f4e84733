//! Runtime helpers for bridging native callbacks into futures
//!
//! Native SDKs report completion through callbacks. The helpers in this
//! module turn those callbacks into awaitable values so adapters can expose a
//! plain `async` contract.

use crate::{MapError, Result};
use futures::channel::oneshot;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

/// One-shot native completion callback
pub type Callback<T> = Box<dyn FnOnce(T) + Send + 'static>;

/// Create a native completion callback together with the future that
/// receives its value.
///
/// If the native side drops the callback without calling it, awaiting the
/// receiver yields [`MapError::Native`] instead of hanging.
pub fn completion<T: Send + 'static>() -> (Callback<T>, Completion<T>) {
    let (tx, rx) = oneshot::channel();
    let callback: Callback<T> = Box::new(move |value| {
        // Receiver may already be gone when the caller discarded the result
        let _ = tx.send(value);
    });
    (callback, Completion(rx))
}

/// Receiving half of [`completion`]
pub struct Completion<T>(oneshot::Receiver<T>);

impl<T> Completion<T> {
    pub async fn wait(self) -> Result<T> {
        self.0
            .await
            .map_err(|_| MapError::Native("native callback was dropped".to_string()))
    }
}

/// Sleep without blocking the UI loop
pub async fn async_delay(duration: Duration) {
    if duration.is_zero() {
        return;
    }
    tokio::time::sleep(duration).await;
}

/// Spawn a detached task on the current runtime
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    log::debug!("runtime::spawn() - spawning detached task");
    tokio::spawn(future)
}

/// Lock a registry mutex, recovering the data if a previous holder panicked.
///
/// Registries hold plain data; a panic in a listener must not make every
/// later map operation fail.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq)]
enum DeferredState<T> {
    Pending,
    Resolved(T),
    Rejected(String),
}

/// A value that settles exactly once and can be awaited by any number of
/// callers, before or after it settles.
#[derive(Debug, Clone)]
pub struct Deferred<T: Clone> {
    tx: Arc<watch::Sender<DeferredState<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Deferred<T> {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DeferredState::Pending);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the value. Returns `false` if it had already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(DeferredState::Resolved(value))
    }

    /// Reject the value. Returns `false` if it had already settled.
    pub fn reject(&self, reason: impl Into<String>) -> bool {
        self.settle(DeferredState::Rejected(reason.into()))
    }

    fn settle(&self, next: DeferredState<T>) -> bool {
        self.tx.send_if_modified(|state| {
            if matches!(state, DeferredState::Pending) {
                *state = next;
                true
            } else {
                false
            }
        })
    }

    pub fn is_settled(&self) -> bool {
        !matches!(*self.tx.borrow(), DeferredState::Pending)
    }

    /// Wait for the value to settle
    pub async fn wait(&self) -> Result<T> {
        let mut rx = self.tx.subscribe();
        loop {
            match &*rx.borrow_and_update() {
                DeferredState::Resolved(value) => return Ok(value.clone()),
                DeferredState::Rejected(reason) => return Err(MapError::Native(reason.clone())),
                DeferredState::Pending => {}
            }
            // The sender lives in `self`, so the channel cannot close here
            if rx.changed().await.is_err() {
                return Err(MapError::NotReady);
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}
