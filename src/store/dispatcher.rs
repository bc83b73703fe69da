//! Async front-end to a store: a mailbox drained by one worker task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use super::action::Action;
use super::engine::Store;
use super::error::StoreError;
use super::state::State;

type Reply<S> = oneshot::Sender<Result<Arc<S>, StoreError>>;

struct Envelope<S, A> {
    action: A,
    respond_to: Option<Reply<S>>,
}

/// Submits actions from async code.
///
/// The worker task runs each blocking `Store::dispatch` (store lock, reducer,
/// synchronous observers) on tokio's blocking pool, so neither the caller's
/// task nor a runtime worker thread waits on the store lock.
///
/// Actions from one dispatcher (and its clones) are reduced in the order they
/// were accepted into the mailbox. Once accepted, an action is reduced even if
/// the caller stops waiting for the result. The worker stops when every clone
/// is dropped or the store is disposed.
pub struct AsyncDispatcher<S: State, A: Action> {
    sender: mpsc::Sender<Envelope<S, A>>,
    store_name: Arc<str>,
}

impl<S: State, A: Action> Clone for AsyncDispatcher<S, A> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            store_name: Arc::clone(&self.store_name),
        }
    }
}

impl<S: State, A: Action> AsyncDispatcher<S, A> {
    pub(crate) fn spawn(store: Store<S, A>, buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        let store_name: Arc<str> = Arc::from(store.name());
        tracing::debug!(store = %store_name, buffer, "Async dispatcher started");
        tokio::spawn(run_worker(store, receiver));
        Self { sender, store_name }
    }

    /// Submit `action` and wait for the state it produced.
    ///
    /// Waits for mailbox space when the buffer is full.
    pub async fn dispatch(&self, action: A) -> Result<Arc<S>, StoreError> {
        let (respond_to, receiver) = oneshot::channel();
        self.sender
            .send(Envelope {
                action,
                respond_to: Some(respond_to),
            })
            .await
            .map_err(|_| self.closed_error())?;

        receiver.await.map_err(|_| self.closed_error())?
    }

    /// Submit `action` without waiting for it to be reduced.
    ///
    /// Failures are only logged.
    pub async fn post(&self, action: A) -> Result<(), StoreError> {
        self.sender
            .send(Envelope {
                action,
                respond_to: None,
            })
            .await
            .map_err(|_| self.closed_error())
    }

    /// True once the worker has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn closed_error(&self) -> StoreError {
        StoreError::DispatcherClosed {
            store: self.store_name.to_string(),
        }
    }
}

impl<S: State, A: Action> std::fmt::Debug for AsyncDispatcher<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDispatcher")
            .field("store", &self.store_name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_worker<S: State, A: Action>(store: Store<S, A>, mut receiver: mpsc::Receiver<Envelope<S, A>>) {
    while let Some(Envelope { action, respond_to }) = receiver.recv().await {
        let result = dispatch_blocking(&store, action).await;
        let disposed = matches!(result, Err(StoreError::Disposed { .. }));

        match respond_to {
            Some(respond_to) => {
                if respond_to.send(result).is_err() {
                    tracing::trace!(store = %store.name(), "Dispatch result dropped (receiver gone)");
                }
            }
            None => {
                if let Err(err) = result {
                    tracing::warn!(store = %store.name(), error = %err, "Posted action failed");
                }
            }
        }

        if disposed {
            break;
        }
    }
    tracing::debug!(store = %store.name(), "Async dispatcher stopped");
}

async fn dispatch_blocking<S: State, A: Action>(store: &Store<S, A>, action: A) -> Result<Arc<S>, StoreError> {
    let description = format!("{:?}", action);
    let worker_store = store.clone();
    match tokio::task::spawn_blocking(move || worker_store.dispatch(action)).await {
        Ok(result) => result,
        Err(join_error) => {
            // Panics in the pipeline are caught inside dispatch; this only
            // covers the store machinery itself.
            tracing::error!(store = %store.name(), error = %join_error, "Dispatch task failed");
            Err(StoreError::MiddlewareFailure {
                store: store.name().to_string(),
                action: description,
                message: join_error.to_string(),
            })
        }
    }
}
