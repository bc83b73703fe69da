//! Async consumption of store states.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::mpsc;

use super::action::Action;
use super::state::State;
use super::subscription::Subscription;

/// Every state a store commits, in commit order, starting with the state
/// current at creation time.
///
/// Unbounded: a slow consumer never loses states and never blocks dispatch.
/// Dropping the stream unsubscribes it. The stream ends when the store is
/// disposed or dropped.
pub struct StateStream<S: State, A: Action> {
    receiver: mpsc::UnboundedReceiver<Arc<S>>,
    subscription: Subscription<S, A>,
}

impl<S: State, A: Action> StateStream<S, A> {
    pub(crate) fn new(receiver: mpsc::UnboundedReceiver<Arc<S>>, subscription: Subscription<S, A>) -> Self {
        Self {
            receiver,
            subscription,
        }
    }

    /// Next state, or `None` once the store has gone away.
    pub async fn next(&mut self) -> Option<Arc<S>> {
        self.receiver.recv().await
    }

    /// Next state if one is already queued.
    pub fn try_next(&mut self) -> Option<Arc<S>> {
        self.receiver.try_recv().ok()
    }

    /// The underlying registration, e.g. to pause delivery.
    pub fn subscription(&self) -> &Subscription<S, A> {
        &self.subscription
    }
}

impl<S: State, A: Action> Stream for StateStream<S, A> {
    type Item = Arc<S>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl<S: State, A: Action> std::fmt::Debug for StateStream<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStream")
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}
