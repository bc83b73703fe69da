//! Observer registrations and their cancellable handles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::action::Action;
use super::engine::Shared;
use super::scope::Scope;
use super::state::State;

pub(crate) type ObserverFn<S, A> = dyn Fn(&Arc<S>, Option<&A>) + Send + Sync;

/// One registered observer as seen by the store.
pub(crate) struct Slot<S, A> {
    id: u64,
    // Taken out on unsubscribe so captured resources (stream senders) drop.
    observer: Mutex<Option<Arc<ObserverFn<S, A>>>>,
    paused: AtomicBool,
}

impl<S, A> Slot<S, A> {
    pub(crate) fn new(id: u64, observer: Arc<ObserverFn<S, A>>) -> Self {
        Self {
            id,
            observer: Mutex::new(Some(observer)),
            paused: AtomicBool::new(false),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The observer, if still subscribed. The lock is released before the
    /// caller invokes it, so an observer may unsubscribe itself.
    pub(crate) fn observer(&self) -> Option<Arc<ObserverFn<S, A>>> {
        self.observer.lock().clone()
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Returns true if this call did the deactivation.
    pub(crate) fn deactivate(&self) -> bool {
        self.observer.lock().take().is_some()
    }

    fn is_active(&self) -> bool {
        self.observer.lock().is_some()
    }
}

/// Handle for one observer registration.
///
/// Dropping the handle unsubscribes; call [`detach`](Subscription::detach) to
/// keep the observer for the store's lifetime instead. The handle does not
/// keep the store alive.
#[must_use = "dropping a Subscription unsubscribes its observer"]
pub struct Subscription<S: State, A: Action> {
    slot: Arc<Slot<S, A>>,
    store: Weak<Shared<S, A>>,
    detached: bool,
}

impl<S: State, A: Action> Subscription<S, A> {
    pub(crate) fn new(slot: Arc<Slot<S, A>>, store: Weak<Shared<S, A>>) -> Self {
        Self {
            slot,
            store,
            detached: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.slot.id()
    }

    /// False once unsubscribed, or once the store is disposed or dropped.
    pub fn is_active(&self) -> bool {
        self.slot.is_active() && self.store.strong_count() > 0
    }

    pub fn is_paused(&self) -> bool {
        self.slot.is_paused()
    }

    /// Stop delivering notifications. Idempotent.
    ///
    /// A notification already running on another thread may finish; no
    /// further ones start.
    pub fn unsubscribe(&self) {
        if !self.slot.deactivate() {
            return;
        }
        if let Some(shared) = self.store.upgrade() {
            shared.remove_observer(self.slot.id());
            tracing::debug!(store = %shared.name(), subscription = self.slot.id(), "Unsubscribed");
        }
    }

    /// Skip notifications until [`resume`](Subscription::resume).
    pub fn pause(&self) {
        self.slot.paused.store(true, Ordering::SeqCst);
    }

    /// Resume notifications, starting with a replay of the current state.
    pub fn resume(&self) {
        if !self.slot.paused.swap(false, Ordering::SeqCst) {
            return;
        }
        let Some(shared) = self.store.upgrade() else {
            return;
        };
        let replayed = shared.serialized(|shared| {
            shared.deliver(&self.slot, &shared.snapshot(), None);
        });
        if let Err(err) = replayed {
            tracing::debug!(subscription = self.slot.id(), error = %err, "Resume without replay");
        }
    }

    /// Tie this subscription to `scope`: it is unsubscribed when the scope
    /// closes (immediately if it already has).
    pub fn bind_to(self, scope: &Scope) {
        let id = self.id();
        scope.on_close(move || {
            tracing::trace!(subscription = id, "Scope closed, unsubscribing");
            self.unsubscribe();
        });
    }

    /// Keep the observer registered after this handle is dropped.
    pub fn detach(mut self) {
        self.detached = true;
    }
}

impl<S: State, A: Action> Drop for Subscription<S, A> {
    fn drop(&mut self) {
        if !self.detached {
            self.unsubscribe();
        }
    }
}

impl<S: State, A: Action> std::fmt::Debug for Subscription<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .field("paused", &self.is_paused())
            .finish()
    }
}
