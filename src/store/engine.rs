//! The store: serialized dispatch, atomic publish, observer fan-out.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use uuid::Uuid;

use crate::config::StoreConfig;

use super::action::Action;
use super::dispatcher::AsyncDispatcher;
use super::error::{panic_message, StoreError};
use super::middleware::{Middleware, MiddlewareContext, Next};
use super::reducer::Reducer;
use super::scope::Scope;
use super::state::State;
use super::stream::StateStream;
use super::subscription::{ObserverFn, Slot, Subscription};

/// Receives failures that are not returned to any caller (observer panics,
/// failed follow-up actions).
pub type FailureSink = Arc<dyn Fn(&StoreError) + Send + Sync>;

type BoxedReducer<S, A> = Box<dyn Reducer<State = S, Action = A>>;
type BoxedMiddleware<S, A> = Box<dyn Middleware<S, A>>;

thread_local! {
    /// Stores whose serialized section is running on this thread.
    static SERIALIZING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Everything that only ever runs under the serializer lock.
pub(crate) struct Pipeline<S: State, A: Action> {
    reducer: BoxedReducer<S, A>,
    middleware: Vec<BoxedMiddleware<S, A>>,
    follow_ups: VecDeque<A>,
}

pub(crate) struct Shared<S: State, A: Action> {
    id: Uuid,
    config: StoreConfig,
    pipeline: Mutex<Pipeline<S, A>>,
    published: RwLock<Arc<S>>,
    watch_tx: watch::Sender<Arc<S>>,
    observers: Mutex<Vec<Arc<Slot<S, A>>>>,
    next_subscription: AtomicU64,
    disposed: AtomicBool,
    failure_sink: Option<FailureSink>,
}

impl<S: State, A: Action> Shared<S, A> {
    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.published.read())
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn disposed_error(&self) -> StoreError {
        StoreError::Disposed {
            store: self.name().to_string(),
        }
    }

    fn key(&self) -> usize {
        self as *const Self as usize
    }

    fn is_serializing(&self) -> bool {
        let key = self.key();
        SERIALIZING.with(|active| active.borrow().contains(&key))
    }

    /// Mark this thread as running the serialized section until the guard drops.
    fn enter(&self) -> scopeguard::ScopeGuard<usize, impl FnOnce(usize)> {
        let key = self.key();
        SERIALIZING.with(|active| active.borrow_mut().push(key));
        scopeguard::guard(key, |key| {
            SERIALIZING.with(|active| {
                let mut active = active.borrow_mut();
                if let Some(pos) = active.iter().rposition(|k| *k == key) {
                    active.remove(pos);
                }
            });
        })
    }

    /// Run `f` with no dispatch in flight.
    ///
    /// Called from inside the serialized section (an observer subscribing or
    /// resuming), `f` runs directly instead of re-locking.
    pub(crate) fn serialized<T>(&self, f: impl FnOnce(&Self) -> T) -> Result<T, StoreError> {
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        if self.is_serializing() {
            return Ok(f(self));
        }
        let _pipeline = self.pipeline.lock();
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        let _entered = self.enter();
        Ok(f(self))
    }

    fn dispatch(&self, action: A) -> Result<Arc<S>, StoreError> {
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        if self.is_serializing() {
            tracing::error!(
                store = %self.name(),
                action = ?action,
                "Re-entrant dispatch rejected"
            );
            return Err(StoreError::Reentrant {
                store: self.name().to_string(),
            });
        }

        let mut pipeline = self.pipeline.lock();
        if self.is_disposed() {
            return Err(self.disposed_error());
        }
        let _entered = self.enter();

        if !pipeline.follow_ups.is_empty() {
            tracing::warn!(
                store = %self.name(),
                dropped = pipeline.follow_ups.len(),
                "Discarding follow-up actions left by an interrupted dispatch"
            );
            pipeline.follow_ups.clear();
        }

        let result = self.run(&mut pipeline, action);

        while let Some(follow_up) = pipeline.follow_ups.pop_front() {
            if let Err(err) = self.run(&mut pipeline, follow_up) {
                self.report(&err);
            }
        }

        result
    }

    /// One action through the middleware chain and the reducer.
    fn run(&self, pipeline: &mut Pipeline<S, A>, action: A) -> Result<Arc<S>, StoreError> {
        tracing::trace!(store = %self.name(), action = ?action, "Dispatching");

        let Pipeline {
            reducer,
            middleware,
            follow_ups,
        } = pipeline;

        let description = format!("{:?}", action);
        let mut ctx = MiddlewareContext::new(self, &**reducer, follow_ups);
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
            Next::new(middleware).run(&mut ctx, action)
        })) {
            Ok(outcome) => outcome,
            Err(payload) => {
                // Whatever the chain committed before the panic stays published.
                let err = StoreError::MiddlewareFailure {
                    store: self.name().to_string(),
                    action: description,
                    message: panic_message(payload.as_ref()),
                };
                tracing::error!(store = %self.name(), error = %err, "Middleware failed");
                return Err(err);
            }
        };

        // A reducer failure wins even if a middleware swallowed the Err.
        if let Some(failure) = ctx.take_failure() {
            return Err(failure);
        }
        outcome?;
        Ok(self.snapshot())
    }

    /// Apply the reducer and publish. Only called under the serializer.
    pub(crate) fn reduce(
        &self,
        reducer: &dyn Reducer<State = S, Action = A>,
        action: &A,
    ) -> Result<(), StoreError> {
        let current = self.snapshot();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            reducer.reduce(S::clone(&current), action)
        }));

        match outcome {
            Ok(next) => {
                self.commit(&current, next, action);
                Ok(())
            }
            Err(payload) => {
                let err = StoreError::ReducerFailure {
                    store: self.name().to_string(),
                    action: format!("{:?}", action),
                    message: panic_message(payload.as_ref()),
                };
                tracing::error!(store = %self.name(), error = %err, "Reducer failed, state unchanged");
                Err(err)
            }
        }
    }

    fn commit(&self, current: &Arc<S>, next: S, action: &A) {
        if self.config.skip_unchanged && **current == next {
            tracing::trace!(store = %self.name(), action = ?action, "State unchanged, skipping notify");
            return;
        }

        let next = Arc::new(next);
        *self.published.write() = Arc::clone(&next);
        self.watch_tx.send_replace(Arc::clone(&next));
        self.notify(&next, Some(action));
    }

    fn notify(&self, state: &Arc<S>, action: Option<&A>) {
        // Snapshot the list so observers may (un)subscribe while being notified.
        let observers: Vec<Arc<Slot<S, A>>> = self.observers.lock().clone();
        for slot in &observers {
            self.deliver(slot, state, action);
        }
    }

    pub(crate) fn deliver(&self, slot: &Slot<S, A>, state: &Arc<S>, action: Option<&A>) {
        let Some(observer) = slot.observer() else {
            return;
        };
        if slot.is_paused() {
            return;
        }
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (*observer)(state, action))) {
            self.report(&StoreError::ObserverFailure {
                store: self.name().to_string(),
                subscription: slot.id(),
                message: panic_message(payload.as_ref()),
            });
        }
    }

    fn report(&self, err: &StoreError) {
        tracing::error!(store = %self.name(), store_id = %self.id, error = %err, "Store failure");
        if let Some(sink) = &self.failure_sink {
            (**sink)(err);
        }
    }

    pub(crate) fn remove_observer(&self, id: u64) {
        self.observers.lock().retain(|slot| slot.id() != id);
    }
}

impl<S: State, A: Action> Drop for Shared<S, A> {
    fn drop(&mut self) {
        for slot in self.observers.get_mut().drain(..) {
            slot.deactivate();
        }
    }
}

/// Serialized owner of one subsystem's state.
///
/// `Store` is a cheap handle; clones share the same state, reducer, middleware
/// and observers. Every [`dispatch`](Store::dispatch) from any thread goes
/// through one critical section, so actions are reduced one at a time and
/// observers see states in commit order.
pub struct Store<S: State, A: Action> {
    shared: Arc<Shared<S, A>>,
}

impl<S: State, A: Action> Clone for Store<S, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: State, A: Action> std::fmt::Debug for Store<S, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.shared.name())
            .field("id", &self.shared.id)
            .field("disposed", &self.shared.is_disposed())
            .finish_non_exhaustive()
    }
}

impl<S: State, A: Action> Store<S, A> {
    /// Create a store with default configuration.
    pub fn new<R>(initial: S, reducer: R, middleware: Vec<Box<dyn Middleware<S, A>>>) -> Self
    where
        R: Reducer<State = S, Action = A>,
    {
        let mut builder = StoreBuilder::new(initial, reducer);
        builder.middleware = middleware;
        builder.build()
    }

    pub fn builder<R>(initial: S, reducer: R) -> StoreBuilder<S, A>
    where
        R: Reducer<State = S, Action = A>,
    {
        StoreBuilder::new(initial, reducer)
    }

    pub fn name(&self) -> &str {
        self.shared.name()
    }

    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Current state snapshot.
    ///
    /// Never waits for an in-flight reduction; the write lock behind it is
    /// only taken for the pointer swap.
    pub fn state(&self) -> Arc<S> {
        self.shared.snapshot()
    }

    /// Reduce `action` and return the state right after it.
    ///
    /// # Errors
    /// - `ReducerFailure` if the reducer panicked; the previous state stays
    ///   current and no observer is notified.
    /// - `MiddlewareFailure` if a middleware panicked; states it committed
    ///   before the panic stay current.
    /// - `Disposed` after [`dispose`](Store::dispose).
    /// - `Reentrant` when called from this store's own middleware, reducer or
    ///   observer.
    pub fn dispatch(&self, action: A) -> Result<Arc<S>, StoreError> {
        self.shared.dispatch(action)
    }

    /// Register an observer. It is called right away with the current state,
    /// then once per committed action.
    pub fn subscribe<F>(&self, observer: F) -> Result<Subscription<S, A>, StoreError>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        self.register(Arc::new(move |state: &Arc<S>, _: Option<&A>| {
            observer(state.as_ref())
        }))
    }

    /// Like [`subscribe`](Store::subscribe), but the observer also gets the
    /// action that produced each state (`None` for the initial replay).
    pub fn subscribe_with_action<F>(&self, observer: F) -> Result<Subscription<S, A>, StoreError>
    where
        F: Fn(&S, Option<&A>) + Send + Sync + 'static,
    {
        self.register(Arc::new(move |state: &Arc<S>, action: Option<&A>| {
            observer(state.as_ref(), action)
        }))
    }

    /// Subscribe and unsubscribe automatically when `scope` closes.
    pub fn subscribe_scoped<F>(&self, scope: &Scope, observer: F) -> Result<(), StoreError>
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let subscription = self.subscribe(observer)?;
        subscription.bind_to(scope);
        Ok(())
    }

    /// Observe a projection of the state; `observer` only fires when the
    /// projected value differs from the last one it saw.
    pub fn observe_changes<T, M, F>(&self, map: M, observer: F) -> Result<Subscription<S, A>, StoreError>
    where
        T: PartialEq + Send + 'static,
        M: Fn(&S) -> T + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let last: Mutex<Option<T>> = Mutex::new(None);
        self.subscribe(move |state| {
            let value = map(state);
            let mut last = last.lock();
            if last.as_ref() == Some(&value) {
                return;
            }
            observer(&value);
            *last = Some(value);
        })
    }

    /// Remove an observer. Idempotent.
    pub fn unsubscribe(&self, subscription: &Subscription<S, A>) {
        subscription.unsubscribe();
    }

    /// Ordered, lossless stream of every state from now on (current first).
    pub fn stream(&self) -> Result<StateStream<S, A>, StoreError> {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let subscription = self.register(Arc::new(move |state: &Arc<S>, _: Option<&A>| {
            // Receiver gone means the stream was dropped; its subscription
            // is going away with it.
            let _ = sender.send(Arc::clone(state));
        }))?;
        Ok(StateStream::new(receiver, subscription))
    }

    /// Latest-value view for consumers that only care about the newest state.
    pub fn watch(&self) -> watch::Receiver<Arc<S>> {
        self.shared.watch_tx.subscribe()
    }

    /// Start an async dispatcher using the configured mailbox size.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn_dispatcher(&self) -> AsyncDispatcher<S, A> {
        AsyncDispatcher::spawn(self.clone(), self.shared.config.dispatcher_buffer)
    }

    pub fn subscription_count(&self) -> usize {
        self.shared.observers.lock().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.is_disposed()
    }

    /// Tear the store down.
    ///
    /// Waits for an in-flight dispatch, then invalidates every subscription.
    /// Later `dispatch`/`subscribe` calls fail with `Disposed`; `state()`
    /// keeps returning the last committed state.
    pub fn dispose(&self) {
        let shared = &self.shared;
        if shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _pipeline = if shared.is_serializing() {
            None
        } else {
            Some(shared.pipeline.lock())
        };

        let observers = std::mem::take(&mut *shared.observers.lock());
        for slot in &observers {
            slot.deactivate();
        }

        tracing::info!(
            store = %shared.name(),
            store_id = %shared.id,
            subscriptions = observers.len(),
            "Store disposed"
        );
    }

    fn register(&self, observer: Arc<ObserverFn<S, A>>) -> Result<Subscription<S, A>, StoreError> {
        let weak = Arc::downgrade(&self.shared);
        self.shared.serialized(|shared| {
            let id = shared.next_subscription.fetch_add(1, Ordering::Relaxed);
            let slot = Arc::new(Slot::new(id, observer));
            shared.observers.lock().push(Arc::clone(&slot));
            tracing::debug!(store = %shared.name(), subscription = id, "Subscribed");
            shared.deliver(&slot, &shared.snapshot(), None);
            Subscription::new(slot, weak)
        })
    }
}

/// Step-by-step construction of a [`Store`].
pub struct StoreBuilder<S: State, A: Action> {
    initial: S,
    reducer: BoxedReducer<S, A>,
    middleware: Vec<BoxedMiddleware<S, A>>,
    config: StoreConfig,
    failure_sink: Option<FailureSink>,
}

impl<S: State, A: Action> StoreBuilder<S, A> {
    pub fn new<R>(initial: S, reducer: R) -> Self
    where
        R: Reducer<State = S, Action = A>,
    {
        Self {
            initial,
            reducer: Box::new(reducer),
            middleware: Vec::new(),
            config: StoreConfig::default(),
            failure_sink: None,
        }
    }

    /// Append a middleware. The first one added is the outermost.
    pub fn with_middleware<M>(mut self, middleware: M) -> Self
    where
        M: Middleware<S, A>,
    {
        self.middleware.push(Box::new(middleware));
        self
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Where observer panics and failed follow-up actions are reported, in
    /// addition to the error log.
    pub fn with_failure_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&StoreError) + Send + Sync + 'static,
    {
        self.failure_sink = Some(Arc::new(sink));
        self
    }

    pub fn build(self) -> Store<S, A> {
        let initial = Arc::new(self.initial);
        let (watch_tx, _) = watch::channel(Arc::clone(&initial));
        let shared = Shared {
            id: Uuid::new_v4(),
            config: self.config,
            pipeline: Mutex::new(Pipeline {
                reducer: self.reducer,
                middleware: self.middleware,
                follow_ups: VecDeque::new(),
            }),
            published: RwLock::new(initial),
            watch_tx,
            observers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            disposed: AtomicBool::new(false),
            failure_sink: self.failure_sink,
        };
        tracing::debug!(store = %shared.name(), store_id = %shared.id, "Store created");
        Store {
            shared: Arc::new(shared),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::from_fn;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Count(i32);

    impl State for Count {}

    #[derive(Debug)]
    enum CountAction {
        Add(i32),
        Explode,
    }

    impl Action for CountAction {}

    fn counter() -> Store<Count, CountAction> {
        Store::builder(
            Count::default(),
            from_fn(|state: Count, action: &CountAction| match action {
                CountAction::Add(n) => Count(state.0 + n),
                CountAction::Explode => panic!("explode"),
            }),
        )
        .with_name("counter")
        .build()
    }

    #[test]
    fn dispatch_returns_post_reduction_state() {
        let store = counter();
        assert_eq!(*store.dispatch(CountAction::Add(2)).unwrap(), Count(2));
        assert_eq!(*store.dispatch(CountAction::Add(3)).unwrap(), Count(5));
        assert_eq!(*store.state(), Count(5));
    }

    #[test]
    fn reducer_panic_keeps_previous_state() {
        let store = counter();
        store.dispatch(CountAction::Add(1)).unwrap();
        let err = store.dispatch(CountAction::Explode).unwrap_err();
        assert!(matches!(err, StoreError::ReducerFailure { ref message, .. } if message == "explode"));
        assert_eq!(*store.state(), Count(1));
        // Store still usable afterwards.
        assert_eq!(*store.dispatch(CountAction::Add(1)).unwrap(), Count(2));
    }

    #[test]
    fn thread_marker_is_cleared_after_dispatch() {
        let store = counter();
        store.dispatch(CountAction::Add(1)).unwrap();
        assert!(!store.shared.is_serializing());
        let _ = store.dispatch(CountAction::Explode);
        assert!(!store.shared.is_serializing());
    }

    #[test]
    fn dispose_is_idempotent_and_rejects_dispatch() {
        let store = counter();
        store.dispose();
        store.dispose();
        assert!(store.is_disposed());
        assert!(matches!(
            store.dispatch(CountAction::Add(1)),
            Err(StoreError::Disposed { .. })
        ));
        assert_eq!(*store.state(), Count(0));
    }

    #[test]
    fn clones_share_state() {
        let store = counter();
        let other = store.clone();
        other.dispatch(CountAction::Add(7)).unwrap();
        assert_eq!(*store.state(), Count(7));
        assert_eq!(store.id(), other.id());
    }
}
