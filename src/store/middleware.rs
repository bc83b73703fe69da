//! Interceptors around the reduce step.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use super::action::Action;
use super::engine::Shared;
use super::error::StoreError;
use super::reducer::Reducer;
use super::state::State;

/// Interceptor invoked around dispatch.
///
/// A middleware may:
/// - inspect the action and the current state,
/// - forward it with `next.run(ctx, action)`,
/// - forward a different action instead,
/// - return without forwarding (the action is swallowed, nothing changes),
/// - queue follow-up actions with [`MiddlewareContext::dispatch`].
///
/// Middleware runs inside the store's serialized section. Calling
/// `Store::dispatch` on the same store from here is rejected with
/// `StoreError::Reentrant`; use `ctx.dispatch` instead.
pub trait Middleware<S: State, A: Action>: Send + Sync + 'static {
    fn handle(
        &self,
        ctx: &mut MiddlewareContext<'_, S, A>,
        next: Next<'_, S, A>,
        action: A,
    ) -> Result<(), StoreError>;
}

/// The rest of the chain after the current middleware.
///
/// `Next` is `Copy`: forwarding twice reduces (and commits) twice.
pub struct Next<'a, S: State, A: Action> {
    chain: &'a [Box<dyn Middleware<S, A>>],
}

impl<S: State, A: Action> Clone for Next<'_, S, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: State, A: Action> Copy for Next<'_, S, A> {}

impl<'a, S: State, A: Action> Next<'a, S, A> {
    pub(crate) fn new(chain: &'a [Box<dyn Middleware<S, A>>]) -> Self {
        Self { chain }
    }

    /// Hand `action` to the next middleware, or to the reducer at the end of
    /// the chain.
    pub fn run(self, ctx: &mut MiddlewareContext<'_, S, A>, action: A) -> Result<(), StoreError> {
        match self.chain.split_first() {
            Some((head, rest)) => head.handle(ctx, Next { chain: rest }, action),
            None => ctx.reduce(action),
        }
    }
}

/// What a middleware can see and do while handling one action.
pub struct MiddlewareContext<'a, S: State, A: Action> {
    shared: &'a Shared<S, A>,
    reducer: &'a dyn Reducer<State = S, Action = A>,
    follow_ups: &'a mut VecDeque<A>,
    failure: Option<StoreError>,
}

impl<'a, S: State, A: Action> MiddlewareContext<'a, S, A> {
    pub(crate) fn new(
        shared: &'a Shared<S, A>,
        reducer: &'a dyn Reducer<State = S, Action = A>,
        follow_ups: &'a mut VecDeque<A>,
    ) -> Self {
        Self {
            shared,
            reducer,
            follow_ups,
            failure: None,
        }
    }

    /// Latest committed state. After `next.run` returns this reflects the
    /// forwarded action.
    pub fn state(&self) -> Arc<S> {
        self.shared.snapshot()
    }

    pub fn store_name(&self) -> &str {
        self.shared.name()
    }

    /// Queue a follow-up action. It runs after the current action has been
    /// committed and observed, before any other caller's action.
    pub fn dispatch(&mut self, action: A) {
        self.follow_ups.push_back(action);
    }

    fn reduce(&mut self, action: A) -> Result<(), StoreError> {
        let result = self.shared.reduce(self.reducer, &action);
        if let Err(err) = &result {
            self.failure = Some(err.clone());
        }
        result
    }

    pub(crate) fn take_failure(&mut self) -> Option<StoreError> {
        self.failure.take()
    }
}

/// Logs every action with the time the rest of the chain took.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl<S: State, A: Action> Middleware<S, A> for LoggingMiddleware {
    fn handle(
        &self,
        ctx: &mut MiddlewareContext<'_, S, A>,
        next: Next<'_, S, A>,
        action: A,
    ) -> Result<(), StoreError> {
        let description = format!("{:?}", action);
        let started = Instant::now();
        let result = next.run(ctx, action);
        let elapsed = started.elapsed();

        match &result {
            Ok(()) => tracing::debug!(
                store = %ctx.store_name(),
                action = %description,
                elapsed = ?elapsed,
                "Action reduced"
            ),
            Err(err) => tracing::warn!(
                store = %ctx.store_name(),
                action = %description,
                elapsed = ?elapsed,
                error = %err,
                "Action failed"
            ),
        }
        result
    }
}
