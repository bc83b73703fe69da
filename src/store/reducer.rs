//! Reducer trait and small composition helpers.

use std::fmt;
use std::marker::PhantomData;

use super::action::Action;
use super::state::State;

/// Reducer transforms state based on actions.
///
/// The reducer is the only place where state transitions happen.
/// It must be a pure function: (State, Action) -> State. No I/O, no clocks,
/// no dependence on the calling thread.
pub trait Reducer: Send + Sync + 'static {
    /// The state type this reducer operates on.
    type State: State;

    /// The action type this reducer handles.
    type Action: Action;

    /// Process an action and return the new state.
    fn reduce(&self, state: Self::State, action: &Self::Action) -> Self::State;

    /// Chain another reducer after this one.
    ///
    /// The second reducer sees the first one's output for the same action.
    fn then<R>(self, next: R) -> Then<Self, R>
    where
        Self: Sized,
        R: Reducer<State = Self::State, Action = Self::Action>,
    {
        Then { first: self, second: next }
    }
}

impl<S: State, A: Action> Reducer for Box<dyn Reducer<State = S, Action = A>> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: S, action: &A) -> S {
        (**self).reduce(state, action)
    }
}

/// Two reducers applied in sequence. Built by [`Reducer::then`].
#[derive(Debug, Clone)]
pub struct Then<R1, R2> {
    first: R1,
    second: R2,
}

impl<R1, R2> Reducer for Then<R1, R2>
where
    R1: Reducer,
    R2: Reducer<State = R1::State, Action = R1::Action>,
{
    type State = R1::State;
    type Action = R1::Action;

    fn reduce(&self, state: Self::State, action: &Self::Action) -> Self::State {
        let state = self.first.reduce(state, action);
        self.second.reduce(state, action)
    }
}

/// A reducer backed by a plain function or closure.
pub struct FnReducer<S, A, F> {
    f: F,
    _marker: PhantomData<fn(S, &A) -> S>,
}

impl<S, A, F> fmt::Debug for FnReducer<S, A, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnReducer").finish_non_exhaustive()
    }
}

/// Lift a closure into a [`Reducer`].
///
/// ```
/// use unistate::store::{from_fn, Reducer};
///
/// let double = from_fn(|n: Counter, _: &Tick| Counter(n.0 * 2));
/// assert_eq!(double.reduce(Counter(2), &Tick), Counter(4));
/// # #[derive(Debug, Clone, PartialEq)] struct Counter(u32);
/// # impl unistate::store::State for Counter {}
/// # #[derive(Debug)] struct Tick;
/// # impl unistate::store::Action for Tick {}
/// ```
pub fn from_fn<S, A, F>(f: F) -> FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(S, &A) -> S + Send + Sync + 'static,
{
    FnReducer {
        f,
        _marker: PhantomData,
    }
}

impl<S, A, F> Reducer for FnReducer<S, A, F>
where
    S: State,
    A: Action,
    F: Fn(S, &A) -> S + Send + Sync + 'static,
{
    type State = S;
    type Action = A;

    fn reduce(&self, state: S, action: &A) -> S {
        (self.f)(state, action)
    }
}
