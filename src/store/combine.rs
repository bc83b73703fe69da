//! Folding several reducers of the same state/action pair into one.

use std::fmt;
use std::marker::PhantomData;

use super::action::Action;
use super::reducer::Reducer;
use super::state::State;

type BoxedReducer<S, A> = Box<dyn Reducer<State = S, Action = A>>;

/// A reducer that applies an ordered list of reducers in sequence.
///
/// For `(state, action)` the state flows through the first reducer, its output
/// (with the same action) through the second, and so on. Later reducers see
/// earlier reducers' writes within the same dispatch.
pub struct CombinedReducer<S: State, A: Action> {
    reducers: Vec<BoxedReducer<S, A>>,
}

impl<S: State, A: Action> CombinedReducer<S, A> {
    /// An empty composition; behaves like [`Identity`].
    pub fn new() -> Self {
        Self {
            reducers: Vec::new(),
        }
    }

    /// Append a reducer to the end of the chain.
    pub fn with<R>(mut self, reducer: R) -> Self
    where
        R: Reducer<State = S, Action = A>,
    {
        self.reducers.push(Box::new(reducer));
        self
    }

    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }
}

impl<S: State, A: Action> Default for CombinedReducer<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: State, A: Action> fmt::Debug for CombinedReducer<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("reducers", &self.reducers.len())
            .finish()
    }
}

impl<S: State, A: Action> Reducer for CombinedReducer<S, A> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: S, action: &A) -> S {
        self.reducers
            .iter()
            .fold(state, |state, reducer| reducer.reduce(state, action))
    }
}

/// Combine reducers into one, applying them in the given order.
///
/// `combine_reducers([r1, r2]).reduce(s, a) == r2.reduce(r1.reduce(s, a), a)`.
pub fn combine_reducers<S, A, I>(reducers: I) -> CombinedReducer<S, A>
where
    S: State,
    A: Action,
    I: IntoIterator<Item = BoxedReducer<S, A>>,
{
    CombinedReducer {
        reducers: reducers.into_iter().collect(),
    }
}

/// The reducer that returns its input unchanged.
pub struct Identity<S, A>(PhantomData<fn(S, &A) -> S>);

impl<S, A> Identity<S, A> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<S, A> Default for Identity<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, A> fmt::Debug for Identity<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Identity")
    }
}

impl<S: State, A: Action> Reducer for Identity<S, A> {
    type State = S;
    type Action = A;

    fn reduce(&self, state: S, _action: &A) -> S {
        state
    }
}
