//! Unidirectional state-store primitives.
//!
//! This module provides the building blocks every feature store is made of:
//! an immutable [`State`], a closed set of [`Action`]s, pure [`Reducer`]s and
//! the [`Store`] that serializes dispatch and fans results out to observers.
//!
//! # Architecture
//!
//! ```text
//!  Action ──→ Middleware chain ──→ Reducer ──→ State (swap) ──→ Observers
//!    ↑                                                             │
//!    └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **State**: immutable snapshot, published as `Arc<S>`
//! - **Action**: data-only description of what happened
//! - **Reducer**: pure function `(State, &Action) -> State`
//! - **Middleware**: interceptor around the reduce step
//! - **Store**: single serialized owner of the current state

mod action;
mod combine;
mod dispatcher;
mod engine;
mod error;
mod middleware;
mod reducer;
mod scope;
mod state;
mod stream;
mod subscription;

pub use action::Action;
pub use combine::{combine_reducers, CombinedReducer, Identity};
pub use dispatcher::AsyncDispatcher;
pub use engine::{FailureSink, Store, StoreBuilder};
pub use error::StoreError;
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareContext, Next};
pub use reducer::{from_fn, FnReducer, Reducer, Then};
pub use scope::Scope;
pub use state::State;
pub use stream::StateStream;
pub use subscription::Subscription;
