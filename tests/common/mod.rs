//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use unistate::store::{from_fn, Action, State, Store, StoreBuilder};

/// Minimal state used by the generic store tests.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Counter {
    pub value: i64,
    /// Every value added, in reduction order.
    pub history: Vec<i64>,
}

impl State for Counter {}

#[derive(Debug, Clone, PartialEq)]
pub enum CounterAction {
    Add(i64),
    /// Reduces to an equal state.
    Noop,
    /// Makes the reducer panic.
    Explode,
}

impl Action for CounterAction {}

pub fn counter_builder() -> StoreBuilder<Counter, CounterAction> {
    Store::builder(
        Counter::default(),
        from_fn(|mut state: Counter, action: &CounterAction| match action {
            CounterAction::Add(n) => {
                state.value += n;
                state.history.push(*n);
                state
            }
            CounterAction::Noop => state,
            CounterAction::Explode => panic!("counter exploded"),
        }),
    )
    .with_name("counter")
}

pub fn counter_store() -> Store<Counter, CounterAction> {
    counter_builder().build()
}

/// Observer that records every state it sees.
pub fn recorder<S: Clone + Send + 'static>() -> (Arc<Mutex<Vec<S>>>, impl Fn(&S) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |state: &S| sink.lock().push(state.clone()))
}

/// Write `contents` to a config.toml in a fresh temp dir.
pub fn temp_config(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, contents).expect("Failed to write config");
    (temp_dir, config_path)
}
