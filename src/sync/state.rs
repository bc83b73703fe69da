use serde::Serialize;

use super::engine::SyncEngine;

/// Engines in the order they were enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncEnginesState {
    pub enabled_engines: Vec<SyncEngine>,
}

impl SyncEnginesState {
    pub fn is_enabled(&self, engine: &SyncEngine) -> bool {
        self.enabled_engines.contains(engine)
    }
}

impl crate::store::State for SyncEnginesState {}
