use super::engine::SyncEngine;

/// Changes to the set of enabled sync engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEnginesAction {
    Enable(SyncEngine),
    Disable(SyncEngine),
    DisableAll,
}

impl crate::store::Action for SyncEnginesAction {}
