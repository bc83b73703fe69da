use crate::store::Reducer;

use super::action::SyncEnginesAction;
use super::state::SyncEnginesState;

/// What `Enable` does with an engine that is already in the list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnablePolicy {
    /// Append regardless; the list may hold the same engine twice.
    #[default]
    AllowDuplicates,
    /// Leave the list unchanged if the engine is already enabled.
    Deduplicate,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncEnginesReducer {
    policy: EnablePolicy,
}

impl SyncEnginesReducer {
    pub fn new(policy: EnablePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EnablePolicy {
        self.policy
    }
}

impl Reducer for SyncEnginesReducer {
    type State = SyncEnginesState;
    type Action = SyncEnginesAction;

    fn reduce(&self, mut state: Self::State, action: &Self::Action) -> Self::State {
        match action {
            SyncEnginesAction::Enable(engine) => {
                if self.policy == EnablePolicy::Deduplicate && state.is_enabled(engine) {
                    return state;
                }
                state.enabled_engines.push(engine.clone());
                state
            }
            // Removes every occurrence, so an engine enabled twice is gone
            // after one disable.
            SyncEnginesAction::Disable(engine) => {
                state.enabled_engines.retain(|enabled| enabled != engine);
                state
            }
            SyncEnginesAction::DisableAll => SyncEnginesState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncEngine;

    fn state(engines: &[SyncEngine]) -> SyncEnginesState {
        SyncEnginesState {
            enabled_engines: engines.to_vec(),
        }
    }

    #[test]
    fn enable_appends_in_order() {
        let reducer = SyncEnginesReducer::default();
        let s = reducer.reduce(state(&[]), &SyncEnginesAction::Enable(SyncEngine::Bookmarks));
        let s = reducer.reduce(s, &SyncEnginesAction::Enable(SyncEngine::History));
        assert_eq!(s, state(&[SyncEngine::Bookmarks, SyncEngine::History]));
    }

    #[test]
    fn default_policy_keeps_duplicates() {
        let reducer = SyncEnginesReducer::default();
        assert_eq!(reducer.policy(), EnablePolicy::AllowDuplicates);
        let s = reducer.reduce(
            state(&[SyncEngine::Bookmarks]),
            &SyncEnginesAction::Enable(SyncEngine::Bookmarks),
        );
        assert_eq!(s, state(&[SyncEngine::Bookmarks, SyncEngine::Bookmarks]));
    }

    #[test]
    fn deduplicate_policy_ignores_repeat_enable() {
        let reducer = SyncEnginesReducer::new(EnablePolicy::Deduplicate);
        let s = reducer.reduce(
            state(&[SyncEngine::Bookmarks]),
            &SyncEnginesAction::Enable(SyncEngine::Bookmarks),
        );
        assert_eq!(s, state(&[SyncEngine::Bookmarks]));
    }

    #[test]
    fn disable_removes_all_occurrences() {
        let reducer = SyncEnginesReducer::default();
        let s = reducer.reduce(
            state(&[SyncEngine::Tabs, SyncEngine::Bookmarks, SyncEngine::Tabs]),
            &SyncEnginesAction::Disable(SyncEngine::Tabs),
        );
        assert_eq!(s, state(&[SyncEngine::Bookmarks]));
    }

    #[test]
    fn disable_absent_engine_is_noop() {
        let reducer = SyncEnginesReducer::default();
        let before = state(&[SyncEngine::History]);
        let after = reducer.reduce(before.clone(), &SyncEnginesAction::Disable(SyncEngine::Passwords));
        assert_eq!(after, before);
    }

    #[test]
    fn disable_all_empties() {
        let reducer = SyncEnginesReducer::default();
        let s = reducer.reduce(
            state(&[SyncEngine::History, SyncEngine::Forms]),
            &SyncEnginesAction::DisableAll,
        );
        assert!(s.enabled_engines.is_empty());
    }
}
