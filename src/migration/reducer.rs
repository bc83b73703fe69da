use crate::store::Reducer;

use super::action::MigrationAction;
use super::state::{MigrationProgress, MigrationState};

#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationReducer;

impl Reducer for MigrationReducer {
    type State = MigrationState;
    type Action = MigrationAction;

    fn reduce(&self, mut state: Self::State, action: &Self::Action) -> Self::State {
        match action {
            MigrationAction::Started => MigrationState {
                progress: MigrationProgress::Migrating,
                ..state
            },
            MigrationAction::MigrationRunResult { migration, run } => {
                state.results.insert(*migration, *run);
                state
            }
            MigrationAction::Completed => MigrationState {
                progress: MigrationProgress::Completed,
                ..state
            },
            MigrationAction::Clear => MigrationState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{Migration, MigrationRun};

    #[test]
    fn full_lifecycle() {
        let reducer = MigrationReducer;
        let state = reducer.reduce(MigrationState::default(), &MigrationAction::Started);
        assert_eq!(state.progress, MigrationProgress::Migrating);

        let state = reducer.reduce(
            state,
            &MigrationAction::MigrationRunResult {
                migration: Migration::Bookmarks,
                run: MigrationRun { version: 1, success: true },
            },
        );
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.progress, MigrationProgress::Migrating);

        let state = reducer.reduce(state, &MigrationAction::Completed);
        assert_eq!(state.progress, MigrationProgress::Completed);
        assert_eq!(
            state.results.get(&Migration::Bookmarks),
            Some(&MigrationRun { version: 1, success: true })
        );

        let state = reducer.reduce(state, &MigrationAction::Clear);
        assert_eq!(state, MigrationState::default());
    }

    #[test]
    fn later_result_replaces_earlier_one() {
        let reducer = MigrationReducer;
        let failed = MigrationRun { version: 1, success: false };
        let fixed = MigrationRun { version: 2, success: true };
        let state = reducer.reduce(
            MigrationState::default(),
            &MigrationAction::MigrationRunResult { migration: Migration::Addons, run: failed },
        );
        let state = reducer.reduce(
            state,
            &MigrationAction::MigrationRunResult { migration: Migration::Addons, run: fixed },
        );
        assert_eq!(state.results[&Migration::Addons], fixed);
    }
}
