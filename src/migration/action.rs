use super::state::{Migration, MigrationRun};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationAction {
    /// Migrations are about to run.
    Started,
    /// One migration finished, successfully or not.
    MigrationRunResult {
        migration: Migration,
        run: MigrationRun,
    },
    /// Every migration has run.
    Completed,
    /// Forget progress and results.
    Clear,
}

impl crate::store::Action for MigrationAction {}
