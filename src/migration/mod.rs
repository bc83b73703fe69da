//! Progress of one-time data migrations, as observed by the UI.

mod action;
mod reducer;
mod state;

pub use action::MigrationAction;
pub use reducer::MigrationReducer;
pub use state::{Migration, MigrationProgress, MigrationRun, MigrationState, UnknownMigration};

use crate::config::StoreConfig;
use crate::store::{LoggingMiddleware, Store};

pub type MigrationStore = Store<MigrationState, MigrationAction>;

/// A migration store in the `None` progress state with no recorded runs.
pub fn migration_store(config: StoreConfig) -> MigrationStore {
    Store::builder(MigrationState::default(), MigrationReducer)
        .with_config(config)
        .with_middleware(LoggingMiddleware)
        .build()
}
