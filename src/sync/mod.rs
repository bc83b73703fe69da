//! Which sync engines the user has turned on.
//!
//! The store keeps an ordered list; whether enabling an engine twice keeps
//! two entries is an explicit [`EnablePolicy`].

mod action;
mod engine;
mod middleware;
mod reducer;
mod state;

pub use action::SyncEnginesAction;
pub use engine::SyncEngine;
pub use middleware::FormsFollowHistory;
pub use reducer::{EnablePolicy, SyncEnginesReducer};
pub use state::SyncEnginesState;

use crate::config::StoreConfig;
use crate::store::{LoggingMiddleware, Store};

pub type SyncEnginesStore = Store<SyncEnginesState, SyncEnginesAction>;

/// Knobs for [`sync_engines_store`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStoreOptions {
    pub policy: EnablePolicy,
    /// Mirror every History change onto Forms.
    pub forms_follow_history: bool,
}

/// A sync-engine store starting with nothing enabled.
pub fn sync_engines_store(config: StoreConfig, options: SyncStoreOptions) -> SyncEnginesStore {
    let mut builder = Store::builder(
        SyncEnginesState::default(),
        SyncEnginesReducer::new(options.policy),
    )
    .with_config(config)
    .with_middleware(LoggingMiddleware);

    if options.forms_follow_history {
        builder = builder.with_middleware(FormsFollowHistory);
    }
    builder.build()
}
