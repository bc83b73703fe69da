use crate::store::{Middleware, MiddlewareContext, Next, StoreError};

use super::action::SyncEnginesAction;
use super::engine::SyncEngine;
use super::state::SyncEnginesState;

/// Applies every History enable/disable to Forms as well.
///
/// The sync service presents history and form data as one engine to the
/// user. The Forms change is a follow-up action, so observers see the
/// History commit first.
#[derive(Debug, Default, Clone, Copy)]
pub struct FormsFollowHistory;

impl Middleware<SyncEnginesState, SyncEnginesAction> for FormsFollowHistory {
    fn handle(
        &self,
        ctx: &mut MiddlewareContext<'_, SyncEnginesState, SyncEnginesAction>,
        next: Next<'_, SyncEnginesState, SyncEnginesAction>,
        action: SyncEnginesAction,
    ) -> Result<(), StoreError> {
        let follow_up = match &action {
            SyncEnginesAction::Enable(SyncEngine::History) => {
                Some(SyncEnginesAction::Enable(SyncEngine::Forms))
            }
            SyncEnginesAction::Disable(SyncEngine::History) => {
                Some(SyncEnginesAction::Disable(SyncEngine::Forms))
            }
            _ => None,
        };

        next.run(ctx, action)?;

        if let Some(follow_up) = follow_up {
            tracing::trace!(store = %ctx.store_name(), action = ?follow_up, "Mirroring history change");
            ctx.dispatch(follow_up);
        }
        Ok(())
    }
}
