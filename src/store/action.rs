//! Base trait for actions in the state-store architecture.

use std::fmt::Debug;

/// Marker trait for action objects.
///
/// Actions describe *what happened*:
/// - User choices (enable an engine, clear a list)
/// - System events (a migration finished, a sync completed)
///
/// They carry data only and are processed by reducers to produce new states.
/// `Debug` is required so the store can name the action in logs and errors.
pub trait Action: Debug + Send + 'static {}
