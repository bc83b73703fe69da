//! Error types for store operations.

use thiserror::Error;

/// Errors that can occur while dispatching to or observing a store.
///
/// None of these ever corrupt the published state: a snapshot is only swapped
/// in after its reduction completed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The reducer panicked for this action. The previous state stays current.
    #[error("Store '{store}': reducer failed on {action}: {message}")]
    ReducerFailure {
        store: String,
        action: String,
        message: String,
    },

    /// A middleware panicked for this action. Anything the chain committed
    /// before the panic stays current.
    #[error("Store '{store}': middleware failed on {action}: {message}")]
    MiddlewareFailure {
        store: String,
        action: String,
        message: String,
    },

    /// An observer panicked while being notified. Reported to the failure sink,
    /// never to the dispatching caller.
    #[error("Store '{store}': observer #{subscription} failed: {message}")]
    ObserverFailure {
        store: String,
        subscription: u64,
        message: String,
    },

    /// The store was disposed before this call.
    #[error("Store '{store}' has been disposed")]
    Disposed { store: String },

    /// A middleware, reducer or observer tried to dispatch into the store that
    /// is currently running it.
    #[error("Store '{store}': dispatch called from inside its own dispatch pipeline")]
    Reentrant { store: String },

    /// The async dispatcher's worker task is no longer running.
    #[error("Store '{store}': async dispatcher is closed")]
    DispatcherClosed { store: String },
}

impl StoreError {
    /// Name of the store this error came from.
    pub fn store(&self) -> &str {
        match self {
            StoreError::ReducerFailure { store, .. }
            | StoreError::MiddlewareFailure { store, .. }
            | StoreError::ObserverFailure { store, .. }
            | StoreError::Disposed { store }
            | StoreError::Reentrant { store }
            | StoreError::DispatcherClosed { store } => store,
        }
    }
}

/// Render a caught panic payload as text.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
