//! Base trait for state snapshots.

/// Marker trait for state objects.
///
/// States should be:
/// - Immutable (Clone to derive new states, never edited once published)
/// - Self-contained (everything a consumer needs to render or decide)
/// - Comparable (PartialEq for detecting changes)
///
/// The store publishes states as `Arc<S>`, so they must be shareable across
/// threads.
pub trait State: Clone + PartialEq + Send + Sync + 'static {}
