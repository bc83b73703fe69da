//! Lifecycle scopes that subscriptions can be bound to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

type Cleanup = Box<dyn FnOnce() + Send>;

struct ScopeInner {
    closed: AtomicBool,
    cleanups: Mutex<Vec<Cleanup>>,
    notify: Notify,
}

/// A lifetime that ends once, explicitly.
///
/// Work registered with [`on_close`](Scope::on_close) runs when the scope is
/// closed. Clones share the same lifetime.
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                closed: AtomicBool::new(false),
                cleanups: Mutex::new(Vec::new()),
                notify: Notify::new(),
            }),
        }
    }

    /// Run `cleanup` when the scope closes, or right now if it already has.
    pub fn on_close<F>(&self, cleanup: F)
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut cleanups = self.inner.cleanups.lock();
            // Checked under the lock: close() flips the flag before draining.
            if !self.inner.closed.load(Ordering::SeqCst) {
                cleanups.push(Box::new(cleanup));
                return;
            }
        }
        cleanup();
    }

    /// Close the scope. Idempotent; cleanups run once, in registration order.
    pub fn close(&self) {
        let cleanups = {
            let mut cleanups = self.inner.cleanups.lock();
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            std::mem::take(&mut *cleanups)
        };

        tracing::trace!(cleanups = cleanups.len(), "Closing scope");
        for cleanup in cleanups {
            cleanup();
        }
        self.inner.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Resolves once the scope is closed.
    pub async fn closed(&self) {
        // Enable before checking the flag so a close() in between is not lost.
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_closed() {
            return;
        }
        notified.await;
    }

    /// A scope that closes together with this one, but can also be closed
    /// on its own.
    pub fn child(&self) -> Scope {
        let child = Scope::new();
        let handle = child.clone();
        self.on_close(move || handle.close());
        child
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("closed", &self.is_closed())
            .field("pending", &self.inner.cleanups.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[test]
    fn cleanups_run_once_in_order() {
        let scope = Scope::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b"] {
            let order = Arc::clone(&order);
            scope.on_close(move || order.lock().push(tag));
        }

        scope.close();
        scope.close();
        assert!(scope.is_closed());
        assert_eq!(*order.lock(), vec!["a", "b"]);
    }

    #[test]
    fn on_close_after_close_runs_immediately() {
        let scope = Scope::new();
        scope.close();
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        scope.on_close(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn child_closes_with_parent_but_not_vice_versa() {
        let parent = Scope::new();
        let first = parent.child();
        let second = parent.child();

        first.close();
        assert!(!parent.is_closed());
        assert!(!second.is_closed());

        parent.close();
        assert!(second.is_closed());
    }

    #[tokio::test]
    async fn closed_resolves_after_close() {
        let scope = Scope::new();
        let waiter = {
            let scope = scope.clone();
            tokio::spawn(async move { scope.closed().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        scope.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("closed() should resolve")
            .unwrap();

        // Already closed: resolves immediately.
        scope.closed().await;
    }
}
