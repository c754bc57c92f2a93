//! Single-instance service registry.
//!
//! Components that own external resources (the knowledge graph module opens a
//! session on construction) must be built at most once per process even when
//! first accessed from concurrent call sites. The registry is created in
//! `main` and passed down explicitly; constructors receive their dependencies
//! as parameters rather than reaching into process globals.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A one-slot container guaranteeing at-most-one construction of `T`.
pub struct ServiceRegistry<T> {
    slot: OnceCell<Arc<T>>,
}

impl<T> ServiceRegistry<T> {
    pub fn new() -> Self {
        Self {
            slot: OnceCell::new(),
        }
    }

    /// Return the shared instance, constructing it with `init` on first
    /// access. Concurrent first callers all receive the same instance; `init`
    /// runs exactly once.
    pub async fn get_or_init<F, Fut>(&self, init: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.slot
            .get_or_init(|| async { Arc::new(init().await) })
            .await
            .clone()
    }

    /// Fallible variant: a failed `init` leaves the slot empty so a later
    /// call may retry.
    pub async fn get_or_try_init<F, Fut, E>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.slot
            .get_or_try_init(|| async { init().await.map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// The instance, if already constructed.
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot.get().cloned()
    }
}

impl<T> Default for ServiceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
