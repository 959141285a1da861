//! Observable state of a UI surface driven by asynchronous operations.
//!
//! A surface exposes two properties for display: whether an operation is loading, and
//! which execution context last touched it. Both are updated when an operation starts
//! and when it resolves, and observers are told about each change.

use crate::bridge::Deferred;
use crate::reactor::Affinity;
use crate::runtime::context::current_context_id;

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

type Observer = Arc<dyn Fn(&Snapshot) + Send + Sync + 'static>;

/// Point-in-time copy of a surface's properties.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub is_loading: bool,
    pub current_context_id: String,
}

#[derive(Default)]
struct Inner {
    snapshot: Mutex<Snapshot>,
    observers: Mutex<Vec<Observer>>,
}

/// Shared, observable `isLoading` / `currentContextId` pair.
#[derive(Clone, Default)]
pub struct Surface {
    inner: Arc<Inner>,
}

impl Surface {
    /// Creates an idle surface with an empty context id.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` between [`begin`](Self::begin) and [`finish`](Self::finish).
    pub fn is_loading(&self) -> bool {
        self.inner.snapshot.lock().is_loading
    }

    /// Identifier of the context that last changed the surface.
    pub fn current_context_id(&self) -> String {
        self.inner.snapshot.lock().current_context_id.clone()
    }

    /// Reads both properties under one lock.
    ///
    /// # Returns
    /// A consistent copy that later changes do not affect
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.lock().clone()
    }

    /// Registers `observer`, called with every new snapshot on the thread that changed it.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.inner.observers.lock().push(Arc::new(observer));
    }

    /// Marks an operation as started from the current context.
    pub fn begin(&self) {
        self.update(true);
    }

    /// Marks the operation as finished from the current context.
    pub fn finish(&self) {
        self.update(false);
    }

    /// Begins now and finishes when `operation` resolves, from the context named by
    /// `affinity`.
    pub fn track<T>(&self, operation: &Deferred<T>, affinity: Affinity)
    where
        T: Clone + Send + 'static,
    {
        self.begin();

        let surface = self.clone();
        operation.on_complete(affinity, move |_| surface.finish());
    }

    fn update(&self, is_loading: bool) {
        let snapshot = {
            let mut snapshot = self.inner.snapshot.lock();
            snapshot.is_loading = is_loading;
            snapshot.current_context_id = current_context_id();
            snapshot.clone()
        };

        debug!(
            is_loading,
            context = %snapshot.current_context_id,
            "surface updated"
        );

        let observers = self.inner.observers.lock().clone();
        for observer in observers {
            observer(&snapshot);
        }
    }
}
