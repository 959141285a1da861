//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is polled between independent steps of a larger flow, or
//! observed through callbacks registered with [`CancellationToken::on_cancel`].
//! Cancelling never rolls anything back; it only stops what has not finished yet.

use crate::error::{Error, Result};

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

type Callback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    callbacks: Mutex<Callbacks>,
}

#[derive(Default)]
struct Callbacks {
    next_id: u64,
    entries: Vec<(u64, Callback)>,
}

/// Shared cancellation flag. Clones observe and trigger the same signal.
#[derive(Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation and runs every registered callback on the calling thread.
    ///
    /// Only the first call has an effect.
    pub fn cancel(&self) {
        let callbacks = {
            let mut callbacks = self.inner.callbacks.lock();
            if self.inner.cancelled.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut callbacks.entries)
        };

        debug!(callbacks = callbacks.len(), "cancellation requested");

        for (_, callback) in callbacks {
            callback();
        }
    }

    /// `true` once any clone has called [`cancel`](Self::cancel).
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Returns [`Error::Cancelled`] once cancellation has been requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Runs `callback` when the token is cancelled, or right away if it already is.
    ///
    /// # Arguments
    /// * `callback` - Invoked at most once, on the thread that cancels
    ///
    /// # Returns
    /// A [`Registration`] that withdraws the callback once it is no longer needed.
    /// Dropping the registration keeps the callback registered.
    pub fn on_cancel<F>(&self, callback: F) -> Registration
    where
        F: FnOnce() + Send + 'static,
    {
        {
            let mut callbacks = self.inner.callbacks.lock();
            if !self.inner.cancelled.load(Ordering::Acquire) {
                let id = callbacks.next_id;
                callbacks.next_id += 1;
                callbacks.entries.push((id, Box::new(callback)));

                return Registration {
                    inner: Arc::downgrade(&self.inner),
                    id: Some(id),
                };
            }
        }

        callback();

        Registration {
            inner: Weak::new(),
            id: None,
        }
    }

    /// Number of callbacks waiting for cancellation.
    pub fn registered(&self) -> usize {
        self.inner.callbacks.lock().entries.len()
    }
}

/// Handle to a callback registered with [`CancellationToken::on_cancel`].
#[derive(Debug)]
pub struct Registration {
    inner: Weak<Inner>,
    id: Option<u64>,
}

impl Registration {
    /// Withdraws the callback so cancellation no longer runs it.
    ///
    /// # Returns
    /// `true` if the callback was still registered, `false` if it already ran or the
    /// token is gone
    pub fn unregister(self) -> bool {
        let (Some(id), Some(inner)) = (self.id, self.inner.upgrade()) else {
            return false;
        };

        let mut callbacks = inner.callbacks.lock();
        match callbacks.entries.iter().position(|(entry, _)| *entry == id) {
            Some(index) => {
                // Dropped outside the lock: the callback may own resolvers.
                let (_, callback) = callbacks.entries.swap_remove(index);
                drop(callbacks);
                drop(callback);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
