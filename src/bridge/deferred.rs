//! One-shot deferred operation and its continuation records.
//!
//! A [`Deferred`] is the consumer side of the completion bridge. Its shared state cell
//! holds the terminal [`Outcome`] once a [`Resolver`](super::Resolver) settles it, and
//! the ordered list of [`Continuation`]s attached while it was still pending.
//!
//! The cell is guarded by a single mutex, so:
//!
//! - the transition out of `Pending` happens exactly once,
//! - a continuation attached concurrently with resolution is either queued before the
//!   transition (and drained by it) or sees the outcome and is dispatched immediately.
//!
//! Continuations are always invoked outside the lock.

use crate::error::{Error, Result};
use crate::reactor::Affinity;
use crate::runtime::context::enter_blocking;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Observable lifecycle state of a deferred operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Completed,
    Faulted,
    Cancelled,
}

/// Terminal state of a deferred operation, carrying its value or error.
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Completed(T),
    Faulted(Error),
    Cancelled,
}

impl<T> Outcome<T> {
    /// Folds a plain `Result` into an outcome. `Error::Cancelled` becomes
    /// [`Outcome::Cancelled`]; every other error is a fault.
    pub fn from_result(result: Result<T>) -> Self {
        match result {
            Ok(value) => Outcome::Completed(value),
            Err(Error::Cancelled) => Outcome::Cancelled,
            Err(error) => Outcome::Faulted(error),
        }
    }

    /// The terminal state this outcome represents.
    pub fn state(&self) -> State {
        match self {
            Outcome::Completed(_) => State::Completed,
            Outcome::Faulted(_) => State::Faulted,
            Outcome::Cancelled => State::Cancelled,
        }
    }

    /// Converts back into the `Result` waiters receive.
    ///
    /// # Returns
    /// The value, the fault, or [`Error::Cancelled`]
    pub fn into_result(self) -> Result<T> {
        match self {
            Outcome::Completed(value) => Ok(value),
            Outcome::Faulted(error) => Err(error),
            Outcome::Cancelled => Err(Error::Cancelled),
        }
    }
}

pub(crate) type Callback<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// "Resume this flow with this result", bound to the context that must run it.
pub(crate) struct Continuation<T> {
    target: Affinity,
    callback: Callback<T>,
}

impl<T: Send + 'static> Continuation<T> {
    pub(crate) fn new(target: Affinity, callback: Callback<T>) -> Self {
        Self { target, callback }
    }

    /// Runs the callback inline for indifferent records, or posts it to the target reactor.
    fn dispatch(self, result: Result<T>) {
        match self.target {
            Affinity::Indifferent => (self.callback)(result),
            Affinity::Affine(reactor) => {
                trace!(reactor = %reactor.name(), "posting continuation to reactor");
                let delivery = Delivery {
                    callback: Some(self.callback),
                    result: Some(result),
                };
                // A rejected job is dropped right here, which reports Closed.
                let _ = reactor.post(move || delivery.run());
            }
        }
    }
}

/// A continuation travelling through a reactor queue.
///
/// If the job is dropped without running (reactor shut down) the callback still fires,
/// with [`Error::Closed`], so no waiter is ever lost.
struct Delivery<T> {
    callback: Option<Callback<T>>,
    result: Option<Result<T>>,
}

impl<T> Delivery<T> {
    fn run(mut self) {
        if let (Some(callback), Some(result)) = (self.callback.take(), self.result.take()) {
            callback(result);
        }
    }
}

impl<T> Drop for Delivery<T> {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            callback(Err(Error::Closed));
        }
    }
}

struct Cell<T> {
    outcome: Option<Outcome<T>>,
    waiters: Vec<Continuation<T>>,
}

pub(crate) struct Shared<T> {
    cell: Mutex<Cell<T>>,
    resolved: Condvar,
    pub(crate) resolvers: AtomicUsize,
}

impl<T: Clone + Send + 'static> Shared<T> {
    fn new(outcome: Option<Outcome<T>>) -> Self {
        Self {
            cell: Mutex::new(Cell {
                outcome,
                waiters: Vec::new(),
            }),
            resolved: Condvar::new(),
            resolvers: AtomicUsize::new(0),
        }
    }

    /// Moves the cell out of `Pending`. Returns the state already reached when another
    /// transition won.
    pub(crate) fn transition(&self, outcome: Outcome<T>) -> std::result::Result<(), State> {
        let waiters = {
            let mut cell = self.cell.lock();
            if let Some(existing) = &cell.outcome {
                return Err(existing.state());
            }
            debug!(state = ?outcome.state(), waiters = cell.waiters.len(), "deferred operation resolved");
            cell.outcome = Some(outcome.clone());
            std::mem::take(&mut cell.waiters)
        };

        self.resolved.notify_all();

        // A panicking waiter must not cost the remaining waiters their delivery.
        let mut panicked = None;
        for waiter in waiters {
            let result = outcome.clone().into_result();
            let dispatched = panic::catch_unwind(AssertUnwindSafe(|| waiter.dispatch(result)));
            if let Err(payload) = dispatched
                && panicked.is_none()
            {
                panicked = Some(payload);
            }
        }
        if let Some(payload) = panicked {
            panic::resume_unwind(payload);
        }

        Ok(())
    }

    fn attach(&self, continuation: Continuation<T>) {
        let outcome = {
            let mut cell = self.cell.lock();
            match &cell.outcome {
                None => {
                    cell.waiters.push(continuation);
                    return;
                }
                Some(outcome) => outcome.clone(),
            }
        };

        continuation.dispatch(outcome.into_result());
    }

    fn state(&self) -> State {
        self.cell
            .lock()
            .outcome
            .as_ref()
            .map_or(State::Pending, Outcome::state)
    }

    fn outcome(&self) -> Option<Outcome<T>> {
        self.cell.lock().outcome.clone()
    }
}

/// Consumer handle onto a one-shot, externally resolved result.
///
/// Cloning the handle adds another observer of the same operation. Every observer,
/// whether it uses [`wait`](Self::wait), [`on_complete`](Self::on_complete) or
/// [`block`](Self::block), sees the terminal state exactly once.
///
/// # Example
/// ```ignore
/// let (deferred, resolver) = completion_bridge::bridge::create::<u32>();
/// timer.after(Duration::from_secs(3), Box::new(move || {
///     let _ = resolver.resolve(7);
/// }));
/// let value = deferred.wait(Affinity::Indifferent).await?;
/// ```
pub struct Deferred<T> {
    pub(crate) shared: Arc<Shared<T>>,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Deferred<T> {
    /// Creates a pending operation together with its resolver.
    ///
    /// Same as [`create`](super::create).
    ///
    /// # Returns
    /// The consumer handle and the only capability able to settle it
    pub fn pair() -> (Self, super::Resolver<T>) {
        let shared = Arc::new(Shared::new(None));
        let resolver = super::Resolver::new(shared.clone());

        (Self { shared }, resolver)
    }

    /// An operation that is already completed with `value`.
    pub fn completed(value: T) -> Self {
        Self::settled(Outcome::Completed(value))
    }

    /// An operation that already faulted with `error`.
    pub fn faulted(error: Error) -> Self {
        Self::settled(Outcome::from_result(Err(error)))
    }

    /// An operation that is already cancelled.
    pub fn cancelled() -> Self {
        Self::settled(Outcome::Cancelled)
    }

    fn settled(outcome: Outcome<T>) -> Self {
        Self {
            shared: Arc::new(Shared::new(Some(outcome))),
        }
    }

    /// Current lifecycle state; never moves again once it leaves [`State::Pending`].
    pub fn state(&self) -> State {
        self.shared.state()
    }

    /// `true` until a resolver settles the operation.
    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    /// Returns the terminal outcome without waiting.
    ///
    /// # Returns
    /// `Some(outcome)` once settled, `None` while pending
    pub fn try_outcome(&self) -> Option<Outcome<T>> {
        self.shared.outcome()
    }

    /// Attaches a continuation record.
    ///
    /// With [`Affinity::Indifferent`] the callback runs on whichever thread resolves the
    /// operation. With [`Affinity::Affine`] it is queued on that reactor and runs only once
    /// the reactor's thread is free to drain its queue. Attaching to an operation that has
    /// already resolved dispatches right away under the same rules.
    ///
    /// # Arguments
    /// * `affinity` - Where `callback` must run
    /// * `callback` - Receives the value or error exactly once. If the target reactor
    ///   has shut down it receives [`Error::Closed`] instead
    pub fn on_complete<F>(&self, affinity: Affinity, callback: F)
    where
        F: FnOnce(Result<T>) + Send + 'static,
    {
        self.shared
            .attach(Continuation::new(affinity, Box::new(callback)));
    }

    /// Suspends the calling flow until the operation resolves, without blocking its thread.
    ///
    /// `affinity` names where the flow must resume: on the thread that resolves the
    /// operation, or on a specific reactor.
    ///
    /// # Returns
    /// A [`Wait`](super::Wait) future yielding the value or the error
    pub fn wait(&self, affinity: Affinity) -> super::Wait<T> {
        super::Wait::new(self.clone(), affinity)
    }

    /// Blocks the calling thread until the operation resolves.
    ///
    /// # Deadlock
    ///
    /// When called on a reactor thread, that reactor cannot drain its queue until this
    /// returns. If the resolution of this operation depends on any continuation affine to
    /// the same reactor, this call never returns. That hang is fatal and is not detected
    /// beyond a warning; use [`wait`](Self::wait) instead.
    pub fn block(&self) -> Result<T> {
        let _blocking = enter_blocking();

        let mut cell = self.shared.cell.lock();
        loop {
            if let Some(outcome) = &cell.outcome {
                return outcome.clone().into_result();
            }
            self.shared.resolved.wait(&mut cell);
        }
    }

    /// Like [`block`](Self::block), but gives up after `timeout` with [`Error::TimedOut`].
    ///
    /// A timed-out call leaves the operation untouched; it may still resolve later.
    /// A timeout too large to express as a deadline waits without bound.
    pub fn block_timeout(&self, timeout: Duration) -> Result<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.block();
        };
        let _blocking = enter_blocking();

        let mut cell = self.shared.cell.lock();
        loop {
            if let Some(outcome) = &cell.outcome {
                return outcome.clone().into_result();
            }
            if self
                .shared
                .resolved
                .wait_until(&mut cell, deadline)
                .timed_out()
            {
                return match &cell.outcome {
                    Some(outcome) => outcome.clone().into_result(),
                    None => Err(Error::TimedOut(timeout)),
                };
            }
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish()
    }
}
