//! Producer capability of the completion bridge.

use super::deferred::{Outcome, Shared};
use crate::error::{Error, Result};

use std::fmt;
use std::sync::{Arc, Weak};
use std::sync::atomic::Ordering;
use tracing::warn;

/// Private capability that settles a [`Deferred`](super::Deferred) exactly once.
///
/// Typically moved into a timer or background callback. Clones share the same target, so
/// several producers may race; only the first transition wins.
///
/// The checked methods ([`resolve`](Self::resolve), [`fail`](Self::fail),
/// [`cancel`](Self::cancel)) report a second transition as [`Error::AlreadyTerminal`] and
/// log it. The `try_` variants return `false` quietly, for producers that race by design.
///
/// Dropping the last resolver of a pending operation faults it with [`Error::Abandoned`].
pub struct Resolver<T: Clone + Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone + Send + 'static> Resolver<T> {
    pub(crate) fn new(shared: Arc<Shared<T>>) -> Self {
        shared.resolvers.fetch_add(1, Ordering::AcqRel);
        Self { shared }
    }

    /// Completes the operation with `value`.
    ///
    /// # Returns
    /// [`Error::AlreadyTerminal`] if another transition got there first
    pub fn resolve(&self, value: T) -> Result<()> {
        self.settle(Outcome::Completed(value))
    }

    /// Faults the operation; every waiter observes `error`.
    pub fn fail(&self, error: Error) -> Result<()> {
        self.settle(Outcome::from_result(Err(error)))
    }

    /// Cancels the operation; every waiter observes [`Error::Cancelled`].
    pub fn cancel(&self) -> Result<()> {
        self.settle(Outcome::Cancelled)
    }

    /// Settles the operation from a plain `Result`.
    pub fn complete(&self, result: Result<T>) -> Result<()> {
        self.settle(Outcome::from_result(result))
    }

    /// Completes the operation with `value` unless it is already settled.
    ///
    /// # Arguments
    /// * `value` - The value every waiter receives
    ///
    /// # Returns
    /// `true` if this call settled the operation
    pub fn try_resolve(&self, value: T) -> bool {
        self.shared.transition(Outcome::Completed(value)).is_ok()
    }

    /// Quiet form of [`fail`](Self::fail).
    pub fn try_fail(&self, error: Error) -> bool {
        self.shared
            .transition(Outcome::from_result(Err(error)))
            .is_ok()
    }

    /// Quiet form of [`cancel`](Self::cancel).
    pub fn try_cancel(&self) -> bool {
        self.shared.transition(Outcome::Cancelled).is_ok()
    }

    /// Quiet form of [`complete`](Self::complete).
    pub fn try_complete(&self, result: Result<T>) -> bool {
        self.shared.transition(Outcome::from_result(result)).is_ok()
    }

    /// A handle that can still cancel the operation but does not count as a resolver,
    /// so it never holds the operation open.
    pub(crate) fn downgrade(&self) -> WeakResolver<T> {
        WeakResolver {
            shared: Arc::downgrade(&self.shared),
        }
    }

    fn settle(&self, outcome: Outcome<T>) -> Result<()> {
        let attempted = outcome.state();

        self.shared.transition(outcome).map_err(|state| {
            warn!(?state, ?attempted, "ignoring second resolution of a deferred operation");
            Error::AlreadyTerminal { state }
        })
    }
}

impl<T: Clone + Send + 'static> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self::new(self.shared.clone())
    }
}

impl<T: Clone + Send + 'static> Drop for Resolver<T> {
    fn drop(&mut self) {
        if self.shared.resolvers.fetch_sub(1, Ordering::AcqRel) == 1
            && self.shared.transition(Outcome::Faulted(Error::Abandoned)).is_ok()
        {
            warn!("last resolver dropped while the operation was pending");
        }
    }
}

pub(crate) struct WeakResolver<T> {
    shared: Weak<Shared<T>>,
}

impl<T: Clone + Send + 'static> WeakResolver<T> {
    pub(crate) fn try_cancel(&self) -> bool {
        self.shared
            .upgrade()
            .is_some_and(|shared| shared.transition(Outcome::Cancelled).is_ok())
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("resolvers", &self.shared.resolvers.load(Ordering::Acquire))
            .finish()
    }
}
