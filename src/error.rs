//! Error type shared by every operation in the crate.
//!
//! Errors are delivered to every waiter of a [`Deferred`](crate::Deferred), so the
//! type is `Clone`. Faults coming from producers are wrapped in a [`Fault`] that shares
//! the original error behind an `Arc`.
//!
//! A deadlock is deliberately absent from this enum: blocking a reactor on work that
//! needs the same reactor hangs forever and is never turned into a value.

use crate::bridge::State;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by deferred operations, reactors and workflows.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A cooperative cancellation signal was observed.
    #[error("operation was cancelled")]
    Cancelled,

    /// A multi-step workflow observed cancellation between its steps.
    ///
    /// Raised instead of [`Error::Cancelled`] at workflow level so callers can tell a
    /// partially built aggregate apart from a low-level cancelled operation.
    #[error("workflow was cancelled before every part was produced")]
    Incomplete,

    /// The producer reported a failure.
    #[error("operation faulted: {0}")]
    Faulted(Fault),

    /// A resolver tried to move an operation that already reached a terminal state.
    #[error("operation is already {state:?}")]
    AlreadyTerminal {
        /// State the operation was in when the extra transition was attempted.
        state: State,
    },

    /// Every resolver was dropped while the operation was still pending.
    #[error("every resolver was dropped before the operation resolved")]
    Abandoned,

    /// A bounded wait elapsed first.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),

    /// The target reactor or worker pool has shut down and no longer accepts work.
    #[error("reactor or worker pool has shut down")]
    Closed,
}

impl Error {
    /// Wraps any error as a [`Error::Faulted`].
    pub fn faulted<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Faulted(Fault::new(error))
    }

    /// Builds a [`Error::Faulted`] from a plain message.
    pub fn fault_message(message: impl Into<String>) -> Self {
        Error::Faulted(Fault::msg(message))
    }

    /// Returns `true` for cancellation at either operation or workflow level.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled | Error::Incomplete)
    }
}

/// Shareable producer failure.
#[derive(Clone)]
pub struct Fault {
    inner: Arc<dyn std::error::Error + Send + Sync>,
}

impl Fault {
    /// Wraps `error` so clones of an outcome can share it.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
        }
    }

    /// A fault carrying only a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns the wrapped error.
    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        &*self.inner
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.inner, f)
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);
