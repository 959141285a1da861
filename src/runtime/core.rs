//! Convenience bundle of one reactor, one worker pool and one timer.
//!
//! Most demos need exactly this trio: a reactor standing in for a UI thread, a pool for
//! offloaded work, and a timer driving delays. [`Runtime`] owns all three and offers the
//! common entry points.

use crate::bridge::{self, Deferred};
use crate::builder::RuntimeBuilder;
use crate::error::Result;
use crate::pool::WorkerPool;
use crate::reactor::{Reactor, ReactorHandle};
use crate::timer::Timer;

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Reactor, worker pool and timer, started together.
pub struct Runtime {
    reactor: Reactor,
    pool: WorkerPool,
    timer: Arc<dyn Timer>,
}

impl Runtime {
    /// Creates a runtime with the default configuration.
    ///
    /// # Example
    /// ```ignore
    /// let rt = Runtime::new()?;
    /// ```
    pub fn new() -> io::Result<Self> {
        RuntimeBuilder::new().build()
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    pub(crate) fn from_parts(reactor: Reactor, pool: WorkerPool, timer: Arc<dyn Timer>) -> Self {
        Self {
            reactor,
            pool,
            timer,
        }
    }

    /// Handle to the runtime's reactor.
    pub fn reactor(&self) -> ReactorHandle {
        self.reactor.handle()
    }

    /// The worker pool used for background work.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The timer backing [`delay`](Self::delay) and [`delay_naive`](Self::delay_naive).
    pub fn timer(&self) -> Arc<dyn Timer> {
        self.timer.clone()
    }

    /// Runs `future` as a flow on the reactor and blocks the calling thread until it ends.
    ///
    /// Calling this from the runtime's own reactor thread deadlocks: the flow's first
    /// poll is queued behind the blocked thread.
    ///
    /// # Example
    /// ```ignore
    /// let result = rt.block_on(async { Ok(42) })?;
    /// assert_eq!(result, 42);
    /// ```
    pub fn block_on<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        self.reactor.handle().spawn(future).block()
    }

    /// Timer-backed delay that consumes no thread while pending.
    pub fn delay(&self, duration: Duration) -> Deferred<()> {
        bridge::delay(&*self.timer, duration)
    }

    /// Timer-backed delay that spins a pool worker until it elapses.
    pub fn delay_naive(&self, duration: Duration) -> Deferred<()> {
        bridge::delay_naive(&*self.timer, &self.pool, duration)
    }
}
