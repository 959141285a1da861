//! Fluent builders for reactors and runtimes.
//!
//! Configuration lives entirely in these builders; nothing is read from files or the
//! environment.

use crate::pool::WorkerPool;
use crate::reactor::Reactor;
use crate::runtime::Runtime;
use crate::timer::{ThreadTimer, Timer};

use std::io;
use std::sync::Arc;

/// Builder for a standalone [`Reactor`].
///
/// # Example
/// ```ignore
/// let reactor = ReactorBuilder::new().name("ui").build()?;
/// ```
pub struct ReactorBuilder {
    name: String,
}

impl Default for ReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactorBuilder {
    pub fn new() -> Self {
        Self {
            name: "reactor".to_owned(),
        }
    }

    /// Names the reactor and its thread.
    ///
    /// # Arguments
    /// * `name` - Used for the thread name and in log events
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Starts the reactor thread.
    ///
    /// # Returns
    /// The running reactor, or the error from spawning its thread
    pub fn build(self) -> io::Result<Reactor> {
        Reactor::new(self.name)
    }
}

/// Builder for constructing [`Runtime`] instances with a fluent API.
///
/// Defaults: a reactor named `ui`, two workers named `worker-<n>`, and a
/// [`ThreadTimer`].
///
/// # Example
/// ```ignore
/// let rt = RuntimeBuilder::new()
///     .reactor_name("ui")
///     .worker_threads(4)
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    reactor_name: String,
    pool_name: String,
    worker_threads: usize,
    timer: Option<Arc<dyn Timer>>,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            reactor_name: "ui".to_owned(),
            pool_name: "worker".to_owned(),
            worker_threads: 2,
            timer: None,
        }
    }

    /// Names the runtime's reactor thread.
    pub fn reactor_name(mut self, name: impl Into<String>) -> Self {
        self.reactor_name = name.into();
        self
    }

    /// Prefix of the worker thread names.
    pub fn pool_name(mut self, name: impl Into<String>) -> Self {
        self.pool_name = name.into();
        self
    }

    /// Number of pool workers; zero is raised to one.
    pub fn worker_threads(mut self, workers: usize) -> Self {
        self.worker_threads = workers;
        self
    }

    /// Uses `timer` instead of starting a [`ThreadTimer`].
    pub fn timer(mut self, timer: Arc<dyn Timer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Starts the reactor, the pool and, unless one was supplied, the timer thread.
    pub fn build(self) -> io::Result<Runtime> {
        let timer: Arc<dyn Timer> = match self.timer {
            Some(timer) => timer,
            None => Arc::new(ThreadTimer::new()?),
        };
        let reactor = Reactor::new(self.reactor_name)?;
        let pool = WorkerPool::with_name(self.pool_name, self.worker_threads)?;

        Ok(Runtime::from_parts(reactor, pool, timer))
    }
}
