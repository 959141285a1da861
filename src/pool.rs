//! Background worker pool.
//!
//! Work dispatched here carries no reactor affinity: it runs on whichever worker picks it
//! up, and an async flow spawned here resumes on arbitrary threads unless one of its await
//! points names a reactor.

use crate::bridge::{Deferred, create};
use crate::error::{Error, Result};
use crate::runtime::queue::{Job, JobQueue, run_contained};
use crate::task::Task;

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, trace};

struct PoolCore {
    name: String,
    queue: JobQueue,
    workers: usize,
    busy: AtomicUsize,
}

struct Shutdown {
    core: Arc<PoolCore>,
}

impl Drop for Shutdown {
    fn drop(&mut self) {
        let pending = self.core.queue.close();
        debug!(pool = %self.core.name, dropped = pending.len(), "worker pool shutting down");
    }
}

/// A fixed set of worker threads sharing one FIFO queue.
///
/// Clones share the same workers. The workers stop once every clone is dropped; jobs that
/// were still queued are dropped without running.
#[derive(Clone)]
pub struct WorkerPool {
    core: Arc<PoolCore>,
    _shutdown: Arc<Shutdown>,
}

impl WorkerPool {
    /// Starts a pool of `workers` threads named `worker-<n>`.
    ///
    /// # Arguments
    /// * `workers` - Number of threads; zero is raised to one
    ///
    /// # Returns
    /// The pool, or the error from spawning a thread
    pub fn new(workers: usize) -> io::Result<Self> {
        Self::with_name("worker", workers)
    }

    /// Starts `workers` threads named `<name>-<index>`.
    ///
    /// # Arguments
    /// * `name` - Prefix for thread names and log fields
    /// * `workers` - Number of threads; zero is raised to one
    pub fn with_name(name: impl Into<String>, workers: usize) -> io::Result<Self> {
        let core = Arc::new(PoolCore {
            name: name.into(),
            queue: JobQueue::new(),
            workers: workers.max(1),
            busy: AtomicUsize::new(0),
        });
        let shutdown = Arc::new(Shutdown { core: core.clone() });

        for index in 0..core.workers {
            let worker = core.clone();
            thread::Builder::new()
                .name(format!("{}-{}", core.name, index))
                .spawn(move || work(worker))?;
        }

        debug!(pool = %core.name, workers = core.workers, "worker pool started");

        Ok(Self {
            core,
            _shutdown: shutdown,
        })
    }

    /// Number of worker threads in the pool.
    pub fn workers(&self) -> usize {
        self.core.workers
    }

    /// Number of workers currently running a job.
    ///
    /// A worker spinning inside [`delay_naive`](crate::delay_naive) counts as busy for
    /// the whole delay.
    pub fn busy_workers(&self) -> usize {
        self.core.busy.load(Ordering::Acquire)
    }

    /// Number of jobs waiting for a free worker.
    pub fn queued_jobs(&self) -> usize {
        self.core.queue.len()
    }

    /// Queues `job` for the next free worker.
    ///
    /// A panicking job is logged and contained; the worker moves on to the next job.
    ///
    /// # Returns
    /// `Err(Error::Closed)` once the pool has shut down
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(Box::new(job))
    }

    /// Runs `function` on a worker and exposes its return value as a deferred operation.
    ///
    /// If `function` panics, or the pool shuts down before running it, the operation
    /// faults with [`Error::Abandoned`] or [`Error::Closed`].
    pub fn run<F, R>(&self, function: F) -> Deferred<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Clone + Send + 'static,
    {
        let (deferred, resolver) = create();
        let fallback = resolver.clone();

        if let Err(error) = self.execute(move || {
            let _ = resolver.resolve(function());
        }) {
            let _ = fallback.fail(error);
        }

        deferred
    }

    /// Starts an async flow whose first poll happens on a worker.
    ///
    /// Later polls happen wherever the flow's await points send it.
    pub fn spawn<F, T>(&self, future: F) -> Deferred<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let (task, deferred) = Task::detached(future);

        // A rejected job drops the task, which faults the deferred as abandoned.
        let _ = self.execute(move || task.run());

        deferred
    }

    fn push(&self, job: Job) -> Result<()> {
        self.core.queue.push(job).map_err(|rejected| {
            drop(rejected);
            Error::Closed
        })
    }
}

/// Counts a worker as busy for as long as it lives.
struct Busy<'a>(&'a AtomicUsize);

impl<'a> Busy<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn work(core: Arc<PoolCore>) {
    while let Some(job) = core.queue.pop_blocking() {
        let _busy = Busy::enter(&core.busy);
        trace!(pool = %core.name, "worker picked up a job");
        run_contained(job, &core.name);
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.core.name)
            .field("workers", &self.core.workers)
            .field("busy", &self.busy_workers())
            .finish()
    }
}
