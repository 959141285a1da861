//! Thread-safe job queue shared by reactors and worker pools.
//!
//! Provides a FIFO queue that producers push continuations into and one or more
//! dedicated threads drain, one job at a time.

use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

/// A unit of work posted to a reactor or pool thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// A FIFO queue of jobs with blocking pop and explicit shutdown.
///
/// Jobs are popped in the order they were pushed. After [`close`](Self::close) the queue
/// rejects new jobs and hands back the ones still waiting, so the caller decides when
/// they get dropped.
pub(crate) struct JobQueue {
    jobs: Mutex<VecDeque<Job>>,
    available: Condvar,
    closed: AtomicBool,
}

impl JobQueue {
    /// Creates a new, open, empty queue.
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
            available: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueues a job behind every job pushed before it.
    ///
    /// # Arguments
    /// * `job` - The job to enqueue
    ///
    /// # Returns
    /// `Ok(())` when queued, or `Err(job)` handing the job back when the queue is closed
    pub(crate) fn push(&self, job: Job) -> Result<(), Job> {
        let mut jobs = self.jobs.lock();
        if self.closed.load(Ordering::Acquire) {
            return Err(job);
        }
        jobs.push_back(job);
        drop(jobs);

        self.available.notify_one();
        Ok(())
    }

    /// Waits for the next job.
    ///
    /// # Returns
    /// `Some(job)` once one is available, `None` once the queue is closed
    pub(crate) fn pop_blocking(&self) -> Option<Job> {
        let mut jobs = self.jobs.lock();
        loop {
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            if let Some(job) = jobs.pop_front() {
                return Some(job);
            }
            self.available.wait(&mut jobs);
        }
    }

    /// Number of jobs waiting to be popped.
    pub(crate) fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Stops accepting jobs and wakes every waiting thread.
    ///
    /// # Returns
    /// The jobs that were still queued, in queue order. Closing twice returns nothing
    /// the second time.
    pub(crate) fn close(&self) -> Vec<Job> {
        let pending = {
            let mut jobs = self.jobs.lock();
            self.closed.store(true, Ordering::Release);
            jobs.drain(..).collect()
        };
        self.available.notify_all();

        pending
    }

    /// Checks whether [`close`](Self::close) has been called.
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Runs `job`, containing a panic so the calling thread keeps serving its queue.
///
/// # Arguments
/// * `job` - The job to run
/// * `owner` - Name of the reactor, pool or timer running it, for the log
///
/// # Returns
/// `true` if the job returned normally, `false` if it panicked
pub(crate) fn run_contained(job: Job, owner: &str) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(job)) {
        Ok(()) => true,
        Err(payload) => {
            error!(owner, panic = %panic_message(&*payload), "job panicked");
            false
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
