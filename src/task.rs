//! Async flows that resume where their await points ask them to.
//!
//! A task wraps a future whose output resolves a [`Deferred`]. Unlike a classic executor,
//! tasks have no home queue: a task is polled by the thread that wakes it, unless the
//! most recent await point asked for a reactor, in which case the poll is posted there.
//!
//! # How Tasks Run
//!
//! 1. The first poll happens on the thread that starts the task ([`Task::start`]), on a
//!    reactor ([`ReactorHandle::spawn`]) or on a pool worker ([`WorkerPool::spawn`])
//! 2. An await point ([`Deferred::wait`]) records its [`Affinity`] on the task
//! 3. When the awaited operation resolves, its continuation wakes the task
//! 4. The waker polls the task right there, or posts the poll to the recorded reactor
//! 5. When the future completes, its `Result` settles the task's deferred operation
//!
//! The task state machine guarantees one poll at a time: a wake that arrives while the
//! task is being polled marks it notified, and the polling thread polls again (or hands
//! the task over to its reactor) instead of polling concurrently.
//!
//! [`ReactorHandle::spawn`]: crate::reactor::ReactorHandle::spawn
//! [`WorkerPool::spawn`]: crate::pool::WorkerPool::spawn

use crate::bridge::{Deferred, create};
use crate::error::Result;
use crate::reactor::{Affinity, ReactorHandle};
use crate::runtime::context::{current_task, enter_task};
use crate::runtime::queue::panic_message;
use crate::runtime::waker::make_waker;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::task::Context;
use tracing::{error, trace, warn};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const NOTIFIED: u8 = 2;
const DONE: u8 = 3;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A running async flow.
///
/// Tasks are created through [`Task::start`], [`ReactorHandle::spawn`] or
/// [`WorkerPool::spawn`](crate::pool::WorkerPool::spawn) and observed through the
/// [`Deferred`] those return.
pub struct Task {
    id: u64,
    future: Mutex<Option<BoxFuture<'static, ()>>>,
    state: AtomicU8,
    resume: Mutex<Affinity>,
}

impl Task {
    fn new<F, T>(future: F, resume: Affinity) -> (Arc<Self>, Deferred<T>)
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let (deferred, resolver) = create();

        let body = async move {
            let result = future.await;
            let _ = resolver.complete(result);
        };

        let task = Arc::new(Task {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            future: Mutex::new(Some(Box::pin(body))),
            state: AtomicU8::new(IDLE),
            resume: Mutex::new(resume),
        });

        (task, deferred)
    }

    /// Starts `future` on the calling thread, the way calling an `async` function runs its
    /// body up to the first suspension.
    ///
    /// # Arguments
    /// * `future` - The flow; its `Result` settles the returned operation
    ///
    /// # Returns
    /// A [`Deferred`] that resolves with the flow's output. A flow that panics is
    /// dropped and the operation faults with [`Error::Abandoned`](crate::Error::Abandoned).
    ///
    /// # Example
    /// ```ignore
    /// let flow = Task::start(async move {
    ///     delay.wait(Affinity::Indifferent).await?;
    ///     Ok("done")
    /// });
    /// ```
    pub fn start<F, T>(future: F) -> Deferred<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let (task, deferred) = Task::new(future, Affinity::Indifferent);
        task.run();

        deferred
    }

    pub(crate) fn spawn_on<F, T>(reactor: ReactorHandle, future: F) -> Deferred<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        let (task, deferred) = Task::new(future, Affinity::Affine(reactor.clone()));

        // A rejected job drops the task, which faults the deferred as abandoned.
        let _ = reactor.post(move || task.run());

        deferred
    }

    /// Creates a task without polling it; the caller decides where the first poll happens.
    pub(crate) fn detached<F, T>(future: F) -> (Arc<Self>, Deferred<T>)
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        Task::new(future, Affinity::Indifferent)
    }

    /// Process-unique task number, used in log fields.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Records where the task currently being polled must resume next.
    ///
    /// Called by await points; a no-op outside a task.
    pub(crate) fn resume_on(affinity: Affinity) {
        if let Some(task) = current_task() {
            *task.resume.lock() = affinity;
        }
    }

    /// Entry point for wakers: poll here, or hand the poll to the recorded reactor.
    pub(crate) fn schedule(self: Arc<Self>) {
        let resume = self.resume.lock().clone();

        match resume {
            Affinity::Affine(reactor) if !reactor.is_current() => {
                trace!(task = self.id, reactor = %reactor.name(), "resuming task on its reactor");
                if reactor.post(move || self.run()).is_err() {
                    warn!(reactor = %reactor.name(), "reactor closed before the task could resume");
                }
            }
            _ => self.run(),
        }
    }

    /// Polls the task on the current thread until it completes or goes idle.
    pub(crate) fn run(self: Arc<Self>) {
        loop {
            match self
                .state
                .compare_exchange(IDLE, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => break,
                Err(RUNNING) => {
                    if self
                        .state
                        .compare_exchange(RUNNING, NOTIFIED, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok()
                    {
                        return;
                    }
                }
                Err(_) => return,
            }
        }

        let waker = make_waker(self.clone());

        loop {
            let mut context = Context::from_waker(&waker);

            let ready = {
                let mut slot = self.future.lock();
                let Some(future) = slot.as_mut() else {
                    self.state.store(DONE, Ordering::Release);
                    return;
                };

                let polled = panic::catch_unwind(AssertUnwindSafe(|| {
                    enter_task(self.clone(), || future.as_mut().poll(&mut context))
                }));

                match polled {
                    Ok(poll) => {
                        let ready = poll.is_ready();
                        if ready {
                            *slot = None;
                        }
                        ready
                    }
                    Err(payload) => {
                        // Dropping the future drops its resolver: waiters see Abandoned.
                        error!(task = self.id, panic = %panic_message(&*payload), "task panicked");
                        *slot = None;
                        true
                    }
                }
            };

            if ready {
                trace!(task = self.id, "task completed");
                self.state.store(DONE, Ordering::Release);
                return;
            }

            if self
                .state
                .compare_exchange(RUNNING, IDLE, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return;
            }

            // Woken while polling: poll again here, unless the task belongs elsewhere now.
            let resume = self.resume.lock().clone();
            if resume.is_satisfied() {
                self.state.store(RUNNING, Ordering::Release);
            } else {
                self.state.store(IDLE, Ordering::Release);
                self.schedule();
                return;
            }
        }
    }
}
