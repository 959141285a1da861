//! Single-threaded reactor: one dedicated thread draining one queue of continuations.

use crate::bridge::{Deferred, create};
use crate::builder::ReactorBuilder;
use crate::error::{Error, Result};
use crate::runtime::context::enter_reactor;
use crate::runtime::queue::{JobQueue, run_contained};
use crate::task::Task;

use std::fmt;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use tracing::{debug, warn};

static NEXT_REACTOR_ID: AtomicUsize = AtomicUsize::new(1);

struct ReactorShared {
    id: usize,
    name: String,
    queue: JobQueue,
    blocked: AtomicUsize,
}

/// A logical single-threaded affinity domain, such as a UI event loop.
///
/// Owns a dedicated thread that runs queued continuations one at a time, in the order
/// they were posted. While that thread is synchronously blocked, nothing else queued on
/// the reactor can run.
///
/// Dropping the reactor closes its queue: jobs still waiting are dropped, and continuations
/// among them report [`Error::Closed`]. The thread is not joined, since a reactor
/// stuck in a deadlock would never finish.
///
/// # Example
/// ```ignore
/// let reactor = Reactor::builder().name("ui").build()?;
/// let answer = reactor.handle().invoke(|| 42).block()?;
/// ```
pub struct Reactor {
    handle: ReactorHandle,
}

impl Reactor {
    /// Starts a reactor thread with the given name.
    ///
    /// # Arguments
    /// * `name` - Name of the reactor and of its thread
    ///
    /// # Returns
    /// The running reactor, or the error from spawning its thread
    pub fn new(name: impl Into<String>) -> io::Result<Self> {
        let shared = Arc::new(ReactorShared {
            id: NEXT_REACTOR_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            queue: JobQueue::new(),
            blocked: AtomicUsize::new(0),
        });
        let handle = ReactorHandle { shared };

        let thread_handle = handle.clone();
        thread::Builder::new()
            .name(handle.name().to_owned())
            .spawn(move || run(thread_handle))?;

        debug!(reactor = %handle.name(), id = handle.id(), "reactor started");

        Ok(Self { handle })
    }

    /// Returns a [`ReactorBuilder`] for configuring a reactor.
    pub fn builder() -> ReactorBuilder {
        ReactorBuilder::new()
    }

    /// Returns a cloneable handle for posting work and naming this reactor as an affinity.
    pub fn handle(&self) -> ReactorHandle {
        self.handle.clone()
    }
}

impl Drop for Reactor {
    fn drop(&mut self) {
        let pending = self.handle.shared.queue.close();
        debug!(
            reactor = %self.handle.name(),
            dropped = pending.len(),
            "reactor shutting down"
        );
        drop(pending);
    }
}

/// Closes the reactor's queue when its thread exits, however it exits.
struct CloseOnExit(ReactorHandle);

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        let pending = self.0.shared.queue.close();
        debug!(
            reactor = %self.0.name(),
            dropped = pending.len(),
            "reactor thread exited"
        );
    }
}

fn run(handle: ReactorHandle) {
    let exit = CloseOnExit(handle.clone());

    enter_reactor(handle, || {
        while let Some(job) = exit.0.shared.queue.pop_blocking() {
            run_contained(job, exit.0.name());
        }
    });
}

/// Cloneable reference to a [`Reactor`], used to post work and to name it as an affinity.
#[derive(Clone)]
pub struct ReactorHandle {
    shared: Arc<ReactorShared>,
}

impl ReactorHandle {
    /// Process-unique number of the reactor, stable for its lifetime.
    pub fn id(&self) -> usize {
        self.shared.id
    }

    /// Name given at construction; also the name of the reactor's thread.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// `true` when called from this reactor's own thread.
    pub fn is_current(&self) -> bool {
        crate::runtime::context::current_reactor().is_some_and(|current| current == *self)
    }

    /// `true` while the reactor's thread sits inside a synchronous block.
    pub fn is_blocked(&self) -> bool {
        self.shared.blocked.load(Ordering::Acquire) > 0
    }

    /// `true` once the reactor was dropped and no longer accepts work.
    pub fn is_closed(&self) -> bool {
        self.shared.queue.is_closed()
    }

    /// Number of continuations waiting for the reactor's thread.
    pub fn pending_jobs(&self) -> usize {
        self.shared.queue.len()
    }

    /// Queues `job` to run on the reactor's thread after everything posted before it.
    ///
    /// A job posted while the thread is blocked is accepted but cannot run until the block
    /// ends; this is logged because it is the shape of every reactor deadlock. A job that
    /// panics is logged and the reactor carries on with the next one.
    ///
    /// # Arguments
    /// * `job` - Closure to run on the reactor's thread
    ///
    /// # Returns
    /// `Err(Error::Closed)` when the reactor has shut down; the job is dropped unrun
    pub fn post<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_blocked() {
            warn!(
                reactor = %self.name(),
                "continuation queued on a reactor whose thread is blocked; it cannot run until the block ends"
            );
        }

        self.shared.queue.push(Box::new(job)).map_err(|rejected| {
            drop(rejected);
            Error::Closed
        })
    }

    /// Runs `function` on the reactor and exposes its return value as a deferred operation.
    ///
    /// The operation faults with [`Error::Closed`] when the reactor has already shut
    /// down, and with [`Error::Abandoned`] if `function` panics or is dropped unrun.
    pub fn invoke<F, R>(&self, function: F) -> Deferred<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Clone + Send + 'static,
    {
        let (deferred, resolver) = create();
        let fallback = resolver.clone();

        if let Err(error) = self.post(move || {
            let _ = resolver.resolve(function());
        }) {
            let _ = fallback.fail(error);
        }

        deferred
    }

    /// Starts an async flow whose first poll happens on the reactor.
    ///
    /// The flow keeps running on the reactor after every await point that asks for this
    /// reactor's affinity; other await points may move it elsewhere.
    pub fn spawn<F, T>(&self, future: F) -> Deferred<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Clone + Send + 'static,
    {
        Task::spawn_on(self.clone(), future)
    }

    /// Resolves once every job posted before this call has run.
    pub fn flush(&self) -> Deferred<()> {
        self.invoke(|| ())
    }

    pub(crate) fn begin_block(&self) {
        self.shared.blocked.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn end_block(&self) {
        self.shared.blocked.fetch_sub(1, Ordering::AcqRel);
    }
}

impl PartialEq for ReactorHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for ReactorHandle {}

impl fmt::Debug for ReactorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactorHandle")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}
