//! Thread-local execution context.
//!
//! Tracks which reactor (if any) owns the current thread and which task is being polled
//! on it. Reactors enter their context once for the lifetime of their thread; tasks enter
//! theirs around every poll. Both are restored on exit so nested entries compose.
//!
//! Blocking is tracked here as well: [`enter_blocking`] marks the current reactor as
//! blocked for as long as the returned guard lives, which lets the reactor warn about
//! continuations that are queued behind a synchronous wait.

use crate::reactor::ReactorHandle;
use crate::task::Task;

use std::cell::RefCell;
use std::sync::Arc;
use std::thread;
use tracing::warn;

thread_local! {
    /// Reactor whose dedicated thread is the current thread.
    pub(crate) static CURRENT_REACTOR: RefCell<Option<ReactorHandle>> = const { RefCell::new(None) };

    /// Task currently being polled on this thread.
    pub(crate) static CURRENT_TASK: RefCell<Option<Arc<Task>>> = const { RefCell::new(None) };
}

/// Puts the previous thread-local value back when dropped, including during unwinding.
struct Restore<T: 'static> {
    key: &'static std::thread::LocalKey<RefCell<Option<T>>>,
    previous: Option<T>,
}

impl<T: 'static> Drop for Restore<T> {
    fn drop(&mut self) {
        let previous = self.previous.take();
        self.key.with(|current| *current.borrow_mut() = previous);
    }
}

/// Runs `function` with `reactor` installed as the current reactor of this thread.
///
/// # Arguments
/// * `reactor` - Reactor that owns the calling thread for the duration of `function`
/// * `function` - Body to run, typically the reactor's drain loop
///
/// # Returns
/// Whatever `function` returns. The previous reactor is restored even if it panics.
pub(crate) fn enter_reactor<F, R>(reactor: ReactorHandle, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_REACTOR.with(|current| current.borrow_mut().replace(reactor));
    let _restore = Restore {
        key: &CURRENT_REACTOR,
        previous,
    };

    function()
}

/// Runs `function` with `task` installed as the task being polled.
///
/// Await points reached inside `function` record their affinity on `task`.
pub(crate) fn enter_task<F, R>(task: Arc<Task>, function: F) -> R
where
    F: FnOnce() -> R,
{
    let previous = CURRENT_TASK.with(|current| current.borrow_mut().replace(task));
    let _restore = Restore {
        key: &CURRENT_TASK,
        previous,
    };

    function()
}

/// Returns the reactor that owns the current thread.
///
/// # Returns
/// `Some(handle)` on a reactor's dedicated thread, `None` on any other thread
pub fn current_reactor() -> Option<ReactorHandle> {
    CURRENT_REACTOR.with(|current| current.borrow().clone())
}

pub(crate) fn current_task() -> Option<Arc<Task>> {
    CURRENT_TASK.with(|current| current.borrow().clone())
}

/// Describes where the caller is running: `reactor:<name>#<id>` on a reactor thread,
/// `thread:<id>` anywhere else.
pub fn current_context_id() -> String {
    match current_reactor() {
        Some(reactor) => format!("reactor:{}#{}", reactor.name(), reactor.id()),
        None => format!("thread:{:?}", thread::current().id()),
    }
}

/// Marks the current reactor as blocked while alive.
///
/// Created by [`enter_blocking`]; off a reactor thread it does nothing.
pub(crate) struct BlockingGuard {
    reactor: Option<ReactorHandle>,
}

pub(crate) fn enter_blocking() -> BlockingGuard {
    let reactor = current_reactor();

    if let Some(reactor) = &reactor {
        warn!(
            reactor = %reactor.name(),
            "blocking a reactor thread; continuations affine to it cannot run until this returns"
        );
        reactor.begin_block();
    }

    BlockingGuard { reactor }
}

impl Drop for BlockingGuard {
    fn drop(&mut self) {
        if let Some(reactor) = &self.reactor {
            reactor.end_block();
        }
    }
}
