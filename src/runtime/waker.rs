//! Waker implementation for task wake-up notifications.
//!
//! Waking a task does not push it onto a fixed queue: the task is scheduled from the
//! waking thread, which either polls it inline or forwards the poll to the reactor the
//! task's last await point asked for. See [`Task::schedule`].

use crate::task::Task;

use std::sync::Arc;
use std::task::{Wake, Waker};

/// Waker that reschedules its task when notified.
pub(crate) struct TaskWaker {
    task: Arc<Task>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.task.clone().schedule();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.task.clone().schedule();
    }
}

/// Creates a [`Waker`] that reschedules `task`.
pub(crate) fn make_waker(task: Arc<Task>) -> Waker {
    Waker::from(Arc::new(TaskWaker { task }))
}
