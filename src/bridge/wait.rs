//! Suspension point for deferred operations.

use super::Deferred;
use crate::error::Result;
use crate::reactor::Affinity;
use crate::task::Task;

use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

/// Future returned by [`Deferred::wait`].
///
/// The first poll attaches a continuation record carrying the requested [`Affinity`].
/// When the operation resolves, the record stores the result and wakes the flow from
/// the context it was bound to. Inside a [`Task`], the affinity also decides which thread
/// polls the flow next.
///
/// No thread is parked while the operation is pending.
pub struct Wait<T> {
    deferred: Deferred<T>,
    affinity: Affinity,
    slot: Option<Arc<Mutex<Slot<T>>>>,
}

struct Slot<T> {
    result: Option<Result<T>>,
    waker: Option<Waker>,
}

impl<T: Clone + Send + 'static> Wait<T> {
    pub(crate) fn new(deferred: Deferred<T>, affinity: Affinity) -> Self {
        Self {
            deferred,
            affinity,
            slot: None,
        }
    }

    /// Where the flow resumes once the operation settles.
    pub fn affinity(&self) -> &Affinity {
        &self.affinity
    }

    fn register(&mut self, waker: &Waker) {
        let slot = Arc::new(Mutex::new(Slot {
            result: None,
            waker: Some(waker.clone()),
        }));
        self.slot = Some(slot.clone());

        Task::resume_on(self.affinity.clone());

        self.deferred.on_complete(self.affinity.clone(), move |result| {
            let waker = {
                let mut slot = slot.lock();
                slot.result = Some(result);
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        });
    }
}

impl<T: Clone + Send + 'static> Future for Wait<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;

        if this.slot.is_none() {
            // Already settled and already where the flow wants to be: no hop needed.
            if this.affinity.is_satisfied()
                && let Some(outcome) = this.deferred.try_outcome()
            {
                return Poll::Ready(outcome.into_result());
            }

            this.register(cx.waker());

            // The continuation wakes us from the target reactor; never consume the
            // result here ahead of it.
            if !this.affinity.is_satisfied() {
                return Poll::Pending;
            }
        }

        let Some(slot) = &this.slot else {
            return Poll::Pending;
        };

        // Registration may already have delivered when the operation was settled.
        let mut slot = slot.lock();
        if let Some(result) = slot.result.take() {
            return Poll::Ready(result);
        }
        if !slot
            .waker
            .as_ref()
            .is_some_and(|waker| waker.will_wake(cx.waker()))
        {
            slot.waker = Some(cx.waker().clone());
        }

        Poll::Pending
    }
}
