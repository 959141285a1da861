//! Elapsed-time measurement for awaits.
//!
//! [`Time`] is mostly used around [`Deferred::wait`](crate::Deferred::wait) to show how
//! long a flow stayed suspended, including any hop back to its reactor.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

/// Resolves to `(output, elapsed)`, where `elapsed` counts from [`Time::new`], not from
/// the first poll.
pub struct Time<F> {
    started: Instant,
    inner: Pin<Box<F>>,
}

impl<F: Future> Time<F> {
    pub fn new(inner: F) -> Self {
        Self {
            started: Instant::now(),
            inner: Box::pin(inner),
        }
    }

    /// Time spent so far, whether or not the inner future has finished.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl<F: Future> Future for Time<F> {
    type Output = (F::Output, Duration);

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let output = std::task::ready!(self.inner.as_mut().poll(cx));

        Poll::Ready((output, self.started.elapsed()))
    }
}
