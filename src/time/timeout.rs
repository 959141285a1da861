//! Timeout for deferred operations.
//!
//! [`timeout`] returns a new operation that mirrors the original one, unless the timer
//! fires first, in which case it faults with [`Error::TimedOut`]. The original operation
//! is not affected either way.

use crate::bridge::{Deferred, create};
use crate::error::Error;
use crate::reactor::Affinity;
use crate::timer::Timer;

use std::time::Duration;
use tracing::debug;

/// Bounds `operation` by `duration`.
///
/// # Example
/// ```ignore
/// let bounded = timeout(&timer, Duration::from_millis(20), &slow);
/// assert!(matches!(bounded.block(), Err(Error::TimedOut(_))));
/// ```
pub fn timeout<T, R>(timer: &R, duration: Duration, operation: &Deferred<T>) -> Deferred<T>
where
    T: Clone + Send + 'static,
    R: Timer + ?Sized,
{
    let (bounded, resolver) = create();

    let forward = resolver.clone();
    operation.on_complete(Affinity::Indifferent, move |result| {
        forward.try_complete(result);
    });

    timer.after(
        duration,
        Box::new(move || {
            if resolver.try_fail(Error::TimedOut(duration)) {
                debug!(?duration, "operation timed out");
            }
        }),
    );

    bounded
}
