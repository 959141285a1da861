//! Turning a callback-based timer into an awaitable operation.
//!
//! Two strategies produce observationally identical [`Deferred`]s:
//!
//! - [`delay_naive`] borrows a pool worker and spins it until the timer callback flips a
//!   shared flag. The worker is occupied for the full duration.
//! - [`delay`] hands the resolver straight to the timer callback. Nothing is occupied
//!   while the delay is pending; the timer's own thread resolves the operation.

use super::{Deferred, create};
use crate::cancel::CancellationToken;
use crate::pool::WorkerPool;
use crate::timer::Timer;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Completes after `duration` without consuming any thread while pending.
pub fn delay<T: Timer + ?Sized>(timer: &T, duration: Duration) -> Deferred<()> {
    let (deferred, resolver) = create();

    timer.after(
        duration,
        Box::new(move || {
            trace!(?duration, "delay elapsed");
            let _ = resolver.resolve(());
        }),
    );

    deferred
}

/// Completes after `duration` by spin-waiting on a worker of `pool`.
///
/// Correct, but the worker is unavailable to anything else until the timer fires.
pub fn delay_naive<T: Timer + ?Sized>(
    timer: &T,
    pool: &WorkerPool,
    duration: Duration,
) -> Deferred<()> {
    let elapsed = Arc::new(AtomicBool::new(false));
    let flag = elapsed.clone();

    timer.after(
        duration,
        Box::new(move || {
            flag.store(true, Ordering::Release);
        }),
    );

    pool.run(move || {
        let started = Instant::now();
        debug!(?duration, "worker spinning until the timer fires");

        while !elapsed.load(Ordering::Acquire) {
            std::hint::spin_loop();
            thread::yield_now();
        }

        debug!(spun = ?started.elapsed(), "worker released");
    })
}

/// Completes after `duration`, or is cancelled as soon as `token` is.
///
/// The token only holds a weak handle on the operation, and the registration is
/// withdrawn when the delay elapses. If the timer drops the callback unfired, the
/// operation faults with [`Error::Abandoned`](crate::Error::Abandoned).
pub fn delay_until_cancelled<T: Timer + ?Sized>(
    timer: &T,
    duration: Duration,
    token: &CancellationToken,
) -> Deferred<()> {
    let (deferred, resolver) = create();

    let canceller = resolver.downgrade();
    let registration = token.on_cancel(move || {
        if canceller.try_cancel() {
            debug!("delay cancelled before it elapsed");
        }
    });

    timer.after(
        duration,
        Box::new(move || {
            resolver.try_resolve(());
            registration.unregister();
        }),
    );

    deferred
}
