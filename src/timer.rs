//! Timer subsystem: one-shot callbacks after a delay.
//!
//! The completion bridge depends on nothing but [`Timer::after`]. Two implementations
//! are provided:
//!
//! - [`ThreadTimer`] keeps a deadline heap on one background driver thread and runs each
//!   callback there when its deadline passes. No thread is used per timer.
//! - [`ManualTimer`] runs on a virtual clock that only moves when [`ManualTimer::advance`]
//!   is called, firing due callbacks on the advancing thread.
//!
//! Each registration fires at most once; there are no subscriber lists.

use crate::runtime::queue::run_contained;

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Callback invoked once when a timer elapses.
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Something that can call back after a delay.
pub trait Timer: Send + Sync {
    /// Invokes `callback` exactly once after `duration`, on a thread of the timer's choosing.
    fn after(&self, duration: Duration, callback: Callback);
}

impl<T: Timer + ?Sized> Timer for Arc<T> {
    fn after(&self, duration: Duration, callback: Callback) {
        (**self).after(duration, callback)
    }
}

/// A registered callback, ordered so the earliest deadline sits on top of a max-heap.
struct Entry<K> {
    deadline: K,
    sequence: u64,
    callback: Callback,
}

impl<K: Ord> PartialEq for Entry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: Ord> Eq for Entry<K> {}

impl<K: Ord> PartialOrd for Entry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: Ord> Ord for Entry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Deadline heap shared by both timers.
struct Schedule<K> {
    entries: BinaryHeap<Entry<K>>,
    next_sequence: u64,
}

impl<K: Ord + Copy> Schedule<K> {
    fn new() -> Self {
        Self {
            entries: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    fn register(&mut self, deadline: K, callback: Callback) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries.push(Entry {
            deadline,
            sequence,
            callback,
        });
    }

    fn next_deadline(&self) -> Option<K> {
        self.entries.peek().map(|entry| entry.deadline)
    }

    /// Removes the earliest entry if its deadline is at or before `now`.
    fn pop_expired(&mut self, now: K) -> Option<Callback> {
        if self.next_deadline()? <= now {
            self.entries.pop().map(|entry| entry.callback)
        } else {
            None
        }
    }
}

struct DriverState {
    schedule: Schedule<Instant>,
    /// Callbacks whose deadline is past what `Instant` can represent. They never fire.
    parked: Vec<Callback>,
    shutdown: bool,
}

struct TimerDriver {
    state: Mutex<DriverState>,
    changed: Condvar,
}

/// Wall-clock timer backed by a single driver thread.
///
/// Dropping the timer stops the driver; callbacks that have not fired yet are dropped
/// without running. A panicking callback is logged and does not stop the driver.
pub struct ThreadTimer {
    driver: Arc<TimerDriver>,
}

impl ThreadTimer {
    /// Starts the driver thread.
    ///
    /// # Returns
    /// The timer, or the error from spawning its thread
    pub fn new() -> io::Result<Self> {
        let driver = Arc::new(TimerDriver {
            state: Mutex::new(DriverState {
                schedule: Schedule::new(),
                parked: Vec::new(),
                shutdown: false,
            }),
            changed: Condvar::new(),
        });

        let thread_driver = driver.clone();
        thread::Builder::new()
            .name("timer".to_owned())
            .spawn(move || drive(&thread_driver))?;

        Ok(Self { driver })
    }

    /// Number of callbacks that have not fired yet.
    pub fn pending(&self) -> usize {
        let state = self.driver.state.lock();
        state.schedule.entries.len() + state.parked.len()
    }
}

impl Timer for ThreadTimer {
    fn after(&self, duration: Duration, callback: Callback) {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            debug!(?duration, "deadline out of range, callback will never fire");
            self.driver.state.lock().parked.push(callback);
            return;
        };

        self.driver
            .state
            .lock()
            .schedule
            .register(deadline, callback);
        self.driver.changed.notify_one();
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        let (dropped, parked) = {
            let mut state = self.driver.state.lock();
            state.shutdown = true;
            (
                std::mem::take(&mut state.schedule.entries),
                std::mem::take(&mut state.parked),
            )
        };
        self.driver.changed.notify_all();

        debug!(
            dropped = dropped.len() + parked.len(),
            "timer driver shutting down"
        );
    }
}

fn drive(driver: &TimerDriver) {
    let mut state = driver.state.lock();

    loop {
        if state.shutdown {
            break;
        }

        if let Some(callback) = state.schedule.pop_expired(Instant::now()) {
            trace!("timer elapsed");
            MutexGuard::unlocked(&mut state, || {
                run_contained(callback, "timer");
            });
            continue;
        }

        match state.schedule.next_deadline() {
            Some(deadline) => {
                driver.changed.wait_until(&mut state, deadline);
            }
            None => driver.changed.wait(&mut state),
        }
    }
}

/// Timer on a virtual clock, for deterministic tests and step-by-step demos.
///
/// # Example
/// ```ignore
/// let timer = ManualTimer::new();
/// let delay = completion_bridge::delay(&timer, Duration::from_secs(3));
/// timer.advance(Duration::from_secs(2));
/// assert!(delay.is_pending());
/// timer.advance(Duration::from_secs(1));
/// assert!(!delay.is_pending());
/// ```
pub struct ManualTimer {
    state: Mutex<ManualState>,
}

struct ManualState {
    now: Duration,
    schedule: Schedule<Duration>,
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualTimer {
    /// Creates a timer whose clock reads zero.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState {
                now: Duration::ZERO,
                schedule: Schedule::new(),
            }),
        }
    }

    /// Time elapsed on the virtual clock.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of callbacks that have not fired yet.
    pub fn pending(&self) -> usize {
        self.state.lock().schedule.entries.len()
    }

    /// Moves the clock forward, firing every callback that falls due, in deadline order,
    /// on the calling thread.
    ///
    /// The clock saturates at `Duration::MAX`.
    ///
    /// # Arguments
    /// * `by` - How far to move the clock
    ///
    /// # Returns
    /// How many callbacks fired
    pub fn advance(&self, by: Duration) -> usize {
        let target = {
            let mut state = self.state.lock();
            state.now = state.now.saturating_add(by);
            state.now
        };

        let mut fired = 0;
        loop {
            let callback = self.state.lock().schedule.pop_expired(target);
            match callback {
                Some(callback) => {
                    callback();
                    fired += 1;
                }
                None => break,
            }
        }

        fired
    }
}

impl Timer for ManualTimer {
    fn after(&self, duration: Duration, callback: Callback) {
        let mut state = self.state.lock();
        let deadline = state.now.saturating_add(duration);
        state.schedule.register(deadline, callback);
    }
}
