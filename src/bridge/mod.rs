//! Completion bridge: one-shot, externally signaled units of work.
//!
//! Producer code that is driven by a timer or another non-blocking callback publishes its
//! result through a [`Resolver`]; consumer code observes it through a [`Deferred`], either
//! by awaiting [`Deferred::wait`] or, at its own risk, by calling [`Deferred::block`].
//!
//! - [`deferred`]: the shared state cell, outcomes and continuation dispatch
//! - [`resolver`]: the producer capability
//! - [`wait`]: the suspending consumer future
//! - [`strategy`]: timer-backed delays built the naive and the correct way

pub mod deferred;
pub mod resolver;
pub mod strategy;
pub mod wait;

pub use deferred::{Deferred, Outcome, State};
pub use resolver::Resolver;
pub use strategy::{delay, delay_naive, delay_until_cancelled};
pub use wait::Wait;

/// Creates an unresolved operation and the private capability that resolves it.
pub fn create<T: Clone + Send + 'static>() -> (Deferred<T>, Resolver<T>) {
    Deferred::pair()
}
