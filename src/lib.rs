//! Completion bridge and reactor-affinity continuations.
//!
//! This crate turns callback-driven, timer-backed work into awaitable one-shot operations
//! without spending a thread on the wait, and models exactly where each continuation of
//! such an operation runs.
//!
//! # Architecture
//!
//! - **Deferred / Resolver**: one-shot operation and its private producer capability
//! - **Wait**: the suspending consumer; `Deferred::block` is the blocking, hazardous one
//! - **Reactor**: single-threaded affinity domain draining one queue of continuations
//! - **Affinity**: explicit "resume anywhere" or "resume on this reactor" marker
//! - **Task**: async flow polled by whichever context its last await point named
//! - **WorkerPool**: affinity-free background threads
//! - **Timer**: one-shot callbacks, on a driver thread or a virtual clock
//! - **CancellationToken / Workflow**: cooperative cancellation between steps
//! - **Progress / Surface**: delivering reports and UI state across contexts
//! - **RuntimeBuilder**: fluent configuration of a reactor + pool + timer bundle
//!
//! # Deadlocks
//!
//! Blocking a reactor thread on an operation whose resolution needs a continuation
//! affine to that same reactor hangs forever. This is reproduced on purpose, logged, and
//! never recovered.

pub mod bridge;
mod builder;
pub mod cancel;
pub mod error;
pub mod pool;
pub mod progress;
pub mod reactor;
pub mod runtime;
pub mod surface;
pub mod task;
pub mod time;
pub mod timer;
pub mod workflow;

pub use bridge::{Deferred, Outcome, Resolver, State, Wait, create, delay, delay_naive};
pub use builder::{ReactorBuilder, RuntimeBuilder};
pub use cancel::{CancellationToken, Registration};
pub use error::{Error, Fault, Result};
pub use pool::WorkerPool;
pub use progress::Progress;
pub use reactor::{Affinity, Reactor, ReactorHandle};
pub use runtime::{Runtime, current_context_id};
pub use surface::Surface;
pub use task::Task;
pub use timer::{ManualTimer, ThreadTimer, Timer};
pub use workflow::Workflow;
