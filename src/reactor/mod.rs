//! Single-threaded reactors and the affinity rules that target them.
//!
//! This module provides:
//! - [`core`]: the reactor thread, its queue, and the cloneable [`ReactorHandle`]
//! - [`affinity`]: [`Affinity`], naming where a continuation must run

pub mod affinity;
pub mod core;

pub use affinity::Affinity;
pub use self::core::{Reactor, ReactorHandle};
