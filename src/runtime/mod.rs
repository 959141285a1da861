//! Runtime subsystem modules.

pub(crate) mod context;
mod core;
pub(crate) mod queue;
pub(crate) mod waker;

pub use context::{current_context_id, current_reactor};
pub use self::core::Runtime;
