//! Time-bound combinators over deferred operations and futures.
//!
//! - [`timeout`] races an operation against a timer
//! - [`wrapper::Time`] measures how long a future took
//!
//! # Example: Timeout
//!
//! ```ignore
//! use completion_bridge::time::timeout;
//! use std::time::Duration;
//!
//! let bounded = timeout(&timer, Duration::from_millis(100), &operation);
//! match bounded.wait(Affinity::Indifferent).await {
//!     Err(Error::TimedOut(_)) => println!("too slow"),
//!     other => println!("{other:?}"),
//! }
//! ```
//!
//! # Example: Timing an Await
//!
//! ```ignore
//! use completion_bridge::time::wrapper::Time;
//!
//! let (result, elapsed) = Time::new(operation.wait(Affinity::Indifferent)).await;
//! println!("Elapsed: {:?}", elapsed);
//! ```

pub mod timeout;
pub mod wrapper;

pub use timeout::timeout;
pub use wrapper::Time;
