//! Progress reporting across execution contexts.
//!
//! A producer calls [`Progress::report`] from wherever it runs; the handler runs where
//! the progress object was told to deliver:
//!
//! - on a reactor, in report order, one at a time
//! - inline on the reporting thread
//! - on a worker pool, one job per report, with no ordering guarantee

use crate::pool::WorkerPool;
use crate::reactor::{Affinity, ReactorHandle};

use std::sync::Arc;
use tracing::warn;

type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

#[derive(Clone)]
enum Delivery {
    Inline,
    Reactor(ReactorHandle),
    Pool(WorkerPool),
}

/// Sink for progress values.
pub struct Progress<T> {
    delivery: Delivery,
    handler: Handler<T>,
}

impl<T> Clone for Progress<T> {
    fn clone(&self) -> Self {
        Self {
            delivery: self.delivery.clone(),
            handler: self.handler.clone(),
        }
    }
}

impl<T: Send + 'static> Progress<T> {
    /// Delivers on the affine reactor, or inline for [`Affinity::Indifferent`].
    pub fn new<F>(affinity: Affinity, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        let delivery = match affinity {
            Affinity::Indifferent => Delivery::Inline,
            Affinity::Affine(reactor) => Delivery::Reactor(reactor),
        };

        Self {
            delivery,
            handler: Arc::new(handler),
        }
    }

    /// Delivers every report as its own job on `pool`.
    ///
    /// Reports race each other and may reach the handler out of order.
    pub fn detached<F>(pool: WorkerPool, handler: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        Self {
            delivery: Delivery::Pool(pool),
            handler: Arc::new(handler),
        }
    }

    /// Hands `value` to the handler in the configured delivery context.
    ///
    /// Never blocks the reporting thread. A report to a reactor that has shut down is
    /// dropped.
    ///
    /// # Arguments
    /// * `value` - The progress value to deliver
    pub fn report(&self, value: T) {
        let handler = self.handler.clone();

        let delivered = match &self.delivery {
            Delivery::Inline => {
                handler(value);
                Ok(())
            }
            Delivery::Reactor(reactor) => reactor.post(move || handler(value)),
            Delivery::Pool(pool) => pool.execute(move || handler(value)),
        };

        if let Err(error) = delivered {
            warn!(%error, "progress report dropped");
        }
    }
}
