//! Multi-step workflows that check for cancellation between their steps.
//!
//! A [`Workflow`] collects the parts produced by several sub-operations, some of them
//! started concurrently. Before and after each step the flow calls
//! [`checkpoint`](Workflow::checkpoint). Once cancellation is observed, either there or
//! through a cancelled sub-operation, the flow fails with [`Error::Incomplete`] and the
//! parts gathered so far are dropped with the workflow. Nothing already done is undone.
//!
//! # Example
//! ```ignore
//! let toast = delay_until_cancelled(&timer, Duration::from_secs(5), &token);
//! let mut workflow = Workflow::new(token);
//! workflow.checkpoint()?;
//! workflow.join(&toast, Affinity::Indifferent).await?;
//! workflow.add(Part::Toast);
//! let parts = workflow.finish()?;
//! ```

use crate::bridge::Deferred;
use crate::cancel::CancellationToken;
use crate::error::{Error, Result};
use crate::reactor::Affinity;

use tracing::debug;

/// Aggregate under construction, guarded by a cancellation token.
#[derive(Debug)]
pub struct Workflow<P> {
    token: CancellationToken,
    parts: Vec<P>,
}

impl<P> Workflow<P> {
    /// Starts an empty aggregate observing `token`.
    ///
    /// # Arguments
    /// * `token` - Checked at every [`checkpoint`](Self::checkpoint)
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            parts: Vec::new(),
        }
    }

    /// The token this workflow observes.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fails with [`Error::Incomplete`] if cancellation has been requested.
    pub fn checkpoint(&self) -> Result<()> {
        if self.token.is_cancelled() {
            debug!(parts = self.parts.len(), "workflow cancelled at a checkpoint");
            return Err(Error::Incomplete);
        }

        Ok(())
    }

    /// Awaits a sub-operation. Its cancellation is reported as [`Error::Incomplete`];
    /// other errors pass through unchanged.
    pub async fn join<T>(&self, operation: &Deferred<T>, affinity: Affinity) -> Result<T>
    where
        T: Clone + Send + 'static,
    {
        operation.wait(affinity).await.map_err(|error| {
            if error.is_cancellation() {
                debug!(parts = self.parts.len(), "workflow step cancelled");
                Error::Incomplete
            } else {
                error
            }
        })
    }

    /// Appends one finished part.
    pub fn add(&mut self, part: P) {
        self.parts.push(part);
    }

    pub fn extend<I: IntoIterator<Item = P>>(&mut self, parts: I) {
        self.parts.extend(parts);
    }

    /// Parts collected so far, in insertion order.
    pub fn parts(&self) -> &[P] {
        &self.parts
    }

    /// Hands out the aggregate after a last checkpoint.
    pub fn finish(self) -> Result<Vec<P>> {
        self.checkpoint()?;
        Ok(self.parts)
    }
}
