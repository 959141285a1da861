//! Where a continuation is allowed to run.

use super::ReactorHandle;
use crate::runtime::context::current_reactor;

/// Target context of a continuation.
///
/// Every suspension point takes one explicitly; nothing is captured behind the caller's
/// back. [`Affinity::captured`] is the explicit spelling of "resume where I am now".
#[derive(Debug, Clone, Default)]
pub enum Affinity {
    /// Run on whichever thread resolves the operation. Never waits for a reactor.
    #[default]
    Indifferent,
    /// Run on this reactor's thread, once it is free to drain its queue.
    Affine(ReactorHandle),
}

impl Affinity {
    /// Affinity to the reactor owning the current thread, or indifferent off-reactor.
    pub fn captured() -> Self {
        current_reactor().map_or(Affinity::Indifferent, Affinity::Affine)
    }

    /// The target reactor, or `None` for [`Affinity::Indifferent`].
    pub fn reactor(&self) -> Option<&ReactorHandle> {
        match self {
            Affinity::Indifferent => None,
            Affinity::Affine(reactor) => Some(reactor),
        }
    }

    pub fn is_indifferent(&self) -> bool {
        matches!(self, Affinity::Indifferent)
    }

    /// `true` when a continuation with this affinity may run on the current thread.
    pub fn is_satisfied(&self) -> bool {
        match self {
            Affinity::Indifferent => true,
            Affinity::Affine(reactor) => reactor.is_current(),
        }
    }
}

impl From<ReactorHandle> for Affinity {
    fn from(reactor: ReactorHandle) -> Self {
        Affinity::Affine(reactor)
    }
}

impl From<Option<ReactorHandle>> for Affinity {
    fn from(reactor: Option<ReactorHandle>) -> Self {
        reactor.map_or(Affinity::Indifferent, Affinity::Affine)
    }
}
