//! Observer
//!
//! An observer is the tracking context handed to every memo and effect body.
//! Reading a state through an observer records a dependency from that state
//! to the running memo or effect; reading through [`Observer::untracked`]
//! records nothing.
//!
//! The observer is passed explicitly rather than kept on a thread-local
//! stack, so it is always clear which computation a read belongs to.

use std::fmt;
use std::rc::{Rc, Weak};

use crate::graph::node::{AnyNode, NodeState};

/// Tracking context for reads performed by a memo or effect.
pub struct Observer {
    node: Option<Weak<dyn AnyNode>>,
}

impl Observer {
    pub(crate) fn for_node(node: &Rc<dyn AnyNode>) -> Self {
        Self {
            node: Some(Rc::downgrade(node)),
        }
    }

    /// An observer that does not record dependencies.
    pub fn untracked() -> Self {
        Self { node: None }
    }

    /// The observing node, if it is still alive and not disposed.
    pub(crate) fn node(&self) -> Option<Rc<dyn AnyNode>> {
        self.node
            .as_ref()
            .and_then(Weak::upgrade)
            .filter(|node| node.core().state() != NodeState::Dead)
    }

    /// Whether reads through this observer are recorded as dependencies.
    pub fn is_tracking(&self) -> bool {
        self.node().is_some()
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("node", &self.node().map(|node| node.core().id()))
            .finish()
    }
}
