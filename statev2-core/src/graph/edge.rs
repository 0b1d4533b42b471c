//! Dependency Edges
//!
//! An edge links a dependency to a dependent. The same `Rc<Edge>` is shared
//! by both ends: the dependent holds it strongly in its dependency map, the
//! dependency holds only a `Weak` in its dependents list. A dependent that is
//! no longer reachable therefore takes its edges with it, and the dependency
//! is left with dead `Weak` entries that get purged lazily.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use super::node::AnyNode;

pub(crate) struct Edge {
    dependency: Rc<dyn AnyNode>,
    dependent: Weak<dyn AnyNode>,

    /// Treat the edge as absent without unlinking it. Set on every
    /// dependency before a recompute; cleared when the dependency is read again.
    suspended: Cell<bool>,

    /// Set once the edge has been unlinked from the dependency explicitly.
    detached: Cell<bool>,
}

impl Edge {
    pub(crate) fn new(dependency: Rc<dyn AnyNode>, dependent: &Rc<dyn AnyNode>) -> Rc<Self> {
        Rc::new(Self {
            dependency,
            dependent: Rc::downgrade(dependent),
            suspended: Cell::new(false),
            detached: Cell::new(false),
        })
    }

    pub(crate) fn dependency(&self) -> &Rc<dyn AnyNode> {
        &self.dependency
    }

    pub(crate) fn dependent(&self) -> Option<Rc<dyn AnyNode>> {
        self.dependent.upgrade()
    }

    pub(crate) fn suspend(&self) {
        self.suspended.set(true);
    }

    pub(crate) fn resume(&self) {
        self.suspended.set(false);
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended.get()
    }

    /// Remove this edge from the dependency's dependents list.
    pub(crate) fn detach(&self) {
        if self.detached.replace(true) {
            return;
        }
        self.dependency.core().remove_dependent(self as *const Edge);
    }
}

impl Drop for Edge {
    fn drop(&mut self) {
        // Dropped with its dependent: the dependency still lists a dead Weak.
        if !self.detached.get() {
            let core = self.dependency.core();
            core.scheduler().note_stale(Rc::downgrade(&self.dependency));
        }
    }
}
