//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Memos Work
//!
//! 1. Creating a memo runs nothing. The first read computes and caches.
//!
//! 2. When a dependency changes, the memo is marked Dirty (direct) or
//!    ToBeChecked (further upstream).
//!
//! 3. On next read, a ToBeChecked memo first brings its dependencies up to
//!    date. It only recomputes if one of them produced a different value.
//!
//! 4. If the recomputed value equals the cached one, the memo's own
//!    dependents are left alone.
//!
//! # Why This Matters
//!
//! In a diamond (`a` and `b` both derive from `s`, `c` derives from both),
//! writing `s` recomputes `a`, `b` and `c` exactly once each, and `c` never
//! observes a new `a` next to an old `b`.
//!
//! A memo nobody reads stays stale after a write and recomputes on its next
//! read only.

use std::fmt;
use std::rc::Rc;

use super::observer::Observer;
use super::runtime::Runtime;
use super::state::State;
use crate::graph::node::{track, update, Node, NodeKind, NodeState};

/// A cached derived value that recomputes only when dependencies change.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. `PartialEq` decides whether a
///   recomputation is a change worth propagating.
pub struct Memo<T> {
    node: Rc<Node<T>>,
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new memo with the given computation function.
    ///
    /// The computation is not run immediately. It runs on first read.
    pub fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: FnMut(&Observer) -> T + 'static,
    {
        Self {
            node: Node::derived(
                runtime.scheduler().clone(),
                NodeKind::Memo,
                Box::new(compute),
            ),
        }
    }

    /// Get the current validation state.
    pub fn state(&self) -> NodeState {
        self.node.core().state()
    }

    /// Check if the memo has a cached value.
    pub fn has_value(&self) -> bool {
        self.node.has_value()
    }

    /// Number of states and memos read during the last computation.
    pub fn dependency_count(&self) -> usize {
        self.node.core().dependency_count()
    }

    /// Number of live memos and effects reading this memo.
    pub fn dependent_count(&self) -> usize {
        self.node.core().live_dependents().len()
    }
}

impl<T> State<T> for Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self, observer: &Observer) -> T {
        track(&self.node.as_dyn(), observer);
        self.get_untracked()
    }

    fn get_untracked(&self) -> T {
        update(&self.node.as_dyn());
        self.node
            .cloned_value()
            .expect("clean memo should have a value")
    }

    fn runtime(&self) -> Runtime {
        Runtime::from_scheduler(self.node.core().scheduler().clone())
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.node.core().id())
            .field("state", &self.state())
            .field("has_value", &self.has_value())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
