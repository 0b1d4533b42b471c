//! States
//!
//! [`State`] is the read side shared by every reactive value: a tracked
//! [`get`](State::get) through an [`Observer`] and an untracked
//! [`get_untracked`](State::get_untracked). [`MutableState`] is the only
//! kind that can be written.
//!
//! # Writes
//!
//! `set` compares the new value with the current one using `PartialEq`.
//! Equal values are dropped without touching the graph. Otherwise the value
//! is stored, dependents are marked, and every affected effect has re-run
//! exactly once by the time `set` returns.

use std::fmt;
use std::rc::Rc;

use super::observer::Observer;
use super::runtime::Runtime;
use crate::graph::node::{propagate_change, track, Node};

/// A readable reactive value.
pub trait State<T> {
    /// Read the current value and record a dependency for `observer`.
    fn get(&self, observer: &Observer) -> T;

    /// Read the current value without recording a dependency.
    fn get_untracked(&self) -> T;

    /// The runtime that owns this state.
    fn runtime(&self) -> Runtime;
}

/// A reactive value that is set from outside the graph.
///
/// # Example
///
/// ```rust
/// use statev2_core::reactive::{Runtime, State};
///
/// let runtime = Runtime::new();
/// let count = runtime.mutable_state(0);
///
/// count.set(5);
/// count.update(|v| v + 1);
/// assert_eq!(count.get_untracked(), 6);
/// ```
pub struct MutableState<T> {
    node: Rc<Node<T>>,
}

impl<T> MutableState<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new mutable state with the given initial value.
    pub fn new(runtime: &Runtime, value: T) -> Self {
        Self {
            node: Node::mutable(runtime.scheduler().clone(), value),
        }
    }

    /// Set a new value and run every effect affected by the change.
    ///
    /// Does nothing if `value` equals the current value.
    pub fn set(&self, value: T) {
        if !self.node.replace(value) {
            return;
        }
        propagate_change(&self.node.as_dyn());
    }

    /// Set the value computed from the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = self.with(f);
        self.set(new_value);
    }

    /// Borrow the current value without cloning or tracking it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.node
            .with_value(|value| f(value.expect("mutable state always holds a value")))
    }

    /// Number of live memos and effects reading this state.
    pub fn dependent_count(&self) -> usize {
        self.node.core().live_dependents().len()
    }

    /// Number of dependent entries, including not-yet-purged dead ones.
    pub fn raw_dependent_count(&self) -> usize {
        self.node.core().raw_dependent_count()
    }
}

impl<T> State<T> for MutableState<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self, observer: &Observer) -> T {
        track(&self.node.as_dyn(), observer);
        self.get_untracked()
    }

    fn get_untracked(&self) -> T {
        self.with(T::clone)
    }

    fn runtime(&self) -> Runtime {
        Runtime::from_scheduler(self.node.core().scheduler().clone())
    }
}

impl<T> Clone for MutableState<T> {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl<T> fmt::Debug for MutableState<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableState")
            .field("id", &self.node.core().id())
            .field("value", &self.get_untracked())
            .field("dependent_count", &self.dependent_count())
            .finish()
    }
}
