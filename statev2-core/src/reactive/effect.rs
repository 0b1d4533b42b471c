//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its body immediately to establish
//!    initial dependencies.
//!
//! 2. When a dependency changes, the effect is queued and re-run before the
//!    write that caused it returns.
//!
//! 3. Each run re-records dependencies: states read last time but not this
//!    time stop triggering the effect.
//!
//! # Lifetime
//!
//! Nothing in the graph keeps an effect alive. Its dependencies only hold
//! weak references to it, so an effect lives exactly as long as its
//! [`Effect`] handle (or the [`Owner`] holding that handle). Dropping the
//! last handle stops the effect; [`Effect::dispose`] stops it eagerly and
//! unlinks it from its dependencies right away.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::observer::Observer;
use super::runtime::Runtime;
use crate::graph::node::{cleanup, update, Node, NodeKind, NodeState};

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust
/// use statev2_core::reactive::{Runtime, State};
///
/// let runtime = Runtime::new();
/// let count = runtime.mutable_state(0);
///
/// let count_in = count.clone();
/// let effect = runtime.effect(move |obs| {
///     println!("Count is: {}", count_in.get(obs));
/// });
///
/// count.set(5);  // Prints: "Count is: 5"
/// effect.dispose();
/// ```
#[must_use = "an effect is collected as soon as its handle is dropped"]
pub struct Effect {
    node: Rc<Node<()>>,
}

impl Effect {
    /// Create a new effect with the given body.
    ///
    /// The body runs immediately to establish initial dependencies.
    pub fn new<F>(runtime: &Runtime, mut body: F) -> Self
    where
        F: FnMut(&Observer) + 'static,
    {
        let node: Rc<Node<()>> = Node::derived(
            runtime.scheduler().clone(),
            NodeKind::Effect,
            Box::new(move |observer: &Observer| body(observer)),
        );
        update(&node.as_dyn());
        Self { node }
    }

    /// A weak disposer for this effect.
    pub fn disposer(&self) -> Disposer {
        Disposer {
            node: Rc::downgrade(&self.node),
        }
    }

    /// Stop the effect and unlink it from its dependencies.
    ///
    /// May be called from inside the effect's own body; the current run is
    /// then discarded.
    pub fn dispose(&self) {
        cleanup(&self.node.as_dyn());
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.node.core().state() == NodeState::Dead
    }

    /// Number of states and memos read during the last run.
    pub fn dependency_count(&self) -> usize {
        self.node.core().dependency_count()
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            node: Rc::clone(&self.node),
        }
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.node.core().id())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes an effect without keeping it alive.
#[derive(Clone)]
pub struct Disposer {
    node: Weak<Node<()>>,
}

impl Disposer {
    /// Dispose the effect if it is still alive.
    pub fn dispose(&self) {
        if let Some(node) = self.node.upgrade() {
            cleanup(&node.as_dyn());
        }
    }

    /// True once the effect was disposed or collected.
    pub fn is_disposed(&self) -> bool {
        self.node
            .upgrade()
            .map_or(true, |node| node.core().state() == NodeState::Dead)
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Keeps effects alive for as long as the owner itself lives.
///
/// A UI component typically holds one owner; every effect it registers
/// stops once the component is dropped.
#[derive(Default)]
pub struct Owner {
    effects: RefCell<Vec<Effect>>,
}

impl Owner {
    /// Create an owner holding nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `effect` alive until the owner is dropped or cleared.
    pub fn hold(&self, effect: Effect) {
        self.effects.borrow_mut().push(effect);
    }

    /// Number of effects held.
    pub fn len(&self) -> usize {
        self.effects.borrow().len()
    }

    /// Whether the owner holds no effects.
    pub fn is_empty(&self) -> bool {
        self.effects.borrow().is_empty()
    }

    /// Dispose and release every held effect.
    pub fn dispose_all(&self) {
        let effects = std::mem::take(&mut *self.effects.borrow_mut());
        for effect in &effects {
            effect.dispose();
        }
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owner").field("effects", &self.len()).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
