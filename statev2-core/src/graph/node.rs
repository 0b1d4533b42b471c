//! Graph Nodes
//!
//! This module defines the nodes of the dependency graph and the
//! push-then-pull algorithm that keeps them consistent.
//!
//! # State Machine
//!
//! Every node is in one of four states, ordered
//! `Clean < ToBeChecked < Dirty < Dead`:
//!
//! - **Clean**: the cached value is current.
//! - **ToBeChecked**: something upstream changed; a dependency may or may not
//!   produce a different value. Resolved by pulling the dependencies.
//! - **Dirty**: a direct dependency produced a different value. Recompute.
//! - **Dead**: a disposed effect. Never scheduled or recomputed again.
//!
//! Marking only ever raises the state (see [`mark`]); [`update`] brings a
//! node back to Clean. A mutable write marks its direct dependents Dirty and
//! everything further downstream ToBeChecked, then the pull phase recomputes
//! only the nodes whose inputs actually produced a different value.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use super::edge::Edge;
use super::scheduler::UpdateScheduler;
use crate::reactive::Observer;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A mutable source. Set externally; has no computation and no dependencies.
    Mutable,

    /// A lazily derived value, cached by equality.
    Memo,

    /// An eagerly re-run side effect. Never has dependents.
    Effect,
}

/// Validation state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    /// The cached value is up-to-date.
    Clean,

    /// Something upstream changed; dependencies must be checked first.
    ToBeChecked,

    /// A direct dependency changed value; the node must recompute.
    Dirty,

    /// The node was disposed and never runs again.
    Dead,
}

/// The type-erased view of a node used by edges and the scheduler.
pub(crate) trait AnyNode {
    fn core(&self) -> &NodeCore;

    /// Run the computation and store its result.
    ///
    /// Returns `true` if the stored value changed.
    fn recompute(&self, this: &Rc<dyn AnyNode>) -> bool;

    /// Drop the computation and cached value of a dead node.
    fn release(&self);
}

/// Bookkeeping shared by every node regardless of its value type.
pub(crate) struct NodeCore {
    id: NodeId,
    kind: NodeKind,
    state: Cell<NodeState>,

    /// Edges where this node is the dependent, in first-read order.
    dependencies: RefCell<IndexMap<NodeId, Rc<Edge>>>,

    /// Edges where this node is the dependency. Weak: the dependent owns them.
    dependents: RefCell<SmallVec<[Weak<Edge>; 4]>>,

    /// Set when an update unwound; the next pull recomputes regardless.
    recompute_pending: Cell<bool>,

    scheduler: Rc<UpdateScheduler>,
}

impl NodeCore {
    fn new(kind: NodeKind, state: NodeState, scheduler: Rc<UpdateScheduler>) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            state: Cell::new(state),
            dependencies: RefCell::new(IndexMap::new()),
            dependents: RefCell::new(SmallVec::new()),
            recompute_pending: Cell::new(false),
            scheduler,
        }
    }

    pub(crate) fn id(&self) -> NodeId {
        self.id
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn state(&self) -> NodeState {
        self.state.get()
    }

    pub(crate) fn scheduler(&self) -> &Rc<UpdateScheduler> {
        &self.scheduler
    }

    pub(crate) fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }

    /// Number of dependent entries, including ones whose dependent is gone
    /// but which have not been purged yet.
    pub(crate) fn raw_dependent_count(&self) -> usize {
        self.dependents.borrow().len()
    }

    pub(crate) fn live_dependents(&self) -> SmallVec<[Rc<dyn AnyNode>; 4]> {
        self.dependents
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .filter_map(|edge| edge.dependent())
            .collect()
    }

    fn dependency_nodes(&self) -> SmallVec<[Rc<dyn AnyNode>; 4]> {
        self.dependencies
            .borrow()
            .values()
            .map(|edge| edge.dependency().clone())
            .collect()
    }

    pub(crate) fn add_dependent(&self, edge: &Rc<Edge>) {
        self.dependents.borrow_mut().push(Rc::downgrade(edge));
    }

    pub(crate) fn remove_dependent(&self, edge: *const Edge) {
        self.dependents
            .borrow_mut()
            .retain(|entry| entry.as_ptr() != edge);
    }

    /// Forget dependent entries whose edge no longer exists.
    pub(crate) fn prune_dead_dependents(&self) -> usize {
        let mut dependents = self.dependents.borrow_mut();
        let before = dependents.len();
        dependents.retain(|entry| entry.strong_count() > 0);
        before - dependents.len()
    }

    /// Abandon an interrupted update.
    ///
    /// Every edge is kept and the node goes back to Clean, so the next
    /// upstream mark reaches it and its dependents again. The next pull
    /// recomputes it even if nothing upstream changed.
    pub(crate) fn settle(&self) {
        if self.state() == NodeState::Dead {
            return;
        }
        for edge in self.dependencies.borrow().values() {
            edge.resume();
        }
        self.state.set(NodeState::Clean);
        self.recompute_pending.set(true);
    }

    fn suspend_dependencies(&self) {
        for edge in self.dependencies.borrow().values() {
            edge.suspend();
        }
    }

    /// Remove every dependency edge that was not re-read since suspension.
    fn drop_suspended_dependencies(&self) {
        let mut removed: SmallVec<[Rc<Edge>; 4]> = SmallVec::new();
        self.dependencies.borrow_mut().retain(|_, edge| {
            if edge.is_suspended() {
                removed.push(edge.clone());
                false
            } else {
                true
            }
        });
        for edge in &removed {
            edge.detach();
        }
    }
}

type Compute<T> = Box<dyn FnMut(&Observer) -> T>;

/// A node holding a value of type `T`.
///
/// Mutable nodes have no computation; memos compute `T`; effects are
/// `Node<()>`.
pub(crate) struct Node<T> {
    core: NodeCore,
    value: RefCell<Option<T>>,
    compute: RefCell<Option<Compute<T>>>,
}

impl<T: PartialEq + 'static> Node<T> {
    /// Create a mutable source holding `value`.
    pub(crate) fn mutable(scheduler: Rc<UpdateScheduler>, value: T) -> Rc<Self> {
        Rc::new(Self {
            core: NodeCore::new(NodeKind::Mutable, NodeState::Clean, scheduler),
            value: RefCell::new(Some(value)),
            compute: RefCell::new(None),
        })
    }

    /// Create a memo or effect. It starts Dirty so the first pull computes.
    pub(crate) fn derived(
        scheduler: Rc<UpdateScheduler>,
        kind: NodeKind,
        compute: Compute<T>,
    ) -> Rc<Self> {
        debug_assert_ne!(kind, NodeKind::Mutable);
        Rc::new(Self {
            core: NodeCore::new(kind, NodeState::Dirty, scheduler),
            value: RefCell::new(None),
            compute: RefCell::new(Some(compute)),
        })
    }

    pub(crate) fn as_dyn(self: &Rc<Self>) -> Rc<dyn AnyNode> {
        self.clone()
    }

    /// Store a new value. Returns `false` (and keeps the old one) if equal.
    pub(crate) fn replace(&self, value: T) -> bool {
        let mut current = self.value.borrow_mut();
        if current.as_ref() == Some(&value) {
            return false;
        }
        *current = Some(value);
        true
    }

    pub(crate) fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.value.borrow().as_ref())
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.borrow().is_some()
    }
}

impl<T: PartialEq + Clone + 'static> Node<T> {
    pub(crate) fn cloned_value(&self) -> Option<T> {
        self.value.borrow().clone()
    }
}

impl<T> Node<T> {
    pub(crate) fn core(&self) -> &NodeCore {
        &self.core
    }
}

impl<T: PartialEq + 'static> AnyNode for Node<T> {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn recompute(&self, this: &Rc<dyn AnyNode>) -> bool {
        let observer = Observer::for_node(this);
        let new_value = {
            let Ok(mut compute) = self.compute.try_borrow_mut() else {
                panic!("cyclic dependency: node {} read itself", self.core.id);
            };
            let Some(compute) = compute.as_mut() else {
                return false;
            };
            compute(&observer)
        };
        if self.core.state() == NodeState::Dead {
            return false;
        }
        self.replace(new_value)
    }

    fn release(&self) {
        if let Ok(mut compute) = self.compute.try_borrow_mut() {
            compute.take();
        }
        if let Ok(mut value) = self.value.try_borrow_mut() {
            value.take();
        }
    }
}

/// Raise `node` to `state`, queueing it if it is an effect leaving Clean.
///
/// Lower or equal states are ignored, so an effect reached through several
/// paths is queued exactly once per propagation. Everything downstream is
/// raised to at least ToBeChecked.
pub(crate) fn mark(node: &Rc<dyn AnyNode>, state: NodeState) {
    let core = node.core();
    let previous = core.state();
    if previous >= state {
        return;
    }
    core.state.set(state);

    if core.kind == NodeKind::Effect && previous == NodeState::Clean {
        core.scheduler.queue_node(node.clone());
    }

    for dependent in core.live_dependents() {
        mark(&dependent, NodeState::ToBeChecked);
    }
}

/// Settles a node whose update unwound.
struct UpdateGuard<'a> {
    core: &'a NodeCore,
    finished: bool,
}

impl UpdateGuard<'_> {
    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for UpdateGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.core.settle();
        }
    }
}

/// Bring `node` back to Clean, recomputing only if an input really changed.
///
/// If a computation panics, every node whose update was in progress is
/// settled (see `NodeCore::settle`) before the panic continues.
pub(crate) fn update(node: &Rc<dyn AnyNode>) {
    let core = node.core();
    if core.recompute_pending.replace(false) && core.state() != NodeState::Dead {
        core.state.set(NodeState::Dirty);
    }
    if matches!(core.state(), NodeState::Clean | NodeState::Dead) {
        return;
    }

    let guard = UpdateGuard {
        core,
        finished: false,
    };
    refresh(node);
    guard.finish();
}

fn refresh(node: &Rc<dyn AnyNode>) {
    let core = node.core();

    if core.state() == NodeState::ToBeChecked {
        for dependency in core.dependency_nodes() {
            update(&dependency);
            // One changed input is enough; the rest are pulled by recompute.
            if core.state() >= NodeState::Dirty {
                break;
            }
        }
    }

    match core.state() {
        NodeState::Clean | NodeState::Dead => return,
        NodeState::ToBeChecked => {}
        NodeState::Dirty => {
            core.suspend_dependencies();
            let changed = node.recompute(node);

            if core.state() == NodeState::Dead {
                // Disposed itself while running; nothing to commit.
                node.release();
                return;
            }

            core.drop_suspended_dependencies();

            if changed {
                for dependent in core.live_dependents() {
                    mark(&dependent, NodeState::Dirty);
                }
            }
        }
    }

    core.state.set(NodeState::Clean);
}

/// Record that `observer`'s node read `dependency`.
///
/// Un-suspends an existing edge or creates a new one. Reads without a live
/// observer are not recorded.
pub(crate) fn track(dependency: &Rc<dyn AnyNode>, observer: &Observer) {
    let Some(dependent) = observer.node() else {
        return;
    };
    let dependent_core = dependent.core();
    if dependent_core.state() == NodeState::Dead {
        return;
    }

    let id = dependency.core().id();
    if let Some(edge) = dependent_core.dependencies.borrow().get(&id) {
        edge.resume();
        return;
    }

    let edge = Edge::new(dependency.clone(), &dependent);
    dependent_core
        .dependencies
        .borrow_mut()
        .insert(id, edge.clone());

    dependent_core.scheduler.purge_stale();
    dependency.core().add_dependent(&edge);
}

/// A mutable node's value changed: mark its dependents and flush effects.
pub(crate) fn propagate_change(node: &Rc<dyn AnyNode>) {
    let core = node.core();
    for dependent in core.live_dependents() {
        mark(&dependent, NodeState::Dirty);
    }
    core.scheduler.flush();
}

/// Dispose an effect: unlink it from every dependency and mark it Dead.
pub(crate) fn cleanup(node: &Rc<dyn AnyNode>) {
    let core = node.core();
    if core.state() == NodeState::Dead {
        return;
    }
    assert!(
        core.live_dependents().is_empty(),
        "node {} disposed while it still has dependents",
        core.id
    );

    let edges: SmallVec<[Rc<Edge>; 4]> = core
        .dependencies
        .borrow_mut()
        .drain(..)
        .map(|(_, edge)| edge)
        .collect();
    for edge in &edges {
        edge.detach();
    }

    core.state.set(NodeState::Dead);
    node.release();
    debug!(node = %core.id, kind = ?core.kind(), dependencies = edges.len(), "node disposed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    fn scheduler() -> Rc<UpdateScheduler> {
        Rc::new(UpdateScheduler::new(RuntimeConfig::default()))
    }

    fn memo<T: PartialEq + 'static>(
        scheduler: &Rc<UpdateScheduler>,
        f: impl FnMut(&Observer) -> T + 'static,
    ) -> Rc<Node<T>> {
        Node::derived(scheduler.clone(), NodeKind::Memo, Box::new(f))
    }

    fn read<T: PartialEq + Clone + 'static>(node: &Rc<Node<T>>, observer: &Observer) -> T {
        let node_dyn = node.as_dyn();
        track(&node_dyn, observer);
        update(&node_dyn);
        node.cloned_value().unwrap()
    }

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn states_are_ordered() {
        assert!(NodeState::Clean < NodeState::ToBeChecked);
        assert!(NodeState::ToBeChecked < NodeState::Dirty);
        assert!(NodeState::Dirty < NodeState::Dead);
    }

    #[test]
    fn mutable_starts_clean_and_memo_starts_dirty() {
        let scheduler = scheduler();
        let source = Node::mutable(scheduler.clone(), 1);
        let derived = memo(&scheduler, |_| 2);

        assert_eq!(source.core().kind(), NodeKind::Mutable);
        assert_eq!(source.core().state(), NodeState::Clean);
        assert_eq!(derived.core().kind(), NodeKind::Memo);
        assert_eq!(derived.core().state(), NodeState::Dirty);
        assert!(!derived.has_value());
    }

    #[test]
    fn replace_ignores_equal_values() {
        let source = Node::mutable(scheduler(), 5);
        assert!(!source.replace(5));
        assert!(source.replace(6));
        assert_eq!(source.cloned_value(), Some(6));
    }

    #[test]
    fn mark_is_monotonic() {
        let scheduler = scheduler();
        let node = memo(&scheduler, |_| 0).as_dyn();
        update(&node);
        assert_eq!(node.core().state(), NodeState::Clean);

        mark(&node, NodeState::Dirty);
        mark(&node, NodeState::ToBeChecked);
        assert_eq!(node.core().state(), NodeState::Dirty);
    }

    #[test]
    fn tracking_creates_edges_on_both_sides() {
        let scheduler = scheduler();
        let source = Node::mutable(scheduler.clone(), 3);
        let source_in = source.clone();
        let doubled = memo(&scheduler, move |obs| read(&source_in, obs) * 2);

        update(&doubled.as_dyn());
        assert_eq!(doubled.cloned_value(), Some(6));
        assert_eq!(doubled.core().dependency_count(), 1);
        assert_eq!(source.core().live_dependents().len(), 1);
    }

    #[test]
    fn marking_a_source_reaches_transitive_dependents() {
        let scheduler = scheduler();
        let source = Node::mutable(scheduler.clone(), 1);
        let source_in = source.clone();
        let first = memo(&scheduler, move |obs| read(&source_in, obs) + 1);
        let first_in = first.clone();
        let second = memo(&scheduler, move |obs| read(&first_in, obs) + 1);
        update(&second.as_dyn());

        source.replace(10);
        for dependent in source.core().live_dependents() {
            mark(&dependent, NodeState::Dirty);
        }
        assert_eq!(first.core().state(), NodeState::Dirty);
        assert_eq!(second.core().state(), NodeState::ToBeChecked);

        update(&second.as_dyn());
        assert_eq!(second.cloned_value(), Some(12));
        assert_eq!(first.core().state(), NodeState::Clean);
    }

    #[test]
    fn unchanged_result_leaves_dependents_unrecomputed() {
        let scheduler = scheduler();
        let runs = Rc::new(Cell::new(0));
        let source = Node::mutable(scheduler.clone(), 4);
        let source_in = source.clone();
        let parity = memo(&scheduler, move |obs| read(&source_in, obs) % 2);
        let parity_in = parity.clone();
        let runs_in = runs.clone();
        let label = memo(&scheduler, move |obs| {
            runs_in.set(runs_in.get() + 1);
            read(&parity_in, obs) == 0
        });
        update(&label.as_dyn());
        assert_eq!(runs.get(), 1);

        source.replace(6);
        for dependent in source.core().live_dependents() {
            mark(&dependent, NodeState::Dirty);
        }
        update(&label.as_dyn());
        assert_eq!(runs.get(), 1);
        assert_eq!(label.core().state(), NodeState::Clean);
    }

    #[test]
    fn unread_dependencies_are_dropped_after_recompute() {
        let scheduler = scheduler();
        let flag = Node::mutable(scheduler.clone(), true);
        let a = Node::mutable(scheduler.clone(), 1);
        let b = Node::mutable(scheduler.clone(), 2);
        let (flag_in, a_in, b_in) = (flag.clone(), a.clone(), b.clone());
        let pick = memo(&scheduler, move |obs| {
            if read(&flag_in, obs) {
                read(&a_in, obs)
            } else {
                read(&b_in, obs)
            }
        });
        update(&pick.as_dyn());
        assert_eq!(pick.core().dependency_count(), 2);

        flag.replace(false);
        for dependent in flag.core().live_dependents() {
            mark(&dependent, NodeState::Dirty);
        }
        update(&pick.as_dyn());

        assert_eq!(pick.cloned_value(), Some(2));
        assert_eq!(pick.core().dependency_count(), 2);
        assert!(a.core().live_dependents().is_empty());
        assert_eq!(a.core().raw_dependent_count(), 0);
        assert_eq!(b.core().live_dependents().len(), 1);
    }

    #[test]
    fn panicking_recompute_settles_the_node() {
        let scheduler = scheduler();
        let source = Node::mutable(scheduler.clone(), 0);
        let failing = {
            let source = source.clone();
            memo(&scheduler, move |obs: &Observer| {
                let value = read(&source, obs);
                assert_ne!(value, 1, "one is not allowed");
                value
            })
        };
        let failing_dyn = failing.as_dyn();
        let outer = {
            let failing = failing.clone();
            memo(&scheduler, move |obs: &Observer| read(&failing, obs) * 10)
        };
        let outer_dyn = outer.as_dyn();
        update(&outer_dyn);

        source.replace(1);
        propagate_change(&source.as_dyn());
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| update(&outer_dyn)));
        assert!(result.is_err());

        // Both nodes are reachable by the next mark, with their edges intact.
        assert_eq!(failing_dyn.core().state(), NodeState::Clean);
        assert_eq!(outer_dyn.core().state(), NodeState::Clean);
        assert_eq!(failing_dyn.core().dependency_count(), 1);
        assert_eq!(source.core().live_dependents().len(), 1);

        source.replace(2);
        propagate_change(&source.as_dyn());
        assert_eq!(outer_dyn.core().state(), NodeState::ToBeChecked);
        update(&outer_dyn);
        assert_eq!(outer.cloned_value(), Some(20));
    }

    #[test]
    fn settled_node_recomputes_on_next_pull() {
        let scheduler = scheduler();
        let runs = Rc::new(Cell::new(0));
        let node = {
            let runs = runs.clone();
            memo(&scheduler, move |_: &Observer| {
                runs.set(runs.get() + 1);
                7
            })
        };
        let node_dyn = node.as_dyn();
        update(&node_dyn);
        node_dyn.core().settle();

        update(&node_dyn);
        assert_eq!(runs.get(), 2);
        update(&node_dyn);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn cleanup_unlinks_and_kills() {
        let scheduler = scheduler();
        let source = Node::mutable(scheduler.clone(), 0);
        let source_in = source.clone();
        let effect: Rc<Node<()>> = Node::derived(
            scheduler.clone(),
            NodeKind::Effect,
            Box::new(move |obs: &Observer| {
                read(&source_in, obs);
            }),
        );
        let effect = effect.as_dyn();
        update(&effect);
        assert_eq!(source.core().live_dependents().len(), 1);

        cleanup(&effect);
        assert_eq!(effect.core().state(), NodeState::Dead);
        assert_eq!(effect.core().dependency_count(), 0);
        assert_eq!(source.core().raw_dependent_count(), 0);

        mark(&effect, NodeState::Dirty);
        assert_eq!(effect.core().state(), NodeState::Dead);
    }
}
