//! Update Scheduler
//!
//! The scheduler batches effect re-runs for one reactive graph.
//!
//! # Algorithm
//!
//! 1. A mutable write marks its dependents (see [`mark`](super::node::mark)).
//!    Every effect that leaves the Clean state is appended to the queue;
//!    the Clean-state guard means an effect is queued at most once.
//! 2. `flush` walks the queue by index and pulls each effect up to date.
//! 3. Effects that write other states while running append more effects to
//!    the same queue. Indexing (rather than iterating a snapshot) makes them
//!    run in this same flush, in the order they were queued.
//! 4. Once the queue is exhausted it is cleared and the reentrancy flag is
//!    reset.
//!
//! If an effect panics, the panic reaches whoever triggered the flush. The
//! failing effect goes back to Clean, so its next change queues it again,
//! and effects that had not run yet stay queued for the next flush.
//!
//! The scheduler also owns the stale-dependent queue: edges dropped along
//! with their dependent report the dependency here, and the dead entries are
//! purged in batches the next time an edge is inserted.

use std::cell::{Cell, RefCell};
use std::mem;
use std::rc::{Rc, Weak};
use std::thread;

use tracing::{error, trace};

use super::node::{update, AnyNode, NodeState};
use crate::config::RuntimeConfig;

/// Effect queue and stale-edge bookkeeping for one reactive graph.
pub(crate) struct UpdateScheduler {
    config: RuntimeConfig,

    /// Effects awaiting a re-run, in first-queued order.
    queue: RefCell<Vec<Rc<dyn AnyNode>>>,

    /// Set while a flush is draining the queue.
    processing: Cell<bool>,

    /// Dependencies that may hold dependent entries for dropped edges.
    stale: RefCell<Vec<Weak<dyn AnyNode>>>,
}

impl UpdateScheduler {
    pub(crate) fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            queue: RefCell::new(Vec::new()),
            processing: Cell::new(false),
            stale: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn is_processing(&self) -> bool {
        self.processing.get()
    }

    pub(crate) fn queued(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Append an effect to the pending queue. Deduplication is the caller's job.
    pub(crate) fn queue_node(&self, node: Rc<dyn AnyNode>) {
        self.queue.borrow_mut().push(node);
    }

    /// Run every queued effect, including ones queued while flushing.
    ///
    /// A no-op while a flush is already in progress or when nothing is queued.
    pub(crate) fn flush(&self) {
        if self.processing.get() || self.queue.borrow().is_empty() {
            return;
        }
        self.processing.set(true);
        let mut guard = FlushGuard {
            scheduler: self,
            position: 0,
        };
        trace!(queued = self.queued(), "flushing effects");

        let mut index = 0;
        loop {
            let next = self.queue.borrow().get(index).cloned();
            let Some(node) = next else {
                break;
            };
            if index >= self.config.max_effects_per_flush {
                error!(
                    limit = self.config.max_effects_per_flush,
                    "effects keep re-triggering each other"
                );
                panic!(
                    "flush exceeded {} effect updates; effects are re-triggering each other",
                    self.config.max_effects_per_flush
                );
            }
            guard.position = index;
            update(&node);
            index += 1;
        }

        trace!(ran = index, "flush complete");
    }

    /// Record that `dependency` lost an edge without being told.
    pub(crate) fn note_stale(&self, dependency: Weak<dyn AnyNode>) {
        self.stale.borrow_mut().push(dependency);
    }

    pub(crate) fn pending_stale(&self) -> usize {
        self.stale.borrow().len()
    }

    /// Prune dead dependent entries once enough notifications have piled up.
    pub(crate) fn purge_stale(&self) {
        if self.stale.borrow().len() < self.config.stale_purge_threshold.max(1) {
            return;
        }
        let stale = mem::take(&mut *self.stale.borrow_mut());
        let mut pruned = 0;
        for dependency in stale.iter().filter_map(Weak::upgrade) {
            pruned += dependency.core().prune_dead_dependents();
        }
        trace!(notified = stale.len(), pruned, "purged stale dependents");
    }
}

/// Resets the scheduler when a flush ends, normally or by unwinding.
struct FlushGuard<'a> {
    scheduler: &'a UpdateScheduler,

    /// Queue index of the effect being updated.
    position: usize,
}

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        // Release the queue before dropping it: a dropped effect may drop edges.
        let drained = mem::take(&mut *self.scheduler.queue.borrow_mut());
        self.scheduler.processing.set(false);
        if !thread::panicking() {
            return;
        }

        let mut rest = drained.into_iter().skip(self.position);
        if let Some(failed) = rest.next() {
            failed.core().settle();
        }
        let pending: Vec<_> = rest
            .filter(|node| node.core().state() != NodeState::Clean)
            .filter(|node| node.core().state() != NodeState::Dead)
            .collect();
        self.scheduler.queue.borrow_mut().extend(pending);
    }
}
