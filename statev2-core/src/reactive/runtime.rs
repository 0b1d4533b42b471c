//! Reactive Runtime
//!
//! The runtime is the execution context that owns one reactive graph. It
//! replaces a per-thread global: whoever drives the graph (usually the UI
//! thread) creates a `Runtime` and builds states, memos and effects from it.
//!
//! # How It Works
//!
//! 1. States, memos and effects created from a runtime share its scheduler.
//!
//! 2. When a memo or effect reads a state through its [`Observer`], the
//!    graph records the dependency.
//!
//! 3. When a mutable state changes, the runtime:
//!    a. Marks direct dependents dirty and everything further down
//!       to-be-checked
//!    b. Queues every affected effect once
//!    c. Flushes the queue before `set` returns
//!    d. Memos are lazy - they recompute on next read
//!
//! # Thread Safety
//!
//! `Runtime` is neither `Send` nor `Sync`. All reads and writes of a graph
//! happen on the thread that created it, so no locking is needed.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::effect::{Disposer, Effect, Owner};
use super::memo::Memo;
use super::observer::Observer;
use super::state::MutableState;
use crate::config::RuntimeConfig;
use crate::graph::scheduler::UpdateScheduler;

/// Handle to a reactive graph. Cloning shares the graph.
#[derive(Clone)]
pub struct Runtime {
    scheduler: Rc<UpdateScheduler>,
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Create a runtime with the given configuration.
    pub fn with_config(config: RuntimeConfig) -> Self {
        debug!(?config, "reactive runtime created");
        Self {
            scheduler: Rc::new(UpdateScheduler::new(config)),
        }
    }

    pub(crate) fn from_scheduler(scheduler: Rc<UpdateScheduler>) -> Self {
        Self { scheduler }
    }

    pub(crate) fn scheduler(&self) -> &Rc<UpdateScheduler> {
        &self.scheduler
    }

    /// The configuration this runtime was created with.
    pub fn config(&self) -> &RuntimeConfig {
        self.scheduler.config()
    }

    /// Create a mutable state holding `value`.
    pub fn mutable_state<T>(&self, value: T) -> MutableState<T>
    where
        T: Clone + PartialEq + 'static,
    {
        MutableState::new(self, value)
    }

    /// Create a lazily computed memo.
    pub fn memo<T, F>(&self, compute: F) -> Memo<T>
    where
        T: Clone + PartialEq + 'static,
        F: FnMut(&Observer) -> T + 'static,
    {
        Memo::new(self, compute)
    }

    /// Create an effect. It runs immediately and lives as long as the handle.
    #[must_use = "an effect is collected as soon as its handle is dropped"]
    pub fn effect<F>(&self, body: F) -> Effect
    where
        F: FnMut(&Observer) + 'static,
    {
        Effect::new(self, body)
    }

    /// Create an effect kept alive by `owner` and return its disposer.
    pub fn effect_in<F>(&self, owner: &Owner, body: F) -> Disposer
    where
        F: FnMut(&Observer) + 'static,
    {
        let effect = Effect::new(self, body);
        let disposer = effect.disposer();
        owner.hold(effect);
        disposer
    }

    /// Run all queued effects now. Does nothing while a flush is running.
    pub fn flush(&self) {
        self.scheduler.flush();
    }

    /// Whether a flush is currently draining the effect queue.
    pub fn is_processing(&self) -> bool {
        self.scheduler.is_processing()
    }

    /// Number of stale-dependent notifications waiting to be purged.
    pub fn pending_stale(&self) -> usize {
        self.scheduler.pending_stale()
    }

    /// Whether two handles refer to the same graph.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.scheduler, &other.scheduler)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", self.config())
            .field("processing", &self.is_processing())
            .field("pending_stale", &self.pending_stale())
            .finish()
    }
}
