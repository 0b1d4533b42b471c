//! Dependency Graph
//!
//! This module implements the dependency graph that tracks relationships
//! between mutable states, memos and effects.
//!
//! # Overview
//!
//! - Nodes hold values (mutable states, memos) or side effects (effects).
//! - Edges are dependencies: if a memo reads a state, an edge links the
//!   state (dependency) to the memo (dependent).
//! - The scheduler batches effect re-runs after a write.
//!
//! # Design Decisions
//!
//! 1. The graph is distributed: every node owns its own edge lists instead
//!    of living in a central table. A dependent owns its outgoing edges
//!    strongly; a dependency sees its dependents only through `Weak`s, so an
//!    unreachable memo or effect is freed without explicit teardown.
//!
//! 2. Dependencies are kept in an insertion-ordered map keyed by node ID, so
//!    re-reading a dependency finds its edge in O(1) while the pull phase can
//!    still walk dependencies in first-read order.
//!
//! 3. Nothing here is `Send`. A graph belongs to the thread that created its
//!    runtime.

pub(crate) mod edge;
pub(crate) mod node;
pub(crate) mod scheduler;

pub use node::{NodeId, NodeKind, NodeState};
