//! StateV2 Core
//!
//! A fine-grained reactive state graph for UI code. It implements:
//!
//! - Mutable states, lazily computed memos and effects
//! - Glitch-free push-then-pull propagation with value-equality cut-off
//! - Dynamic dependency tracking through an explicit [`Observer`]
//! - Versioned lists that report the changes between two versions
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: nodes, edges and the update scheduler
//! - `reactive`: the public primitives and the [`Runtime`] that owns a graph
//! - `collections`: [`TrackedList`] diffing and list states
//! - `config`: runtime tuning knobs
//! - `error`: the crate error type
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use statev2_core::{Runtime, State};
//!
//! let runtime = Runtime::new();
//!
//! // Create a mutable state
//! let count = runtime.mutable_state(0);
//!
//! // Create a derived value
//! let doubled = {
//!     let count = count.clone();
//!     runtime.memo(move |obs| count.get(obs) * 2)
//! };
//!
//! // Create an effect
//! let seen = Rc::new(Cell::new(0));
//! let _effect = {
//!     let seen = seen.clone();
//!     runtime.effect(move |obs| seen.set(doubled.get(obs)))
//! };
//!
//! // Update the state; the effect has re-run by the time `set` returns
//! count.set(5);
//! assert_eq!(seen.get(), 10);
//! ```

pub mod collections;
pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use collections::{Change, ListState, SetState, TrackedList};
pub use config::RuntimeConfig;
pub use error::{Result, StateError};
pub use graph::{NodeId, NodeKind, NodeState};
pub use reactive::{
    Disposer, Effect, Memo, MutableState, Observer, Owner, Runtime, State, StateExt,
};
