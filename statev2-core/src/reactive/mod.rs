//! Reactive Primitives
//!
//! This module implements the public reactive surface: mutable states,
//! memos, and effects, plus small combinators on top of them.
//!
//! # Concepts
//!
//! ## Mutable states
//!
//! A [`MutableState`] holds a value that is set from outside the graph.
//! Reading it through an [`Observer`] registers the reader as a dependent.
//!
//! ## Memos
//!
//! A [`Memo`] is a derived value that caches its result. It computes on first
//! read and recomputes only when a dependency produced a different value.
//!
//! ## Effects
//!
//! An [`Effect`] runs a side effect immediately and again whenever a value it
//! read changes. By the time a `set` returns, every affected effect has run
//! exactly once with the settled values.
//!
//! # Implementation Notes
//!
//! Dependencies are tracked through an explicit [`Observer`] argument rather
//! than an implicit ambient context. Each [`Runtime`] owns one graph and its
//! scheduler; nothing is global.

mod combinators;
mod effect;
mod memo;
mod observer;
mod runtime;
mod state;

pub use combinators::{BimapState, BoolStateExt, StateExt, StrStateExt};
pub use effect::{Disposer, Effect, Owner};
pub use memo::Memo;
pub use observer::Observer;
pub use runtime::Runtime;
pub use state::{MutableState, State};
