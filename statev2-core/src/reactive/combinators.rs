//! Combinators
//!
//! Small derivations built on [`Memo`]: `map`, `let_state`, `zip`, and a
//! two-way `bimap` over a [`MutableState`]. Each is equivalent to writing
//! the memo closure by hand.
//!
//! The boolean and string helpers predate closure composition and are kept
//! for existing callers only.

use std::fmt;
use std::rc::Rc;

use super::memo::Memo;
use super::observer::Observer;
use super::runtime::Runtime;
use super::state::{MutableState, State};

/// Derivations available on every state.
pub trait StateExt<T>: State<T> + Clone + 'static
where
    T: Clone + PartialEq + 'static,
{
    /// A memo holding `f` applied to this state's value.
    fn map<U, F>(&self, f: F) -> Memo<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(T) -> U + 'static,
    {
        let source = self.clone();
        self.runtime().memo(move |obs| f(source.get(obs)))
    }

    /// Like [`map`](StateExt::map), but `f` borrows the value.
    fn let_state<U, F>(&self, f: F) -> Memo<U>
    where
        U: Clone + PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.clone();
        self.runtime().memo(move |obs| f(&source.get(obs)))
    }

    /// A memo pairing this state's value with `other`'s.
    fn zip<U, S>(&self, other: &S) -> Memo<(T, U)>
    where
        U: Clone + PartialEq + 'static,
        S: State<U> + Clone + 'static,
    {
        let first = self.clone();
        let second = other.clone();
        self.runtime()
            .memo(move |obs| (first.get(obs), second.get(obs)))
    }
}

impl<T, S> StateExt<T> for S
where
    T: Clone + PartialEq + 'static,
    S: State<T> + Clone + 'static,
{
}

/// Boolean helpers.
pub trait BoolStateExt: State<bool> + Clone + 'static {
    /// `self && other`.
    #[deprecated(note = "compose with a memo closure instead")]
    fn and<S>(&self, other: &S) -> Memo<bool>
    where
        S: State<bool> + Clone + 'static,
    {
        let first = self.clone();
        let second = other.clone();
        self.runtime()
            .memo(move |obs| first.get(obs) && second.get(obs))
    }

    /// `self || other`.
    #[deprecated(note = "compose with a memo closure instead")]
    fn or<S>(&self, other: &S) -> Memo<bool>
    where
        S: State<bool> + Clone + 'static,
    {
        let first = self.clone();
        let second = other.clone();
        self.runtime()
            .memo(move |obs| first.get(obs) || second.get(obs))
    }

    /// `!self`.
    #[deprecated(note = "use `map(|v| !v)` instead")]
    fn not(&self) -> Memo<bool> {
        let source = self.clone();
        self.runtime().memo(move |obs| !source.get(obs))
    }
}

impl<S> BoolStateExt for S where S: State<bool> + Clone + 'static {}

/// String helpers.
pub trait StrStateExt: State<String> + Clone + 'static {
    /// Whether this string contains `other`'s value.
    #[deprecated(note = "compose with a memo closure instead")]
    fn contains<S>(&self, other: &S, ignore_case: bool) -> Memo<bool>
    where
        S: State<String> + Clone + 'static,
    {
        let haystack = self.clone();
        let needle = other.clone();
        self.runtime().memo(move |obs| {
            let (haystack, needle) = (haystack.get(obs), needle.get(obs));
            if ignore_case {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            } else {
                haystack.contains(&needle)
            }
        })
    }

    /// Whether the string is empty.
    #[deprecated(note = "use `map(|s| s.is_empty())` instead")]
    fn is_empty(&self) -> Memo<bool> {
        let source = self.clone();
        self.runtime().memo(move |obs| source.get(obs).is_empty())
    }

    /// Whether the string is not empty.
    #[deprecated(note = "use `map(|s| !s.is_empty())` instead")]
    fn is_not_empty(&self) -> Memo<bool> {
        let source = self.clone();
        self.runtime().memo(move |obs| !source.get(obs).is_empty())
    }
}

impl<S> StrStateExt for S where S: State<String> + Clone + 'static {}

impl<T> MutableState<T>
where
    T: Clone + PartialEq + 'static,
{
    /// A two-way view: reads go through `map`, writes go back through `unmap`.
    pub fn bimap<U, M, N>(&self, map: M, unmap: N) -> BimapState<T, U>
    where
        U: Clone + PartialEq + 'static,
        M: Fn(&T) -> U + 'static,
        N: Fn(&U) -> T + 'static,
    {
        BimapState {
            source: self.clone(),
            mapped: self.let_state(map),
            unmap: Rc::new(unmap),
        }
    }
}

/// A mutable view of another mutable state through a pair of functions.
pub struct BimapState<T, U> {
    source: MutableState<T>,
    mapped: Memo<U>,
    unmap: Rc<dyn Fn(&U) -> T>,
}

impl<T, U> BimapState<T, U>
where
    T: Clone + PartialEq + 'static,
    U: Clone + PartialEq + 'static,
{
    /// Write `value` to the source state through the inverse function.
    pub fn set(&self, value: U) {
        self.source.set((self.unmap)(&value));
    }

    /// Set the value computed from the current mapped value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&U) -> U,
    {
        let next = f(&self.mapped.get_untracked());
        self.set(next);
    }
}

impl<T, U> State<U> for BimapState<T, U>
where
    T: Clone + PartialEq + 'static,
    U: Clone + PartialEq + 'static,
{
    fn get(&self, observer: &Observer) -> U {
        self.mapped.get(observer)
    }

    fn get_untracked(&self) -> U {
        self.mapped.get_untracked()
    }

    fn runtime(&self) -> Runtime {
        self.source.runtime()
    }
}

impl<T, U> Clone for BimapState<T, U> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            mapped: self.mapped.clone(),
            unmap: Rc::clone(&self.unmap),
        }
    }
}

impl<T, U> fmt::Debug for BimapState<T, U>
where
    U: Clone + PartialEq + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BimapState")
            .field("mapped", &self.mapped)
            .finish()
    }
}
