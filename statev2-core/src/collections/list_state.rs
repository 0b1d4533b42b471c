//! List States
//!
//! [`ListState`] is a mutable state holding a [`TrackedList`]. Every edit
//! goes through the list's `with_*` methods, so readers holding the previous
//! value get exact changes from `changes_since`. [`SetState`] is the same
//! with duplicate elements refused.

use std::fmt;

use super::tracked_list::TrackedList;
use crate::error::Result;
use crate::reactive::{MutableState, Observer, Runtime, State};

/// A mutable state holding a [`TrackedList`].
///
/// # Example
///
/// ```rust
/// use statev2_core::collections::ListState;
/// use statev2_core::reactive::{Runtime, State};
///
/// let runtime = Runtime::new();
/// let list = ListState::new(&runtime, vec!["a"]);
///
/// let before = list.get_untracked();
/// list.push("b");
/// let after = list.get_untracked();
///
/// assert_eq!(after.changes_since(&before).to_vec().len(), 1);
/// ```
pub struct ListState<T> {
    state: MutableState<TrackedList<T>>,
}

impl<T> ListState<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a list state with the given elements.
    pub fn new(runtime: &Runtime, items: Vec<T>) -> Self {
        Self {
            state: MutableState::new(runtime, TrackedList::new(items)),
        }
    }

    /// Append an element.
    pub fn push(&self, value: T) {
        let next = self.state.with(|list| list.with_pushed(value));
        self.state.set(next);
    }

    /// Insert an element at `index`.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        let next = self.state.with(|list| list.with_added(index, value))?;
        self.state.set(next);
        Ok(())
    }

    /// Remove and return the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        let (next, removed) = self.state.with(|list| {
            let next = list.with_removed(index)?;
            Ok::<_, crate::error::StateError>((next, list[index].clone()))
        })?;
        self.state.set(next);
        Ok(removed)
    }

    /// Remove the first element equal to `value`. Returns whether one was
    /// found.
    pub fn remove(&self, value: &T) -> bool {
        let next = self.state.with(|list| {
            let index = list.iter().position(|item| item == value)?;
            let next = list
                .with_removed(index)
                .expect("position is within the list");
            Some(next)
        });
        let Some(next) = next else {
            return false;
        };
        self.state.set(next);
        true
    }

    /// Replace every element. Does nothing if the elements are equal.
    pub fn set_all(&self, items: Vec<T>) {
        self.state.set(TrackedList::new(items));
    }

    /// Remove every element.
    pub fn clear(&self) {
        let next = self.state.with(TrackedList::with_cleared);
        self.state.set(next);
    }

    /// Number of elements, untracked.
    pub fn len(&self) -> usize {
        self.state.with(|list| list.len())
    }

    /// Whether the list is empty, untracked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn position(&self, value: &T) -> Option<usize> {
        self.state
            .with(|list| list.iter().position(|item| item == value))
    }

    /// The underlying mutable state.
    pub fn as_state(&self) -> &MutableState<TrackedList<T>> {
        &self.state
    }
}

impl<T> State<TrackedList<T>> for ListState<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self, observer: &Observer) -> TrackedList<T> {
        self.state.get(observer)
    }

    fn get_untracked(&self) -> TrackedList<T> {
        self.state.get_untracked()
    }

    fn runtime(&self) -> Runtime {
        self.state.runtime()
    }
}

impl<T> Clone for ListState<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl<T> fmt::Debug for ListState<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ListState").field(&self.state).finish()
    }
}

/// A list state that never holds two equal elements.
pub struct SetState<T> {
    list: ListState<T>,
}

impl<T> SetState<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a set state. Later duplicates in `items` are dropped.
    pub fn new(runtime: &Runtime, items: Vec<T>) -> Self {
        Self {
            list: ListState::new(runtime, dedup(items)),
        }
    }

    /// Add `value` unless it is already present. Returns whether it was
    /// added.
    pub fn insert(&self, value: T) -> bool {
        if self.list.position(&value).is_some() {
            return false;
        }
        self.list.push(value);
        true
    }

    /// Remove `value`. Returns whether it was present.
    pub fn remove(&self, value: &T) -> bool {
        self.list.remove(value)
    }

    /// Whether `value` is present, tracked by `observer`.
    pub fn contains(&self, observer: &Observer, value: &T) -> bool {
        self.list.get(observer).contains(value)
    }

    /// Replace every element. Later duplicates in `items` are dropped.
    pub fn set_all(&self, items: Vec<T>) {
        self.list.set_all(dedup(items));
    }

    /// Remove every element.
    pub fn clear(&self) {
        self.list.clear();
    }

    /// Number of elements, untracked.
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the set is empty, untracked.
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

fn dedup<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut unique: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}

impl<T> State<TrackedList<T>> for SetState<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self, observer: &Observer) -> TrackedList<T> {
        self.list.get(observer)
    }

    fn get_untracked(&self) -> TrackedList<T> {
        self.list.get_untracked()
    }

    fn runtime(&self) -> Runtime {
        self.list.runtime()
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
        }
    }
}

impl<T> fmt::Debug for SetState<T>
where
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SetState").field(&self.list.state).finish()
    }
}
