//! Tracked Lists
//!
//! A [`TrackedList`] is an immutable, versioned list value meant to be held
//! in a state. Consumers that keep the list they saw last can ask the new one
//! for the [`Change`]s between the two and patch their own structures
//! instead of rebuilding them.
//!
//! # Replay Law
//!
//! Applying `new.changes_since(&old)` to `old` in order, with index-based
//! insert/remove semantics, always yields exactly `new`.
//!
//! # How Changes Are Found
//!
//! - A list derived from `old` through `with_added`, `with_removed`,
//!   `with_cleared` or `apply_changes` remembers the changes that produced
//!   it, and returns them verbatim.
//! - Otherwise the changes are estimated. Lists sharing no element at all
//!   produce one `Clear` followed by sequential `Add`s. Anything else skips
//!   the common prefix and suffix, then walks the differing middle, pairing
//!   a `Remove` with an `Add` at the same index when neither element occurs
//!   later on the other side. The estimate is not a minimal edit script.

use std::fmt;
use std::iter::FusedIterator;
use std::ops::Deref;
use std::rc::Rc;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StateError};

fn next_version() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A single list edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change<T> {
    /// Insert `value` so that it ends up at `index`.
    Add {
        /// Position of the inserted element.
        index: usize,
        /// The inserted element.
        value: T,
    },

    /// Remove the element at `index`, which is `value`.
    Remove {
        /// Position of the removed element.
        index: usize,
        /// The removed element.
        value: T,
    },

    /// Remove every element.
    Clear {
        /// The elements that were removed.
        elements: Vec<T>,
    },
}

impl<T: PartialEq> Change<T> {
    /// Apply this change to `target`.
    ///
    /// Fails without modifying `target` if the index is out of range or a
    /// removed element (or a cleared list) does not match.
    pub fn apply(self, target: &mut Vec<T>) -> Result<()> {
        match self {
            Change::Add { index, value } => {
                if index > target.len() {
                    return Err(StateError::IndexOutOfBounds {
                        index,
                        len: target.len(),
                    });
                }
                target.insert(index, value);
            }
            Change::Remove { index, value } => match target.get(index) {
                None => {
                    return Err(StateError::IndexOutOfBounds {
                        index,
                        len: target.len(),
                    })
                }
                Some(existing) if *existing != value => {
                    return Err(StateError::RemovedValueMismatch { index });
                }
                Some(_) => {
                    target.remove(index);
                }
            },
            Change::Clear { elements } => {
                if *target != elements {
                    return Err(StateError::ClearedValuesMismatch {
                        expected: elements.len(),
                        len: target.len(),
                    });
                }
                target.clear();
            }
        }
        Ok(())
    }
}

struct Origin<T> {
    parent_version: u64,
    changes: Vec<Change<T>>,
}

/// An immutable, versioned list.
///
/// Cloning is cheap and keeps the version. Equality compares elements only,
/// so writing an equal list into a state does not propagate.
pub struct TrackedList<T> {
    items: Rc<Vec<T>>,
    version: u64,
    origin: Option<Rc<Origin<T>>>,
}

impl<T> TrackedList<T> {
    /// Create a list with a fresh version and no history.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(items),
            version: next_version(),
            origin: None,
        }
    }

    /// Create an empty list.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// The version of this list. Every derived list gets a new one.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn derive(&self, items: Vec<T>, changes: Vec<Change<T>>) -> Self {
        Self {
            items: Rc::new(items),
            version: next_version(),
            origin: Some(Rc::new(Origin {
                parent_version: self.version,
                changes,
            })),
        }
    }
}

impl<T: Clone + PartialEq> TrackedList<T> {
    /// A new list with `value` inserted at `index`.
    pub fn with_added(&self, index: usize, value: T) -> Result<Self> {
        if index > self.len() {
            return Err(StateError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        let mut items = self.to_vec();
        items.insert(index, value.clone());
        Ok(self.derive(items, vec![Change::Add { index, value }]))
    }

    /// A new list with `value` appended.
    pub fn with_pushed(&self, value: T) -> Self {
        let index = self.len();
        let mut items = self.to_vec();
        items.push(value.clone());
        self.derive(items, vec![Change::Add { index, value }])
    }

    /// A new list without the element at `index`.
    pub fn with_removed(&self, index: usize) -> Result<Self> {
        if index >= self.len() {
            return Err(StateError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        let mut items = self.to_vec();
        let value = items.remove(index);
        Ok(self.derive(items, vec![Change::Remove { index, value }]))
    }

    /// A new empty list.
    pub fn with_cleared(&self) -> Self {
        self.derive(
            Vec::new(),
            vec![Change::Clear {
                elements: self.to_vec(),
            }],
        )
    }

    /// Replay `changes` on top of this list.
    ///
    /// The result remembers the changes, so `result.changes_since(self)`
    /// returns them as given.
    pub fn apply_changes<I>(&self, changes: I) -> Result<Self>
    where
        I: IntoIterator<Item = Change<T>>,
    {
        let mut items = self.to_vec();
        let mut applied = Vec::new();
        for change in changes {
            change.clone().apply(&mut items)?;
            applied.push(change);
        }
        Ok(self.derive(items, applied))
    }

    /// The changes that turn `old` into this list.
    pub fn changes_since<'a>(&'a self, old: &'a TrackedList<T>) -> ChangeSet<'a, T> {
        if self.version == old.version || Rc::ptr_eq(&self.items, &old.items) {
            return ChangeSet::recorded(&[]);
        }
        match &self.origin {
            Some(origin) if origin.parent_version == old.version => {
                ChangeSet::recorded(&origin.changes)
            }
            _ => ChangeSet::estimated(old.as_slice(), self.as_slice()),
        }
    }
}

impl<T> Clone for TrackedList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Rc::clone(&self.items),
            version: self.version,
            origin: self.origin.clone(),
        }
    }
}

impl<T> Default for TrackedList<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Deref for TrackedList<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> PartialEq for TrackedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Eq> Eq for TrackedList<T> {}

impl<T> FromIterator<T> for TrackedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> From<Vec<T>> for TrackedList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T: fmt::Debug> fmt::Debug for TrackedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedList")
            .field("version", &self.version)
            .field("items", &self.items)
            .finish()
    }
}

/// The changes between two lists. Iterate it as often as needed.
pub struct ChangeSet<'a, T> {
    source: Source<'a, T>,
}

enum Source<'a, T> {
    Recorded(&'a [Change<T>]),
    Estimated { old: &'a [T], new: &'a [T] },
}

impl<'a, T: Clone + PartialEq> ChangeSet<'a, T> {
    fn recorded(changes: &'a [Change<T>]) -> Self {
        Self {
            source: Source::Recorded(changes),
        }
    }

    fn estimated(old: &'a [T], new: &'a [T]) -> Self {
        Self {
            source: Source::Estimated { old, new },
        }
    }

    /// Whether the changes were recorded when the list was derived.
    pub fn is_recorded(&self) -> bool {
        matches!(self.source, Source::Recorded(_))
    }

    /// A fresh iterator over the changes, from the first one.
    pub fn iter(&self) -> Changes<'a, T> {
        let inner = match self.source {
            Source::Recorded(changes) => ChangesInner::Recorded(changes.iter()),
            Source::Estimated { old, new } => ChangesInner::Estimated(estimate(old, new)),
        };
        Changes { inner }
    }

    /// Collect the changes.
    pub fn to_vec(&self) -> Vec<Change<T>> {
        self.iter().collect()
    }
}

impl<'a, T: Clone + PartialEq> IntoIterator for ChangeSet<'a, T> {
    type Item = Change<T>;
    type IntoIter = Changes<'a, T>;

    fn into_iter(self) -> Changes<'a, T> {
        self.iter()
    }
}

impl<'a, T: Clone + PartialEq> IntoIterator for &ChangeSet<'a, T> {
    type Item = Change<T>;
    type IntoIter = Changes<'a, T>;

    fn into_iter(self) -> Changes<'a, T> {
        self.iter()
    }
}

/// Iterator over a [`ChangeSet`].
#[derive(Clone)]
pub struct Changes<'a, T> {
    inner: ChangesInner<'a, T>,
}

#[derive(Clone)]
enum ChangesInner<'a, T> {
    Recorded(slice::Iter<'a, Change<T>>),
    Estimated(Estimate<'a, T>),
}

impl<T: Clone + PartialEq> Iterator for Changes<'_, T> {
    type Item = Change<T>;

    fn next(&mut self) -> Option<Change<T>> {
        match &mut self.inner {
            ChangesInner::Recorded(changes) => changes.next().cloned(),
            ChangesInner::Estimated(estimate) => estimate.next(),
        }
    }
}

impl<T: Clone + PartialEq> FusedIterator for Changes<'_, T> {}

/// Lazily estimate the changes turning `old` into `new`.
pub fn estimate<'a, T: PartialEq>(old: &'a [T], new: &'a [T]) -> Estimate<'a, T> {
    let disjoint = !old.is_empty() && old.iter().all(|item| !new.contains(item));
    if disjoint {
        return Estimate {
            old,
            new,
            i: 0,
            j: 0,
            old_end: old.len(),
            new_end: new.len(),
            clear: Some(false),
            pending: None,
        };
    }

    let prefix = old
        .iter()
        .zip(new)
        .take_while(|(a, b)| a == b)
        .count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();

    Estimate {
        old,
        new,
        i: prefix,
        j: prefix,
        old_end: old.len() - suffix,
        new_end: new.len() - suffix,
        clear: None,
        pending: None,
    }
}

/// Iterator returned by [`estimate`].
///
/// `j` doubles as the insertion index: after each step the list being
/// rebuilt reads `new[..j]` followed by `old[i..]`.
#[derive(Clone)]
pub struct Estimate<'a, T> {
    old: &'a [T],
    new: &'a [T],
    i: usize,
    j: usize,
    old_end: usize,
    new_end: usize,
    /// `Some(emitted)` when the lists share nothing.
    clear: Option<bool>,
    pending: Option<Change<T>>,
}

impl<T: Clone + PartialEq> Estimate<'_, T> {
    fn next_cleared(&mut self) -> Option<Change<T>> {
        if self.clear == Some(false) {
            self.clear = Some(true);
            return Some(Change::Clear {
                elements: self.old.to_vec(),
            });
        }
        let value = self.new.get(self.j)?.clone();
        let index = self.j;
        self.j += 1;
        Some(Change::Add { index, value })
    }
}

impl<T: Clone + PartialEq> Iterator for Estimate<'_, T> {
    type Item = Change<T>;

    fn next(&mut self) -> Option<Change<T>> {
        if let Some(change) = self.pending.take() {
            return Some(change);
        }
        if self.clear.is_some() {
            return self.next_cleared();
        }

        loop {
            let index = self.j;
            let old_left = self.i < self.old_end;
            let new_left = self.j < self.new_end;

            match (old_left, new_left) {
                (false, false) => return None,
                (false, true) => {
                    self.j += 1;
                    return Some(Change::Add {
                        index,
                        value: self.new[index].clone(),
                    });
                }
                (true, false) => {
                    let value = self.old[self.i].clone();
                    self.i += 1;
                    return Some(Change::Remove { index, value });
                }
                (true, true) => {}
            }

            let removed = &self.old[self.i];
            let added = &self.new[self.j];
            if removed == added {
                self.i += 1;
                self.j += 1;
                continue;
            }

            let removed_reappears = self.new[self.j + 1..self.new_end].contains(removed);
            let added_was_present = self.old[self.i + 1..self.old_end].contains(added);

            if removed_reappears && !added_was_present {
                self.j += 1;
                return Some(Change::Add {
                    index,
                    value: added.clone(),
                });
            }
            if added_was_present && !removed_reappears {
                self.i += 1;
                return Some(Change::Remove {
                    index,
                    value: removed.clone(),
                });
            }

            self.i += 1;
            self.j += 1;
            self.pending = Some(Change::Add {
                index,
                value: added.clone(),
            });
            return Some(Change::Remove {
                index,
                value: removed.clone(),
            });
        }
    }
}

impl<T: Clone + PartialEq> FusedIterator for Estimate<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay<T: Clone + PartialEq + fmt::Debug>(old: &[T], new: &[T]) -> Vec<Change<T>> {
        let old_list = TrackedList::new(old.to_vec());
        let new_list = TrackedList::new(new.to_vec());
        let changes = new_list.changes_since(&old_list).to_vec();

        let mut target = old.to_vec();
        for change in changes.clone() {
            change.apply(&mut target).unwrap();
        }
        assert_eq!(target, new, "replaying {changes:?} onto {old:?}");
        changes
    }

    #[test]
    fn same_list_has_no_changes() {
        let list = TrackedList::new(vec![1, 2, 3]);
        assert!(list.changes_since(&list).to_vec().is_empty());
        assert!(list.changes_since(&list.clone()).to_vec().is_empty());
    }

    #[test]
    fn empty_to_empty_has_no_changes() {
        assert!(replay::<i32>(&[], &[]).is_empty());
    }

    #[test]
    fn equal_lists_have_no_changes() {
        assert!(replay(&[1, 2, 3], &[1, 2, 3]).is_empty());
    }

    #[test]
    fn growth_at_the_end_is_pure_adds() {
        assert_eq!(
            replay(&[1, 2], &[1, 2, 3, 4]),
            vec![
                Change::Add { index: 2, value: 3 },
                Change::Add { index: 3, value: 4 },
            ]
        );
    }

    #[test]
    fn growth_at_the_front_is_pure_adds() {
        assert_eq!(
            replay(&[3, 4], &[1, 2, 3, 4]),
            vec![
                Change::Add { index: 0, value: 1 },
                Change::Add { index: 1, value: 2 },
            ]
        );
    }

    #[test]
    fn shrinking_is_pure_removes() {
        assert_eq!(
            replay(&[1, 2, 3, 4], &[1, 4]),
            vec![
                Change::Remove { index: 1, value: 2 },
                Change::Remove { index: 1, value: 3 },
            ]
        );
    }

    #[test]
    fn replacement_pairs_remove_and_add() {
        assert_eq!(
            replay(&[1, 2, 3], &[1, 9, 3]),
            vec![
                Change::Remove { index: 1, value: 2 },
                Change::Add { index: 1, value: 9 },
            ]
        );
    }

    #[test]
    fn disjoint_lists_clear_then_add() {
        assert_eq!(
            replay(&[1, 2], &[3, 4, 5]),
            vec![
                Change::Clear {
                    elements: vec![1, 2]
                },
                Change::Add { index: 0, value: 3 },
                Change::Add { index: 1, value: 4 },
                Change::Add { index: 2, value: 5 },
            ]
        );
        assert_eq!(
            replay(&[1, 2], &[]),
            vec![Change::Clear {
                elements: vec![1, 2]
            }]
        );
    }

    #[test]
    fn interleaved_edits_replay() {
        let cases: &[(&[i32], &[i32])] = &[
            (&[1, 2, 3, 4, 5], &[5, 4, 3, 2, 1]),
            (&[1, 2, 3, 4, 5], &[2, 1, 4, 3, 6, 5]),
            (&[1, 1, 2, 2], &[2, 1, 2, 1]),
            (&[1, 2, 3], &[3, 7, 1, 8, 2]),
            (&[0, 1, 2, 3, 4, 5, 6], &[0, 6, 2, 9, 4, 1]),
            (&[], &[1, 2]),
            (&[5], &[5, 5, 5]),
            (&[5, 5, 5], &[5]),
        ];
        for (old, new) in cases {
            replay::<i32>(old, new);
        }
    }

    #[test]
    fn change_sets_are_restartable() {
        let old = TrackedList::new(vec!['a', 'b', 'c']);
        let new = TrackedList::new(vec!['c', 'x', 'a']);
        let changes = new.changes_since(&old);

        let first: Vec<_> = changes.iter().collect();
        let second: Vec<_> = (&changes).into_iter().collect();
        assert_eq!(first, second);
        assert!(!changes.is_recorded());
    }

    #[test]
    fn derived_lists_return_recorded_changes() {
        let base = TrackedList::new(vec![1, 2, 3]);
        let added = base.with_added(1, 7).unwrap();
        let changes = added.changes_since(&base);
        assert!(changes.is_recorded());
        assert_eq!(changes.to_vec(), vec![Change::Add { index: 1, value: 7 }]);

        let removed = added.with_removed(0).unwrap();
        assert_eq!(
            removed.changes_since(&added).to_vec(),
            vec![Change::Remove { index: 0, value: 1 }]
        );

        // Two steps back there is no record; the estimate still replays.
        let changes = removed.changes_since(&base);
        assert!(!changes.is_recorded());
        let mut target = base.to_vec();
        for change in &changes {
            change.apply(&mut target).unwrap();
        }
        assert_eq!(target, removed.as_slice());
    }

    #[test]
    fn cleared_list_records_clear() {
        let base = TrackedList::new(vec!["a", "b"]);
        let cleared = base.with_cleared();
        assert!(cleared.is_empty());
        assert_eq!(
            cleared.changes_since(&base).to_vec(),
            vec![Change::Clear {
                elements: vec!["a", "b"]
            }]
        );
    }

    #[test]
    fn out_of_range_edits_fail() {
        let base = TrackedList::new(vec![1]);
        assert!(matches!(
            base.with_added(3, 0),
            Err(StateError::IndexOutOfBounds { index: 3, len: 1 })
        ));
        assert!(base.with_removed(1).is_err());
    }

    #[test]
    fn apply_validates_removed_values() {
        let mut target = vec![1, 2];
        let err = Change::Remove { index: 0, value: 2 }
            .apply(&mut target)
            .unwrap_err();
        assert!(matches!(err, StateError::RemovedValueMismatch { index: 0 }));
        assert_eq!(target, vec![1, 2]);
    }

    #[test]
    fn apply_validates_cleared_values() {
        let mut target = vec![1, 2];
        let err = Change::Clear {
            elements: vec![1, 3],
        }
        .apply(&mut target)
        .unwrap_err();
        assert!(matches!(
            err,
            StateError::ClearedValuesMismatch {
                expected: 2,
                len: 2
            }
        ));
        assert_eq!(target, vec![1, 2]);

        let base = TrackedList::new(vec![1, 2]);
        assert!(base
            .apply_changes(vec![Change::Clear { elements: vec![2] }])
            .is_err());
        let cleared = base
            .apply_changes(vec![Change::Clear {
                elements: vec![1, 2],
            }])
            .unwrap();
        assert!(cleared.is_empty());
    }

    #[test]
    fn apply_changes_records_history() {
        let base = TrackedList::new(vec![1, 2, 3]);
        let incoming = vec![
            Change::Remove { index: 2, value: 3 },
            Change::Add { index: 0, value: 0 },
        ];
        let patched = base.apply_changes(incoming.clone()).unwrap();
        assert_eq!(patched.as_slice(), &[0, 1, 2]);
        assert_eq!(patched.changes_since(&base).to_vec(), incoming);
    }

    #[test]
    fn equality_ignores_version() {
        let a = TrackedList::new(vec![1, 2]);
        let b: TrackedList<i32> = vec![1, 2].into_iter().collect();
        assert_ne!(a.version(), b.version());
        assert_eq!(a, b);
    }

    #[test]
    fn changes_serialize_with_an_op_tag() {
        let change = Change::Add {
            index: 2,
            value: "hat".to_string(),
        };
        let json = serde_json::to_string(&change).unwrap();
        assert_eq!(json, r#"{"op":"add","index":2,"value":"hat"}"#);
        let back: Change<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
    }
}
