//! Collections
//!
//! Versioned lists that report their own changes, and the states that hold
//! them.

mod list_state;
mod tracked_list;

pub use list_state::{ListState, SetState};
pub use tracked_list::{estimate, Change, ChangeSet, Changes, Estimate, TrackedList};
