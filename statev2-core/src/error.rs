//! Error types for the reactive state crate.
//!
//! Misuse of the graph itself (disposing an effect that still has
//! dependents, a memo that reads itself) is a programmer error and panics.
//! The errors here cover the recoverable surface: replaying list changes
//! received from elsewhere and loading configuration.

use thiserror::Error;

/// Errors produced by collection replay and configuration loading.
#[derive(Debug, Error)]
pub enum StateError {
    /// A change or list operation referenced an index past the end of the list.
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the list at the time of the operation.
        len: usize,
    },

    /// A `Remove` change did not match the element found at its index.
    #[error("removed element at index {index} does not match the recorded value")]
    RemovedValueMismatch {
        /// Index of the mismatching element.
        index: usize,
    },

    /// A `Clear` change did not list the elements of the target list.
    #[error("cleared elements ({expected}) do not match the list of length {len}")]
    ClearedValuesMismatch {
        /// Number of elements the change recorded.
        expected: usize,
        /// Length of the list it was applied to.
        len: usize,
    },

    /// The runtime configuration document could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StateError>;
