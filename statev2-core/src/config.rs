//! Runtime Configuration
//!
//! Tunables for a reactive runtime. Hosts usually keep these in their own
//! settings file and hand the JSON fragment to [`RuntimeConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Configuration for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of pending stale-dependent notifications that must pile up
    /// before the next edge insertion purges dead entries.
    ///
    /// A value of `1` purges on the first insertion after any drop.
    pub stale_purge_threshold: usize,

    /// Maximum number of effect updates a single flush may process.
    ///
    /// Exceeding it means effects keep re-triggering each other; the flush
    /// panics instead of spinning forever.
    pub max_effects_per_flush: usize,
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stale_purge_threshold: 16,
            max_effects_per_flush: 100_000,
        }
    }
}
