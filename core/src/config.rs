//! Reconciler configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tunables of the diff engine.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct Config {
    /// Log a warning the first time a collection item has no declared key.
    pub warn_unkeyed: bool,
    /// Compare hash-equal nodes structurally before skipping them.
    pub verify_equal: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            warn_unkeyed: true,
            verify_equal: false,
        }
    }
}
