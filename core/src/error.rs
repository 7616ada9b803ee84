//! Error types raised by the reconciler.
//!
//! Every variant is a structural error: it aborts the render pass that raised
//! it. Mutations are applied node by node, so a subtree may be left partially
//! updated when an error surfaces mid-diff.

use thiserror::Error;

use crate::{controller::ControllerId, value::Key};

/// Errors produced while mounting or diffing a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// Two items of one keyed collection resolved to the same key.
    #[error("duplicate key `{key}` in keyed collection")]
    DuplicateKey {
        /// The offending key.
        key: Key,
    },
    /// A live instance was diffed by a controller other than the one that created it.
    #[error("live instance is owned by controller {found}, but was diffed by controller {expected}")]
    OwnerMismatch {
        /// The controller driving the diff.
        expected: ControllerId,
        /// The owner recorded on the live instance.
        found: ControllerId,
    },
    /// A controller has no live subtree although it has rendered before.
    #[error("controller {0} has a rendered node but no live subtree")]
    MissingLive(ControllerId),
    /// The controller was destroyed before the operation could run.
    #[error("controller {0} has been destroyed")]
    Destroyed(ControllerId),
}

/// Result alias used across the reconciler.
pub type Result<T, E = ReconcileError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_key_display() {
        let error = ReconcileError::DuplicateKey {
            key: Key::from("x"),
        };
        assert_eq!(error.to_string(), "duplicate key `x` in keyed collection");
    }

    #[test]
    fn owner_mismatch_display() {
        let error = ReconcileError::OwnerMismatch {
            expected: ControllerId::new(1),
            found: ControllerId::new(2),
        };
        assert_eq!(
            error.to_string(),
            "live instance is owned by controller #2, but was diffed by controller #1"
        );
    }
}
