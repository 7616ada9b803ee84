use thiserror::Error;

use eddy_core::ReconcileError;

/// Errors surfaced by the [`App`](crate::App) runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// A render pass was aborted.
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    /// Settings could not be parsed.
    #[error("invalid settings: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result alias for the runtime.
pub type Result<T, E = Error> = core::result::Result<T, E>;
