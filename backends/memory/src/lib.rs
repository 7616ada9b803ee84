#![allow(clippy::multiple_crate_versions)]

//! In-memory backend for Eddy.
//!
//! [`MemoryHost`] keeps a plain tree of views, records every operation the
//! reconciler issues, and flags operations that break the host contract. It
//! backs headless rendering and the engine's own tests.

pub use crate::error::Violation;
pub use crate::host::{Counters, MemoryHost, Op};
pub use crate::snapshot::{Snapshot, SnapshotLine};

mod error;
mod host;
mod snapshot;
