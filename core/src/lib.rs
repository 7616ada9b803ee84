//! # Eddy core
//!
//! The reconciliation engine behind Eddy. Components describe what they want
//! on screen as immutable [`VNode`] trees; the engine keeps a tree of live
//! instances in step with those descriptions by diffing each new tree against
//! the previous one and applying the smallest set of changes to a [`Host`].
//!
//! Every node carries a structural hash computed at construction, so subtrees
//! that did not change are skipped without being visited. Keyed collections
//! keep item identity across reorders, and state changes are coalesced by a
//! [`Scheduler`] into one render per controller per pass.

#![allow(clippy::future_not_send)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod collection;
pub mod config;
pub mod controller;
pub(crate) mod diff;
pub mod error;
pub mod hash;
pub mod host;
pub mod live;
pub mod node;
pub mod refs;
pub mod root;
pub mod scheduler;
pub mod value;


#[doc(inline)]
pub use collection::Collection;
#[doc(inline)]
pub use config::Config;
#[doc(inline)]
pub use controller::{Component, Controller, ControllerId, RenderCx};
#[doc(inline)]
pub use error::{ReconcileError, Result};
#[doc(inline)]
pub use host::{Host, SharedHost, ViewId, share};
#[doc(inline)]
pub use live::{Live, ViewNode};
#[doc(inline)]
pub use node::{ControllerType, NodeBuilder, NodeKind, Render, VNode, ViewType};
#[doc(inline)]
pub use refs::{RefTarget, Refs};
#[doc(inline)]
pub use root::Root;
#[doc(inline)]
pub use scheduler::{DiffStats, FlushReport, Scheduler};
#[doc(inline)]
pub use value::{Callback, Key, Name, Props, State, Value};
