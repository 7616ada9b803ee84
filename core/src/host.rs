//! The contract between the reconciler and the backend that owns real views.
//!
//! The engine never lays out, paints, or interprets property values. It only
//! asks the host to create, place, update, and destroy views identified by
//! [`ViewId`].

use alloc::rc::Rc;
use core::{
    cell::RefCell,
    fmt::{self, Display},
};

use crate::{node::ViewType, value::Value};

/// Identifier of a host view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    /// Creates a [`ViewId`] from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value backing this identifier.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Live-primitive operations a backend provides.
///
/// Placing a view that is already attached somewhere moves it.
pub trait Host {
    /// Constructs a detached view of the given type.
    fn create_view(&mut self, ty: ViewType) -> ViewId;

    /// Writes a single property onto a view.
    fn set_property(&mut self, view: ViewId, name: &str, value: &Value);

    /// Appends `child` as the last child of `parent`.
    fn append_child(&mut self, parent: ViewId, child: ViewId);

    /// Places `child` right after its sibling `prev`.
    fn insert_after(&mut self, prev: ViewId, child: ViewId);

    /// Places `child` right before its sibling `next`.
    fn insert_before(&mut self, next: ViewId, child: ViewId);

    /// Detaches a view from its parent without destroying it.
    fn remove_from_parent(&mut self, view: ViewId);

    /// Detaches and releases a view.
    fn destroy_view(&mut self, view: ViewId);
}

/// Host handle threaded through every mount and diff.
pub type SharedHost = Rc<RefCell<dyn Host>>;

/// Wraps a host into a [`SharedHost`].
pub fn share<H: Host + 'static>(host: H) -> (Rc<RefCell<H>>, SharedHost) {
    let typed = Rc::new(RefCell::new(host));
    let shared: SharedHost = typed.clone();
    (typed, shared)
}
