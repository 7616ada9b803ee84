//! Per-controller ref registry.
//!
//! Nodes may declare a ref name. When such a node is mounted, the live
//! instance is registered in the refs of the controller that rendered it. The
//! entry is moved when a later render changes the name and removed when the
//! instance is destroyed. Removal only happens while the entry still points at
//! that instance, so a newer binding under the same name survives.

use std::collections::HashMap;

use crate::{controller::Controller, host::ViewId, value::Name};

/// Target of a ref.
#[derive(Debug, Clone)]
pub enum RefTarget {
    /// A primitive host view.
    View(ViewId),
    /// A controller instance.
    Controller(Controller),
}

impl RefTarget {
    /// Returns the view id, if this ref points at a view.
    #[must_use]
    pub const fn as_view(&self) -> Option<ViewId> {
        match self {
            Self::View(id) => Some(*id),
            Self::Controller(_) => None,
        }
    }

    /// Returns the controller, if this ref points at one.
    #[must_use]
    pub const fn as_controller(&self) -> Option<&Controller> {
        match self {
            Self::Controller(controller) => Some(controller),
            Self::View(_) => None,
        }
    }

    /// Returns `true` if both targets denote the same live instance.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::View(a), Self::View(b)) => a == b,
            (Self::Controller(a), Self::Controller(b)) => a == b,
            _ => false,
        }
    }
}

/// Map from ref name to live instance, owned by one controller.
#[derive(Debug, Default)]
pub struct Refs {
    entries: HashMap<Name, RefTarget>,
}

impl Refs {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a ref.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RefTarget> {
        self.entries.get(name)
    }

    /// Registers `target` under `name`, replacing any previous entry.
    pub fn bind(&mut self, name: Name, target: RefTarget) {
        self.entries.insert(name, target);
    }

    /// Removes `name` if it still points at `target`.
    pub fn unbind(&mut self, name: &str, target: &RefTarget) -> bool {
        if self.entries.get(name).is_some_and(|bound| bound.same(target)) {
            self.entries.remove(name);
            return true;
        }
        false
    }

    /// Moves `target` from `current` to `next`, updating `current` in place.
    pub fn rebind(&mut self, current: &mut Option<Name>, next: Option<&Name>, target: &RefTarget) {
        if current.as_ref() == next {
            return;
        }
        if let Some(name) = current.take() {
            self.unbind(&name, target);
        }
        if let Some(name) = next {
            self.bind(name.clone(), target.clone());
            *current = Some(name.clone());
        }
    }

    /// Number of registered refs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no ref is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|name| &**name)
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}
