//! Live instances: the mutable counterpart of virtual nodes.
//!
//! Every live instance corresponds to exactly one current [`VNode`](crate::VNode).
//! It is created once on mount, mutated in place by diffs, and destroyed once.

use alloc::vec::Vec;

use tracing::trace;

use crate::{
    collection::Collection,
    controller::{Controller, ControllerId},
    host::ViewId,
    node::ViewType,
    refs::RefTarget,
    value::Name,
};

/// A mounted primitive view and its positionally aligned children.
#[derive(Debug)]
pub struct ViewNode {
    pub(crate) id: ViewId,
    pub(crate) ty: ViewType,
    pub(crate) reference: Option<Name>,
    pub(crate) owner: ControllerId,
    pub(crate) children: Vec<Option<Live>>,
}

impl ViewNode {
    /// Host id of this view.
    #[must_use]
    pub const fn id(&self) -> ViewId {
        self.id
    }

    /// Type of this view.
    #[must_use]
    pub const fn ty(&self) -> ViewType {
        self.ty
    }

    /// Controller whose render output created this view.
    #[must_use]
    pub const fn owner(&self) -> ControllerId {
        self.owner
    }

    /// Child slots, aligned with the children of the current node.
    #[must_use]
    pub fn children(&self) -> &[Option<Live>] {
        &self.children
    }
}

/// A mounted instance.
#[derive(Debug)]
pub enum Live {
    /// A primitive view.
    View(ViewNode),
    /// A controller.
    Controller(Controller),
    /// A keyed collection.
    Collection(Collection),
}

impl Live {
    /// Host views at the top of this instance, in order.
    ///
    /// A view is its own top view; controllers and collections may span
    /// several sibling views.
    #[must_use]
    pub fn top_views(&self) -> Vec<ViewId> {
        let mut views = Vec::new();
        self.collect_top_views(&mut views);
        views
    }

    pub(crate) fn collect_top_views(&self, views: &mut Vec<ViewId>) {
        match self {
            Self::View(view) => views.push(view.id),
            Self::Controller(controller) => controller.collect_top_views(views),
            Self::Collection(collection) => {
                for live in collection.lives() {
                    live.collect_top_views(views);
                }
            }
        }
    }

    /// First top view.
    #[must_use]
    pub fn first_view(&self) -> Option<ViewId> {
        match self {
            Self::View(view) => Some(view.id),
            _ => self.top_views().first().copied(),
        }
    }

    /// Last top view.
    #[must_use]
    pub fn last_view(&self) -> Option<ViewId> {
        match self {
            Self::View(view) => Some(view.id),
            _ => self.top_views().last().copied(),
        }
    }

    /// Returns the controller, if this is one.
    #[must_use]
    pub const fn as_controller(&self) -> Option<&Controller> {
        match self {
            Self::Controller(controller) => Some(controller),
            _ => None,
        }
    }

    /// Returns the view node, if this is one.
    #[must_use]
    pub const fn as_view(&self) -> Option<&ViewNode> {
        match self {
            Self::View(view) => Some(view),
            _ => None,
        }
    }

    /// Returns the collection, if this is one.
    #[must_use]
    pub const fn as_collection(&self) -> Option<&Collection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Appends every top view to `parent`.
    pub(crate) fn append_to(&self, owner: &Controller, parent: ViewId) {
        let host = owner.host();
        for view in self.top_views() {
            host.borrow_mut().append_child(parent, view);
        }
    }

    /// Places the top views right after `prev`, returning the new last view.
    pub(crate) fn insert_after(&self, owner: &Controller, prev: ViewId) -> ViewId {
        let host = owner.host();
        let mut prev = prev;
        for view in self.top_views() {
            host.borrow_mut().insert_after(prev, view);
            owner.scheduler().count(|stats| stats.moves += 1);
            prev = view;
        }
        prev
    }

    /// Places the top views right before `next`.
    pub(crate) fn insert_before(&self, owner: &Controller, next: ViewId) {
        let host = owner.host();
        for view in self.top_views() {
            host.borrow_mut().insert_before(next, view);
            owner.scheduler().count(|stats| stats.moves += 1);
        }
    }

    /// Destroys this instance and its whole subtree.
    ///
    /// `owner` is the controller whose refs hold this instance's ref. Children
    /// finish their own cleanup before this call returns.
    pub(crate) fn destroy(self, owner: &Controller) {
        match self {
            Self::View(view) => {
                if let Some(name) = &view.reference {
                    owner.unbind_ref(name, &RefTarget::View(view.id));
                }
                for child in view.children.into_iter().flatten() {
                    child.destroy(owner);
                }
                trace!(view = %view.id, ty = %view.ty, "destroy view");
                owner.host().borrow_mut().destroy_view(view.id);
                owner.scheduler().count(|stats| stats.views_destroyed += 1);
            }
            Self::Controller(controller) => controller.destroy(),
            Self::Collection(collection) => collection.destroy(owner),
        }
    }
}
