//! Top-level mounting point.

use tracing::debug;

use crate::{
    controller::{Component, Controller, RenderCx},
    error::{ReconcileError, Result},
    host::{SharedHost, ViewId},
    node::{ControllerType, Render, VNode},
    refs::RefTarget,
    scheduler::Scheduler,
    value::Props,
};

/// Renders the first child it was given.
struct Outlet;

impl Component for Outlet {
    fn create(_props: &Props) -> Self {
        Self
    }

    fn render(&self, cx: &RenderCx<'_>) -> Render {
        cx.children().iter().flatten().next().cloned().into()
    }
}

/// Owner of a whole tree, attached to a host container view.
///
/// Nodes passed to [`Root::render`] are owned by the root controller, so refs
/// they declare are found through [`Root::find_ref`].
#[derive(Debug)]
pub struct Root {
    controller: Controller,
    container: ViewId,
}

impl Root {
    /// Creates an empty root attached to `container`.
    #[must_use]
    pub fn new(host: SharedHost, scheduler: Scheduler, container: ViewId) -> Self {
        let node = VNode::controller::<Outlet>().build();
        scheduler.count(|stats| stats.controllers_created += 1);
        let controller = Controller::new(ControllerType::of::<Outlet>(), node, None, host, scheduler);
        controller.begin_load();
        Self {
            controller,
            container,
        }
    }

    /// Reconciles the tree with `node`.
    ///
    /// The first call mounts the tree and appends it to the container; later
    /// calls diff against the previous node.
    ///
    /// # Errors
    ///
    /// Returns the structural error that aborted the pass, or
    /// [`ReconcileError::Destroyed`] after [`Root::unmount`].
    pub fn render(&self, node: impl Into<Render>) -> Result<()> {
        if self.controller.is_destroyed() {
            return Err(ReconcileError::Destroyed(self.controller.id()));
        }
        let slot = VNode::controller::<Outlet>()
            .maybe_child(node.into().into_child())
            .build();
        self.controller.receive(slot);

        let first = self.controller.rendered().is_none();
        self.controller.rerender()?;
        if first && self.controller.rendered().is_some() {
            debug!(container = %self.container, "attach root");
            let mut host = self.controller.host().borrow_mut();
            for view in self.controller.top_views() {
                host.append_child(self.container, view);
            }
        }
        Ok(())
    }

    /// The root controller.
    #[must_use]
    pub const fn controller(&self) -> &Controller {
        &self.controller
    }

    /// Host view the tree is attached to.
    #[must_use]
    pub const fn container(&self) -> ViewId {
        self.container
    }

    /// Looks up a ref declared by a node passed to [`Root::render`].
    #[must_use]
    pub fn find_ref(&self, name: &str) -> Option<RefTarget> {
        self.controller.find_ref(name)
    }

    /// Destroys the whole tree.
    pub fn unmount(&self) {
        self.controller.destroy();
    }
}
