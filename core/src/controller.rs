//! Stateful controllers and their lifecycle.
//!
//! A controller owns a [`Component`], the node it was mounted from, its state,
//! its refs, the node its last render produced, and the live subtree built
//! from that node.
//!
//! ```text
//! Unloaded ──load()──▶ Loading? ──first render──▶ Mounted ⇄ Updating
//!                                                    │
//!                                               destroy()
//!                                                    ▼
//!                                                Destroyed
//! ```
//!
//! The first render happens synchronously on mount, whether or not loading has
//! finished. Later renders go through the [`Scheduler`].

use alloc::{boxed::Box, rc::{Rc, Weak}, vec::Vec};
use core::{
    any::Any,
    cell::{Cell, RefCell},
    fmt::{self, Debug, Display},
    sync::atomic::{AtomicU64, Ordering},
};

use futures::future::LocalBoxFuture;
use tracing::{debug, trace};

use crate::{
    diff,
    error::{ReconcileError, Result},
    host::{SharedHost, ViewId},
    live::Live,
    node::{ControllerType, Render, VNode},
    refs::{RefTarget, Refs},
    scheduler::Scheduler,
    value::{Name, Props, State, Value},
};

/// Identifier of a controller instance, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControllerId(u64);

impl ControllerId {
    /// Creates an id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Behaviour of a controller.
///
/// `render` must be a pure function of props, state, and children. Side
/// effects belong in the lifecycle hooks.
pub trait Component: Any {
    /// Builds the component from its initial props.
    fn create(props: &Props) -> Self
    where
        Self: Sized;

    /// Describes the subtree this controller should currently display.
    fn render(&self, cx: &RenderCx<'_>) -> Render;

    /// Runs once, before the first render.
    ///
    /// A returned future is polled on the scheduler's executor. The first
    /// render does not wait for it; its completion schedules one more render
    /// unless the controller has been destroyed by then.
    fn load(&mut self, controller: &Controller) -> Option<LocalBoxFuture<'static, ()>> {
        let _ = controller;
        None
    }

    /// Runs once, after the first render.
    fn mounted(&mut self, controller: &Controller) {
        let _ = controller;
    }

    /// Runs after a render that produced a different node.
    fn updated(&mut self, controller: &Controller, old: &VNode, new: &VNode) {
        let _ = (controller, old, new);
    }

    /// Runs once, when the controller is destroyed.
    fn destroyed(&mut self, controller: &Controller) {
        let _ = controller;
    }

    /// Props copied onto the component through [`Component::link_prop`].
    fn linked_props(&self) -> &'static [&'static str] {
        &[]
    }

    /// Receives the value of a linked prop on mount and whenever it changes.
    /// A prop that disappeared is passed as [`Value::Null`].
    fn link_prop(&mut self, name: &str, value: &Value) {
        let _ = (name, value);
    }
}

/// Inputs available to [`Component::render`].
#[derive(Debug)]
pub struct RenderCx<'a> {
    controller: &'a Controller,
    node: &'a VNode,
    state: &'a State,
}

impl<'a> RenderCx<'a> {
    /// Props passed by the parent.
    #[must_use]
    pub fn props(&self) -> &'a Props {
        self.node.props()
    }

    /// Shortcut for `self.props().get(name)`.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&'a Value> {
        self.node.prop(name)
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &'a State {
        self.state
    }

    /// Children the parent asked this controller to render.
    #[must_use]
    pub fn children(&self) -> &'a [Option<VNode>] {
        self.node.children()
    }

    /// Handle of the controller being rendered.
    #[must_use]
    pub const fn controller(&self) -> &'a Controller {
        self.controller
    }
}

struct Core {
    node: VNode,
    state: State,
    reference: Option<Name>,
    refs: Refs,
    rendered: Option<VNode>,
    live: Option<Live>,
    callbacks: Vec<Box<dyn FnOnce()>>,
}

struct Inner {
    id: ControllerId,
    ty: ControllerType,
    owner: Option<Weak<Inner>>,
    host: SharedHost,
    scheduler: Scheduler,
    component: RefCell<Box<dyn Component>>,
    core: RefCell<Core>,
    loaded: Cell<bool>,
    mounted: Cell<bool>,
    destroyed: Cell<bool>,
    destroy_deferred: Cell<bool>,
}

/// Shared handle to a controller instance.
#[derive(Clone)]
pub struct Controller(Rc<Inner>);

impl PartialEq for Controller {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Controller {}

impl Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("id", &self.0.id)
            .field("type", &self.0.ty.name())
            .field("mounted", &self.0.mounted.get())
            .field("destroyed", &self.0.destroyed.get())
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub(crate) fn new(
        ty: ControllerType,
        node: VNode,
        owner: Option<&Self>,
        host: SharedHost,
        scheduler: Scheduler,
    ) -> Self {
        let component = ty.instantiate(node.props());
        Self(Rc::new(Inner {
            id: ControllerId::next(),
            ty,
            owner: owner.map(|owner| Rc::downgrade(&owner.0)),
            host,
            scheduler,
            component: RefCell::new(component),
            core: RefCell::new(Core {
                node,
                state: State::new(),
                reference: None,
                refs: Refs::new(),
                rendered: None,
                live: None,
                callbacks: Vec::new(),
            }),
            loaded: Cell::new(false),
            mounted: Cell::new(false),
            destroyed: Cell::new(false),
            destroy_deferred: Cell::new(false),
        }))
    }

    /// Creates, loads, registers, and renders a controller for `node`.
    pub(crate) fn mount(owner: &Self, node: &VNode, ty: ControllerType) -> Result<Self> {
        let controller = Self::new(
            ty,
            node.clone(),
            Some(owner),
            owner.0.host.clone(),
            owner.0.scheduler.clone(),
        );
        owner.scheduler().count(|stats| stats.controllers_created += 1);
        trace!(controller = %controller.id(), ty = ty.name(), "mount controller");

        controller.begin_load();
        if let Some(name) = node.reference() {
            owner.rebind_controller_ref(&controller, Some(name));
        }
        {
            let mut component = controller.0.component.borrow_mut();
            for &name in component.linked_props() {
                if let Some(value) = node.prop(name) {
                    component.link_prop(name, value);
                }
            }
        }
        controller.finish_hook();
        if let Err(error) = controller.rerender() {
            // never handed to the owner; drop its ref and pending load
            controller.destroy();
            return Err(error);
        }
        Ok(controller)
    }

    pub(crate) fn begin_load(&self) {
        let pending = self.0.component.borrow_mut().load(self);
        self.finish_hook();
        match pending {
            Some(pending) => {
                let controller = self.clone();
                let _ = self.0.scheduler.spawn(async move {
                    pending.await;
                    if controller.is_destroyed() {
                        trace!(controller = %controller.id(), "load finished after destroy");
                        return;
                    }
                    controller.0.loaded.set(true);
                    controller.0.scheduler.enqueue(&controller);
                });
            }
            None => self.0.loaded.set(true),
        }
    }

    /// Unique id of this controller.
    #[must_use]
    pub fn id(&self) -> ControllerId {
        self.0.id
    }

    /// Controller type.
    #[must_use]
    pub fn ty(&self) -> ControllerType {
        self.0.ty
    }

    /// The controller whose render output created this one.
    #[must_use]
    pub fn owner(&self) -> Option<Self> {
        self.0.owner.as_ref()?.upgrade().map(Self)
    }

    pub(crate) fn owner_id(&self) -> Option<ControllerId> {
        self.owner().map(|owner| owner.id())
    }

    pub(crate) fn host(&self) -> &SharedHost {
        &self.0.host
    }

    /// Scheduler this controller is registered with.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.0.scheduler
    }

    /// The node this controller was last given by its owner.
    #[must_use]
    pub fn node(&self) -> VNode {
        self.0.core.borrow().node.clone()
    }

    /// Props passed by the owner.
    #[must_use]
    pub fn props(&self) -> Props {
        self.0.core.borrow().node.props().clone()
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> State {
        self.0.core.borrow().state.clone()
    }

    /// The node produced by the last completed render.
    #[must_use]
    pub fn rendered(&self) -> Option<VNode> {
        self.0.core.borrow().rendered.clone()
    }

    /// Looks up a ref registered by this controller's render output.
    #[must_use]
    pub fn find_ref(&self, name: &str) -> Option<RefTarget> {
        self.0.core.borrow().refs.get(name).cloned()
    }

    /// Number of registered refs.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.0.core.borrow().refs.len()
    }

    /// Set once loading completed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.0.loaded.get()
    }

    /// Set right before the `mounted` hook runs.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    /// Set right before the `destroyed` hook runs.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    /// Host views at the top of the rendered subtree.
    #[must_use]
    pub fn top_views(&self) -> Vec<ViewId> {
        let mut views = Vec::new();
        self.collect_top_views(&mut views);
        views
    }

    pub(crate) fn collect_top_views(&self, views: &mut Vec<ViewId>) {
        if let Some(live) = &self.0.core.borrow().live {
            live.collect_top_views(views);
        }
    }

    /// Runs `f` against the live subtree, if any.
    pub fn with_live<R>(&self, f: impl FnOnce(&Live) -> R) -> Option<R> {
        self.0.core.borrow().live.as_ref().map(f)
    }

    /// Runs `f` against the component if it is a `C`.
    pub fn with_component<C: Component, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        let component = self.0.component.borrow();
        let any: &dyn Any = &**component;
        any.downcast_ref::<C>().map(f)
    }

    /// Runs `f` against the component mutably if it is a `C`.
    ///
    /// Changes made here are not rendered until the next update.
    pub fn with_component_mut<C: Component, R>(&self, f: impl FnOnce(&mut C) -> R) -> Option<R> {
        let mut component = self.0.component.borrow_mut();
        let any: &mut dyn Any = &mut **component;
        any.downcast_mut::<C>().map(f)
    }

    /// Merges `partial` into the state and requests a batched re-render.
    ///
    /// Only entries whose value hash differs from the stored one are applied.
    /// An empty `partial` forces a re-render. If nothing changed, no render is
    /// requested.
    pub fn update(&self, partial: impl Into<State>) {
        self.update_inner(partial.into(), None);
    }

    /// Like [`Controller::update`]; `callback` runs after the resulting
    /// render completes, or immediately if nothing changed.
    pub fn update_with(&self, partial: impl Into<State>, callback: impl FnOnce() + 'static) {
        self.update_inner(partial.into(), Some(Box::new(callback)));
    }

    /// Requests a re-render without touching the state.
    pub fn refresh(&self) {
        self.update_inner(State::new(), None);
    }

    fn update_inner(&self, partial: State, callback: Option<Box<dyn FnOnce()>>) {
        if self.is_destroyed() {
            return;
        }
        let (changed, callback) = {
            let mut core = self.0.core.borrow_mut();
            let mut changed = partial.is_empty();
            for (name, value) in partial.iter() {
                let current = core.state.get(name).map(|value| Props::entry_hash(name, value));
                if current != Some(Props::entry_hash(name, value)) {
                    core.state.insert(Name::Owned(name.into()), value.clone());
                    changed = true;
                }
            }
            let callback = match callback {
                Some(callback) if changed => {
                    core.callbacks.push(callback);
                    None
                }
                other => other,
            };
            (changed, callback)
        };

        if let Some(callback) = callback {
            callback();
        }
        if changed && self.is_mounted() {
            self.0.scheduler.enqueue(self);
        }
    }

    /// Renders and reconciles the controller right away.
    pub(crate) fn rerender(&self) -> Result<()> {
        if self.is_destroyed() {
            return Ok(());
        }
        self.0.scheduler.forget(self.id());

        let (node, state) = {
            let core = self.0.core.borrow();
            (core.node.clone(), core.state.clone())
        };
        let rendered = {
            let component = self.0.component.borrow();
            let cx = RenderCx {
                controller: self,
                node: &node,
                state: &state,
            };
            component.render(&cx).into_node()
        };
        self.0.scheduler.count(|stats| stats.renders += 1);
        self.finish_hook();
        if self.is_destroyed() {
            return Ok(());
        }

        if let Some(key) = rendered.duplicate_key() {
            return Err(ReconcileError::DuplicateKey { key: key.clone() });
        }

        let previous = self.0.core.borrow().rendered.clone();
        match previous {
            Some(previous) => {
                if diff::needs_diff(self, &previous, &rendered) {
                    let mut live = self
                        .0
                        .core
                        .borrow_mut()
                        .live
                        .take()
                        .ok_or(ReconcileError::MissingLive(self.id()))?;
                    let result = diff::diff(self, &rendered, &previous, &mut live);
                    if self.is_destroyed() {
                        live.destroy(self);
                        return result;
                    }
                    let mut core = self.0.core.borrow_mut();
                    core.live = Some(live);
                    result?;
                    core.rendered = Some(rendered.clone());
                    drop(core);
                    self.0
                        .component
                        .borrow_mut()
                        .updated(self, &previous, &rendered);
                    self.finish_hook();
                }
            }
            None => {
                let live = diff::mount(self, &rendered)?;
                if self.is_destroyed() {
                    live.destroy(self);
                    return Ok(());
                }
                let mut core = self.0.core.borrow_mut();
                core.live = Some(live);
                core.rendered = Some(rendered);
            }
        }

        if self.is_destroyed() {
            return Ok(());
        }
        if !self.0.mounted.replace(true) {
            debug!(controller = %self.id(), ty = self.0.ty.name(), "mounted");
            self.0.component.borrow_mut().mounted(self);
            self.finish_hook();
        }

        let callbacks = core::mem::take(&mut self.0.core.borrow_mut().callbacks);
        for callback in callbacks {
            callback();
        }
        Ok(())
    }

    /// Replaces the node this controller renders from.
    pub(crate) fn receive(&self, node: VNode) {
        self.0.core.borrow_mut().node = node;
    }

    pub(crate) fn link_changed_props(&self, new: &VNode, old: &VNode) {
        let mut component = self.0.component.borrow_mut();
        for &name in component.linked_props() {
            let hash = new.prop_hash(name);
            if hash != old.prop_hash(name) {
                let value = new.prop(name).cloned().unwrap_or_default();
                component.link_prop(name, &value);
            }
        }
        drop(component);
        self.finish_hook();
    }

    pub(crate) fn bind_ref(&self, name: Name, target: RefTarget) {
        self.0.core.borrow_mut().refs.bind(name, target);
    }

    pub(crate) fn unbind_ref(&self, name: &str, target: &RefTarget) {
        self.0.core.borrow_mut().refs.unbind(name, target);
    }

    pub(crate) fn rebind_ref(&self, current: &mut Option<Name>, next: Option<&Name>, target: &RefTarget) {
        self.0.core.borrow_mut().refs.rebind(current, next, target);
    }

    /// Moves `child`'s registration in this controller's refs to `next`.
    pub(crate) fn rebind_controller_ref(&self, child: &Self, next: Option<&Name>) {
        let mut current = child.0.core.borrow_mut().reference.take();
        self.rebind_ref(&mut current, next, &RefTarget::Controller(child.clone()));
        child.0.core.borrow_mut().reference = current;
    }

    /// Destroys the controller and its live subtree.
    ///
    /// Only the first call has an effect: it runs the `destroyed` hook,
    /// removes the controller's ref from its owner, and destroys the subtree.
    /// Called from one of the controller's own hooks, the `destroyed` hook
    /// runs once that hook returns.
    pub fn destroy(&self) {
        if self.0.destroyed.replace(true) {
            return;
        }
        self.0.scheduler.forget(self.id());
        self.0.scheduler.count(|stats| stats.controllers_destroyed += 1);
        debug!(controller = %self.id(), ty = self.0.ty.name(), "destroy");

        match self.0.component.try_borrow_mut() {
            Ok(mut component) => component.destroyed(self),
            Err(_) => {
                trace!(controller = %self.id(), "destroyed from its own hook; deferring the hook");
                self.0.destroy_deferred.set(true);
            }
        }

        let reference = self.0.core.borrow_mut().reference.take();
        if let (Some(name), Some(owner)) = (reference, self.owner()) {
            owner.unbind_ref(&name, &RefTarget::Controller(self.clone()));
        }

        let live = self.0.core.borrow_mut().live.take();
        if let Some(live) = live {
            live.destroy(self);
        }

        let mut core = self.0.core.borrow_mut();
        core.refs.clear();
        core.callbacks.clear();
    }

    /// Runs a `destroyed` hook deferred because the component was borrowed.
    /// Call once the component borrow of a hook is released.
    fn finish_hook(&self) {
        if self.0.destroy_deferred.replace(false) {
            self.0.component.borrow_mut().destroyed(self);
        }
    }
}
