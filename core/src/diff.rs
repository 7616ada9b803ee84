//! Mounting and diffing.
//!
//! [`diff`] moves a live instance from representing an old node to
//! representing a new one with as few host mutations as possible:
//!
//! - a different component identity replaces the instance outright;
//! - a controller receives the new props and children and re-renders;
//! - a view gets exactly the properties whose hash changed written, then its
//!   children are diffed by position.
//!
//! Subtrees whose hashes are equal are skipped without being visited.

use alloc::vec::Vec;
use core::mem;

use tracing::trace;

use crate::{
    collection,
    controller::Controller,
    error::{ReconcileError, Result},
    host::ViewId,
    live::{Live, ViewNode},
    node::{NodeKind, VNode, ViewType},
    refs::RefTarget,
    value::Value,
};

/// Returns `true` if moving from `old` to `new` requires any work.
pub(crate) fn needs_diff(owner: &Controller, old: &VNode, new: &VNode) -> bool {
    if old.hash() != new.hash() {
        return true;
    }
    owner.scheduler().config().verify_equal && !old.content_eq(new)
}

/// Builds a fresh live instance for `node`. The result is detached.
pub(crate) fn mount(owner: &Controller, node: &VNode) -> Result<Live> {
    match node.kind() {
        NodeKind::View(ty) => mount_view(owner, node, *ty).map(Live::View),
        NodeKind::Controller(ty) => Controller::mount(owner, node, *ty).map(Live::Controller),
        NodeKind::Collection => collection::mount(owner, node).map(Live::Collection),
    }
}

fn mount_view(owner: &Controller, node: &VNode, ty: ViewType) -> Result<ViewNode> {
    let id = owner.host().borrow_mut().create_view(ty);
    owner.scheduler().count(|stats| stats.views_created += 1);
    trace!(view = %id, %ty, "mount view");

    for (name, value, _) in node.props_with_hashes() {
        write_property(owner, id, name, value);
    }

    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        let live = match child {
            Some(child) => {
                let live = mount(owner, child)?;
                live.append_to(owner, id);
                Some(live)
            }
            None => None,
        };
        children.push(live);
    }

    if let Some(name) = node.reference() {
        owner.bind_ref(name.clone(), RefTarget::View(id));
    }

    Ok(ViewNode {
        id,
        ty,
        reference: node.reference().cloned(),
        owner: owner.id(),
        children,
    })
}

fn write_property(owner: &Controller, view: ViewId, name: &str, value: &Value) {
    owner.host().borrow_mut().set_property(view, name, value);
    owner.scheduler().count(|stats| stats.property_writes += 1);
}

/// Reconciles `live`, which currently represents `old`, with `new`.
///
/// # Errors
///
/// Fails on ownership mismatches and duplicate collection keys. Work done
/// before the failure is not rolled back.
pub(crate) fn diff(owner: &Controller, new: &VNode, old: &VNode, live: &mut Live) -> Result<()> {
    let same_shape = matches!(
        (&*live, new.kind()),
        (Live::View(_), NodeKind::View(_))
            | (Live::Controller(_), NodeKind::Controller(_))
            | (Live::Collection(_), NodeKind::Collection)
    );
    if new.kind() != old.kind() || !same_shape {
        return replace(owner, new, live);
    }
    match live {
        Live::Controller(controller) => diff_controller(owner, new, old, controller),
        Live::View(view) => diff_view(owner, new, old, view),
        Live::Collection(items) => collection::diff(owner, new, items),
    }
}

/// Mounts `new` next to `live`, then destroys the old instance.
fn replace(owner: &Controller, new: &VNode, live: &mut Live) -> Result<()> {
    trace!(kind = %new.kind(), "replace instance");
    let fresh = mount(owner, new)?;
    if let Some(anchor) = live.last_view() {
        fresh.insert_after(owner, anchor);
    }
    mem::replace(live, fresh).destroy(owner);
    Ok(())
}

fn diff_controller(
    owner: &Controller,
    new: &VNode,
    old: &VNode,
    controller: &Controller,
) -> Result<()> {
    let found = controller.owner_id();
    if found != Some(owner.id()) {
        return Err(ReconcileError::OwnerMismatch {
            expected: owner.id(),
            found: found.unwrap_or_else(|| controller.id()),
        });
    }
    controller.receive(new.clone());
    owner.rebind_controller_ref(controller, new.reference());
    controller.link_changed_props(new, old);
    controller.rerender()
}

fn diff_view(owner: &Controller, new: &VNode, old: &VNode, view: &mut ViewNode) -> Result<()> {
    if view.owner != owner.id() {
        return Err(ReconcileError::OwnerMismatch {
            expected: owner.id(),
            found: view.owner,
        });
    }

    owner.rebind_ref(
        &mut view.reference,
        new.reference(),
        &RefTarget::View(view.id),
    );

    if new.props_hash() != old.props_hash() {
        for (name, value, hash) in new.props_with_hashes() {
            if old.prop_hash(name) != Some(hash) {
                write_property(owner, view.id, name, value);
            }
        }
        for (name, _) in old.props().iter() {
            if !new.props().contains(name) {
                write_property(owner, view.id, name, &Value::Null);
            }
        }
    }

    diff_children(owner, new, old, view)
}

fn diff_children(owner: &Controller, new: &VNode, old: &VNode, view: &mut ViewNode) -> Result<()> {
    let (old_children, new_children) = (old.children(), new.children());
    let len = old_children.len().max(new_children.len());
    if view.children.len() < len {
        view.children.resize_with(len, || None);
    }

    let mut prev: Option<ViewId> = None;
    for index in 0..len {
        let old_child = old_children.get(index).and_then(Option::as_ref);
        let new_child = new_children.get(index).and_then(Option::as_ref);

        match (old_child, new_child, view.children[index].take()) {
            (Some(old_child), Some(new_child), Some(mut live)) => {
                let result = if needs_diff(owner, old_child, new_child) {
                    diff(owner, new_child, old_child, &mut live)
                } else {
                    Ok(())
                };
                prev = live.last_view().or(prev);
                view.children[index] = Some(live);
                result?;
            }
            (_, None, Some(live)) => live.destroy(owner),
            (_, Some(new_child), slot) => {
                if let Some(stale) = slot {
                    stale.destroy(owner);
                }
                let live = mount(owner, new_child)?;
                place(owner, view, index, prev, &live);
                prev = live.last_view().or(prev);
                view.children[index] = Some(live);
            }
            (_, None, None) => {}
        }
    }

    view.children.truncate(new_children.len());
    Ok(())
}

/// Places a freshly mounted child of `view` at slot `index`.
fn place(owner: &Controller, view: &ViewNode, index: usize, prev: Option<ViewId>, live: &Live) {
    if let Some(prev) = prev {
        live.insert_after(owner, prev);
        return;
    }
    let next = view.children[index + 1..]
        .iter()
        .flatten()
        .find_map(Live::first_view);
    match next {
        Some(next) => live.insert_before(owner, next),
        None => live.append_to(owner, view.id),
    }
}
