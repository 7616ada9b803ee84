use std::collections::BTreeMap;

use eddy_core::{Host, Props, Value, ViewId, ViewType};
use tracing::{trace, warn};

use crate::{error::Violation, snapshot::Snapshot};

/// An operation received from the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `create_view`
    Create {
        /// The new view.
        view: ViewId,
        /// Its type.
        ty: ViewType,
    },
    /// `set_property`
    Set {
        /// Target view.
        view: ViewId,
        /// Property name.
        name: String,
        /// Written value.
        value: Value,
    },
    /// `append_child`
    Append {
        /// New parent.
        parent: ViewId,
        /// Placed view.
        child: ViewId,
    },
    /// `insert_after`
    InsertAfter {
        /// Sibling the view lands after.
        prev: ViewId,
        /// Placed view.
        child: ViewId,
    },
    /// `insert_before`
    InsertBefore {
        /// Sibling the view lands before.
        next: ViewId,
        /// Placed view.
        child: ViewId,
    },
    /// `remove_from_parent`
    Remove {
        /// Detached view.
        view: ViewId,
    },
    /// `destroy_view`
    Destroy {
        /// Released view.
        view: ViewId,
    },
}

/// Running totals of host operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Views created.
    pub created: usize,
    /// Views destroyed.
    pub destroyed: usize,
    /// Property writes.
    pub writes: usize,
    /// Appends and sibling-relative inserts.
    pub placements: usize,
}

#[derive(Debug)]
struct Slot {
    ty: ViewType,
    props: Props,
    parent: Option<ViewId>,
    children: Vec<ViewId>,
}

impl Slot {
    const fn new(ty: ViewType) -> Self {
        Self {
            ty,
            props: Props::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A host that keeps its views in memory.
///
/// The host starts with one container view of type `root`, the usual target
/// for [`eddy_core::Root`].
#[derive(Debug)]
pub struct MemoryHost {
    next: u64,
    container: ViewId,
    views: BTreeMap<ViewId, Slot>,
    log: Vec<Op>,
    recording: bool,
    counters: Counters,
    violations: Vec<Violation>,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Type of the container view.
    pub const ROOT: ViewType = ViewType::new("root");

    /// Creates a host holding just its container.
    #[must_use]
    pub fn new() -> Self {
        let container = ViewId::new(0);
        let mut views = BTreeMap::new();
        views.insert(container, Slot::new(Self::ROOT));
        Self {
            next: 1,
            container,
            views,
            log: Vec::new(),
            recording: true,
            counters: Counters::default(),
            violations: Vec::new(),
        }
    }

    /// The container view created with the host.
    #[must_use]
    pub const fn container(&self) -> ViewId {
        self.container
    }

    /// Returns `true` while `view` exists.
    #[must_use]
    pub fn contains(&self, view: ViewId) -> bool {
        self.views.contains_key(&view)
    }

    /// Number of existing views, the container included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.views.len()
    }

    /// Returns `true` if only the container is left.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.views.len() <= 1
    }

    /// Type of `view`.
    #[must_use]
    pub fn ty(&self, view: ViewId) -> Option<ViewType> {
        self.views.get(&view).map(|slot| slot.ty)
    }

    /// Parent of `view`, if attached.
    #[must_use]
    pub fn parent(&self, view: ViewId) -> Option<ViewId> {
        self.views.get(&view)?.parent
    }

    /// Ordered children of `view`.
    #[must_use]
    pub fn children(&self, view: ViewId) -> &[ViewId] {
        self.views
            .get(&view)
            .map_or(&[], |slot| slot.children.as_slice())
    }

    /// Properties written onto `view`.
    #[must_use]
    pub fn props(&self, view: ViewId) -> Option<&Props> {
        self.views.get(&view).map(|slot| &slot.props)
    }

    /// Current value of one property of `view`.
    #[must_use]
    pub fn prop(&self, view: ViewId, name: &str) -> Option<&Value> {
        self.views.get(&view)?.props.get(name)
    }

    /// Concatenated `value` properties of every label under `view`, in tree
    /// order.
    #[must_use]
    pub fn text(&self, view: ViewId) -> String {
        let mut text = String::new();
        self.collect_text(view, &mut text);
        text
    }

    fn collect_text(&self, view: ViewId, text: &mut String) {
        let Some(slot) = self.views.get(&view) else {
            return;
        };
        if slot.ty == ViewType::LABEL
            && let Some(value) = slot.props.get("value").and_then(Value::as_str)
        {
            text.push_str(value);
        }
        for &child in &slot.children {
            self.collect_text(child, text);
        }
    }

    /// `value` property of each direct child of `view` that has one.
    #[must_use]
    pub fn labels(&self, view: ViewId) -> Vec<String> {
        self.children(view)
            .iter()
            .filter_map(|&child| self.prop(child, "value")?.as_str().map(String::from))
            .collect()
    }

    /// Operations recorded so far.
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.log
    }

    /// Takes the recorded operations, leaving the log empty.
    pub fn take_ops(&mut self) -> Vec<Op> {
        core::mem::take(&mut self.log)
    }

    /// Stops or resumes recording operations. Counters keep running.
    pub const fn set_recording(&mut self, recording: bool) {
        self.recording = recording;
    }

    /// Running operation totals.
    #[must_use]
    pub const fn counters(&self) -> Counters {
        self.counters
    }

    /// Contract violations seen so far.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Renders the tree under the container.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot_of(self.container)
    }

    /// Renders the tree under `view`.
    #[must_use]
    pub fn snapshot_of(&self, view: ViewId) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for &child in self.children(view) {
            self.write_snapshot(&mut snapshot, child, 0);
        }
        snapshot
    }

    fn write_snapshot(&self, snapshot: &mut Snapshot, view: ViewId, depth: usize) {
        let Some(slot) = self.views.get(&view) else {
            return;
        };
        snapshot.push(depth, view, slot.ty, &slot.props);
        for &child in &slot.children {
            self.write_snapshot(snapshot, child, depth + 1);
        }
    }

    fn record(&mut self, op: Op) {
        trace!(?op, "host op");
        if self.recording {
            self.log.push(op);
        }
    }

    fn violate(&mut self, violation: Violation) {
        warn!(%violation, "host contract violation");
        self.violations.push(violation);
    }

    fn check(&mut self, op: &'static str, view: ViewId) -> bool {
        if self.views.contains_key(&view) {
            return true;
        }
        self.violate(Violation::UnknownView { op, view });
        false
    }

    fn is_ancestor(&self, ancestor: ViewId, mut view: ViewId) -> bool {
        loop {
            if view == ancestor {
                return true;
            }
            match self.parent(view) {
                Some(parent) => view = parent,
                None => return false,
            }
        }
    }

    fn detach(&mut self, view: ViewId) {
        let parent = self.views.get_mut(&view).and_then(|slot| slot.parent.take());
        if let Some(parent) = parent
            && let Some(slot) = self.views.get_mut(&parent)
        {
            slot.children.retain(|&child| child != view);
        }
    }

    fn attach(&mut self, parent: ViewId, child: ViewId, position: Option<usize>) {
        if self.is_ancestor(child, parent) {
            self.violate(Violation::Cycle { parent, child });
            return;
        }
        self.detach(child);
        if let Some(slot) = self.views.get_mut(&parent) {
            let position = position.map_or(slot.children.len(), |position| {
                position.min(slot.children.len())
            });
            slot.children.insert(position, child);
        }
        if let Some(slot) = self.views.get_mut(&child) {
            slot.parent = Some(parent);
        }
        self.counters.placements += 1;
    }

    fn insert_next_to(&mut self, op: &'static str, anchor: ViewId, child: ViewId, after: bool) {
        if !(self.check(op, anchor) && self.check(op, child)) || anchor == child {
            return;
        }
        let Some(parent) = self.parent(anchor) else {
            self.violate(Violation::DetachedAnchor { anchor });
            return;
        };
        self.detach(child);
        let index = self
            .children(parent)
            .iter()
            .position(|&sibling| sibling == anchor)
            .unwrap_or_default();
        self.attach(parent, child, Some(index + usize::from(after)));
    }
}

impl Host for MemoryHost {
    fn create_view(&mut self, ty: ViewType) -> ViewId {
        let view = ViewId::new(self.next);
        self.next += 1;
        self.views.insert(view, Slot::new(ty));
        self.counters.created += 1;
        self.record(Op::Create { view, ty });
        view
    }

    fn set_property(&mut self, view: ViewId, name: &str, value: &Value) {
        self.record(Op::Set {
            view,
            name: name.to_owned(),
            value: value.clone(),
        });
        if !self.check("set_property", view) {
            return;
        }
        self.counters.writes += 1;
        if let Some(slot) = self.views.get_mut(&view) {
            slot.props.insert(name.to_owned(), value.clone());
        }
    }

    fn append_child(&mut self, parent: ViewId, child: ViewId) {
        self.record(Op::Append { parent, child });
        if self.check("append_child", parent) && self.check("append_child", child) {
            self.attach(parent, child, None);
        }
    }

    fn insert_after(&mut self, prev: ViewId, child: ViewId) {
        self.record(Op::InsertAfter { prev, child });
        self.insert_next_to("insert_after", prev, child, true);
    }

    fn insert_before(&mut self, next: ViewId, child: ViewId) {
        self.record(Op::InsertBefore { next, child });
        self.insert_next_to("insert_before", next, child, false);
    }

    fn remove_from_parent(&mut self, view: ViewId) {
        self.record(Op::Remove { view });
        if self.check("remove_from_parent", view) {
            self.detach(view);
        }
    }

    fn destroy_view(&mut self, view: ViewId) {
        self.record(Op::Destroy { view });
        if !self.check("destroy_view", view) {
            return;
        }
        self.detach(view);
        if let Some(slot) = self.views.remove(&view) {
            if !slot.children.is_empty() {
                self.violate(Violation::DestroyedWithChildren {
                    view,
                    children: slot.children.len(),
                });
                for child in slot.children {
                    if let Some(child) = self.views.get_mut(&child) {
                        child.parent = None;
                    }
                }
            }
            self.counters.destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(host: &mut MemoryHost, text: &'static str) -> ViewId {
        let view = host.create_view(ViewType::LABEL);
        host.set_property(view, "value", &Value::from(text));
        view
    }

    #[test]
    fn inserts_move_attached_views() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = label(&mut host, "a");
        let b = label(&mut host, "b");
        let c = label(&mut host, "c");
        host.append_child(root, a);
        host.append_child(root, b);
        host.append_child(root, c);

        host.insert_before(a, c);
        assert_eq!(host.children(root), [c, a, b]);
        host.insert_after(b, c);
        assert_eq!(host.children(root), [a, b, c]);
        host.insert_after(a, c);
        assert_eq!(host.labels(root), ["a", "c", "b"]);
        assert!(host.violations().is_empty());
    }

    #[test]
    fn destroy_releases_view() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let a = label(&mut host, "a");
        host.append_child(root, a);

        host.destroy_view(a);

        assert!(!host.contains(a));
        assert!(host.children(root).is_empty());
        assert!(host.is_empty());
        assert_eq!(host.counters().destroyed, 1);
    }

    #[test]
    fn flags_contract_violations() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let parent = host.create_view(ViewType::VIEW);
        let child = host.create_view(ViewType::VIEW);
        host.append_child(parent, child);

        host.insert_after(root, child);
        host.append_child(child, parent);
        host.destroy_view(parent);
        host.destroy_view(parent);

        assert_eq!(
            host.violations(),
            [
                Violation::DetachedAnchor { anchor: root },
                Violation::Cycle { parent: child, child: parent },
                Violation::DestroyedWithChildren { view: parent, children: 1 },
                Violation::UnknownView { op: "destroy_view", view: parent },
            ]
        );
        assert_eq!(host.parent(child), None);
    }

    #[test]
    fn records_ops_in_order() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let view = host.create_view(ViewType::VIEW);
        host.append_child(root, view);
        host.set_property(view, "width", &Value::from(3));

        assert_eq!(
            host.take_ops(),
            [
                Op::Create { view, ty: ViewType::VIEW },
                Op::Append { parent: root, child: view },
                Op::Set { view, name: "width".into(), value: Value::Int(3) },
            ]
        );
        assert!(host.ops().is_empty());

        host.set_recording(false);
        host.set_property(view, "width", &Value::from(4));
        assert!(host.ops().is_empty());
        assert_eq!(host.counters().writes, 2);
        assert_eq!(host.text(root), "");
    }
}
