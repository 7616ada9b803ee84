//! Virtual nodes.
//!
//! A [`VNode`] is an immutable description of one view, controller, or keyed
//! collection for a single render pass. Its structural hash and per-property
//! hashes are computed once in the constructor; the diff engine compares them
//! instead of walking values.

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::{
    any::{TypeId, type_name},
    fmt::{self, Debug, Display},
};

use std::collections::HashSet;

use crate::{
    controller::Component,
    error::{ReconcileError, Result},
    hash::{self, StructuralHash, combine},
    value::{Key, Name, Props, Value},
};

/// Name of a primitive view type understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewType(&'static str);

impl ViewType {
    /// A plain container view.
    pub const VIEW: Self = Self("view");
    /// A text container view.
    pub const TEXT: Self = Self("text");
    /// A single-line label; text leaves are labels with a `value` property.
    pub const LABEL: Self = Self("label");

    /// Creates a view type from its name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the name of this view type.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.0
    }
}

impl Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

type Factory = fn(&Props) -> Box<dyn Component>;

/// Identity of a controller type, including the factory that builds it.
#[derive(Clone, Copy)]
pub struct ControllerType {
    name: &'static str,
    type_id: TypeId,
    factory: Factory,
}

impl ControllerType {
    /// Returns the controller type of `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            name: type_name::<C>(),
            type_id: TypeId::of::<C>(),
            factory: instantiate::<C>,
        }
    }

    /// Fully qualified type name of the component.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this is the controller type of `C`.
    #[must_use]
    pub fn is<C: Component>(&self) -> bool {
        self.type_id == TypeId::of::<C>()
    }

    pub(crate) fn instantiate(&self, props: &Props) -> Box<dyn Component> {
        (self.factory)(props)
    }
}

fn instantiate<C: Component>(props: &Props) -> Box<dyn Component> {
    Box::new(C::create(props))
}

impl PartialEq for ControllerType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerType {}

impl Debug for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerType").field(&self.name).finish()
    }
}

/// Component identity of a node, decided once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A primitive host view.
    View(ViewType),
    /// A stateful controller.
    Controller(ControllerType),
    /// A keyed collection; its items are the node's children.
    Collection,
}

impl NodeKind {
    fn identity_hash(&self) -> u64 {
        match self {
            Self::View(ty) => combine(1, hash::str(ty.name())),
            Self::Controller(ty) => combine(2, hash::str(ty.name())),
            Self::Collection => 3,
        }
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::View(ty) => write!(f, "{ty}"),
            Self::Controller(ty) => {
                let short = ty.name().rsplit("::").next().unwrap_or(ty.name());
                f.write_str(short)
            }
            Self::Collection => f.write_str("#collection"),
        }
    }
}

struct NodeData {
    kind: NodeKind,
    props: Props,
    prop_hashes: Vec<u64>,
    key: Option<Key>,
    reference: Option<Name>,
    children: Vec<Option<VNode>>,
    duplicate: Option<Key>,
    props_hash: u64,
    hash: u64,
}

/// Immutable virtual node. Cloning is cheap.
#[derive(Clone)]
pub struct VNode(Rc<NodeData>);

impl VNode {
    fn new(
        kind: NodeKind,
        props: Props,
        key: Option<Key>,
        reference: Option<Name>,
        children: Vec<Option<Self>>,
    ) -> Self {
        let prop_hashes: Vec<u64> = props
            .iter()
            .map(|(name, value)| Props::entry_hash(name, value))
            .collect();

        let mut props_hash = props.structural_hash();
        if let Some(key) = &key {
            props_hash = combine(props_hash, combine(hash::str("key"), key.structural_hash()));
        }
        if let Some(reference) = &reference {
            props_hash = combine(props_hash, combine(hash::str("ref"), hash::str(reference)));
        }

        let mut node_hash = combine(combine(hash::SEED, kind.identity_hash()), props_hash);
        for child in &children {
            // empty slots count, so that [None, a] and [a, None] differ
            node_hash = combine(node_hash, child.as_ref().map_or(0, Self::hash));
        }

        let duplicate = if kind == NodeKind::Collection {
            first_duplicate(&children)
        } else {
            None
        }
        .or_else(|| {
            children
                .iter()
                .flatten()
                .find_map(|child| child.duplicate_key().cloned())
        });

        Self(Rc::new(NodeData {
            kind,
            props,
            prop_hashes,
            key,
            reference,
            children,
            duplicate,
            props_hash,
            hash: node_hash,
        }))
    }

    /// Starts building a primitive view node.
    #[must_use]
    pub fn view(ty: ViewType) -> NodeBuilder {
        NodeBuilder::new(NodeKind::View(ty))
    }

    /// Starts building a controller node for component `C`.
    #[must_use]
    pub fn controller<C: Component>() -> NodeBuilder {
        NodeBuilder::new(NodeKind::Controller(ControllerType::of::<C>()))
    }

    /// Builds a text leaf: a [`ViewType::LABEL`] with a `value` property.
    #[must_use]
    pub fn text(value: impl Into<Name>) -> Self {
        Self::view(ViewType::LABEL)
            .prop("value", Value::Str(value.into()))
            .build()
    }

    /// The empty placeholder rendered in place of nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::view(ViewType::VIEW).build()
    }

    /// Builds a keyed collection.
    ///
    /// Missing items are dropped. An empty collection holds one empty
    /// placeholder view so that it always owns a host view.
    #[must_use]
    pub fn collection(items: impl IntoIterator<Item = Option<Self>>) -> Self {
        let mut children: Vec<Option<Self>> = items.into_iter().flatten().map(Some).collect();
        if children.is_empty() {
            children.push(Some(Self::view(ViewType::VIEW).key(Key::Index(0)).build()));
        }
        Self::new(NodeKind::Collection, Props::new(), None, None, children)
    }

    /// Builds a keyed collection, rejecting duplicate keys up front.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::DuplicateKey`] if two items share a key.
    pub fn try_collection(items: impl IntoIterator<Item = Option<Self>>) -> Result<Self> {
        let node = Self::collection(items);
        match node.duplicate_key() {
            Some(key) => Err(ReconcileError::DuplicateKey { key: key.clone() }),
            None => Ok(node),
        }
    }

    /// First duplicate collection key found anywhere in this subtree.
    ///
    /// Rendering a tree that reports a duplicate fails before any mutation.
    #[must_use]
    pub fn duplicate_key(&self) -> Option<&Key> {
        self.0.duplicate.as_ref()
    }

    /// Component identity of this node.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Returns `true` for controller nodes.
    #[must_use]
    pub fn is_controller(&self) -> bool {
        matches!(self.0.kind, NodeKind::Controller(_))
    }

    /// The property map.
    #[must_use]
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Shortcut for `self.props().get(name)`.
    #[must_use]
    pub fn prop(&self, name: &str) -> Option<&Value> {
        self.0.props.get(name)
    }

    /// Hash of the property `name`, if present.
    #[must_use]
    pub fn prop_hash(&self, name: &str) -> Option<u64> {
        self.0
            .props
            .iter()
            .zip(&self.0.prop_hashes)
            .find(|((key, _), _)| *key == name)
            .map(|(_, hash)| *hash)
    }

    /// Iterates properties along with their hashes.
    pub fn props_with_hashes(&self) -> impl Iterator<Item = (&str, &Value, u64)> {
        self.0
            .props
            .iter()
            .zip(self.0.prop_hashes.iter().copied())
            .map(|((name, value), hash)| (name, value, hash))
    }

    /// The declared collection key.
    #[must_use]
    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    /// The declared ref name.
    #[must_use]
    pub fn reference(&self) -> Option<&Name> {
        self.0.reference.as_ref()
    }

    /// Child slots, in order.
    #[must_use]
    pub fn children(&self) -> &[Option<Self>] {
        &self.0.children
    }

    /// Structural hash of the whole subtree.
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.0.hash
    }

    /// Hash of the properties, key, and ref.
    #[must_use]
    pub fn props_hash(&self) -> u64 {
        self.0.props_hash
    }

    /// Returns `true` if both handles point at the same node.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Full structural comparison, ignoring hashes.
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        self.0.kind == other.0.kind
            && self.0.key == other.0.key
            && self.0.reference == other.0.reference
            && self.0.props == other.0.props
            && self.0.children.len() == other.0.children.len()
            && self
                .0
                .children
                .iter()
                .zip(&other.0.children)
                .all(|pair| match pair {
                    (Some(a), Some(b)) => a.content_eq(b),
                    (None, None) => true,
                    _ => false,
                })
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        write!(f, "{indent}<{}", self.0.kind)?;
        if let Some(key) = &self.0.key {
            write!(f, " key={key}")?;
        }
        if let Some(reference) = &self.0.reference {
            write!(f, " ref={reference}")?;
        }
        for (name, value) in self.0.props.iter() {
            write!(f, " {name}={value}")?;
        }
        let children: Vec<&Self> = self.0.children.iter().flatten().collect();
        if children.is_empty() {
            return writeln!(f, "/>");
        }
        writeln!(f, ">")?;
        for child in children {
            child.write_tree(f, depth + 1)?;
        }
        writeln!(f, "{indent}</{}>", self.0.kind)
    }
}

impl Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VNode")
            .field("kind", &self.0.kind)
            .field("key", &self.0.key)
            .field("hash", &self.0.hash)
            .field("children", &self.0.children.len())
            .finish_non_exhaustive()
    }
}

impl Display for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

/// Key of a collection item: its declared key or its position.
#[must_use]
pub fn item_key(item: &VNode, position: usize) -> Key {
    item.key().cloned().unwrap_or(Key::Index(position))
}

fn first_duplicate(items: &[Option<VNode>]) -> Option<Key> {
    let mut seen = HashSet::with_capacity(items.len());
    items
        .iter()
        .flatten()
        .enumerate()
        .map(|(position, item)| item_key(item, position))
        .find(|key| !seen.insert(key.clone()))
}

/// Builds a node from an identity, a property map, and children.
///
/// `key` and `ref` entries are lifted out of `props` into the node's declared
/// key and ref name.
#[must_use]
pub fn create_node(kind: NodeKind, mut props: Props, children: Vec<Option<VNode>>) -> VNode {
    let key = props.remove("key").and_then(|value| match value {
        Value::Int(value) => Some(Key::Int(value)),
        Value::Str(value) => Some(Key::Str(value)),
        _ => None,
    });
    let reference = props.remove("ref").and_then(|value| match value {
        Value::Str(value) if !value.is_empty() => Some(value),
        _ => None,
    });
    if kind == NodeKind::Collection {
        return VNode::collection(children);
    }
    VNode::new(kind, props, key, reference, children)
}

/// Incremental constructor for [`VNode`].
#[derive(Debug)]
#[must_use]
pub struct NodeBuilder {
    kind: NodeKind,
    props: Props,
    key: Option<Key>,
    reference: Option<Name>,
    children: Vec<Option<VNode>>,
}

impl NodeBuilder {
    const fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            props: Props::new(),
            key: None,
            reference: None,
            children: Vec::new(),
        }
    }

    /// Sets a property.
    pub fn prop(mut self, name: impl Into<Name>, value: impl Into<Value>) -> Self {
        self.props.insert(name, value);
        self
    }

    /// Merges a whole property map.
    pub fn props(mut self, props: Props) -> Self {
        for (name, value) in props.iter() {
            self.props.insert(Name::Owned(name.into()), value.clone());
        }
        self
    }

    /// Declares the collection key.
    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Declares the ref name under which the live instance is registered.
    pub fn reference(mut self, name: impl Into<Name>) -> Self {
        self.reference = Some(name.into());
        self
    }

    /// Appends a child slot. Lists become keyed collections and text becomes a
    /// text leaf; [`Render::Empty`] occupies an empty slot.
    pub fn child(mut self, child: impl Into<Render>) -> Self {
        self.children.push(child.into().into_child());
        self
    }

    /// Appends an optional child, keeping the slot when it is missing.
    pub fn maybe_child(mut self, child: Option<VNode>) -> Self {
        self.children.push(child);
        self
    }

    /// Appends several children.
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Render>,
    {
        self.children
            .extend(children.into_iter().map(|child| child.into().into_child()));
        self
    }

    /// Finishes the node.
    #[must_use]
    pub fn build(self) -> VNode {
        VNode::new(
            self.kind,
            self.props,
            self.key,
            self.reference,
            self.children,
        )
    }
}

impl From<NodeBuilder> for VNode {
    fn from(builder: NodeBuilder) -> Self {
        builder.build()
    }
}

/// Output of a render call.
#[derive(Debug, Clone, Default)]
pub enum Render {
    /// Nothing; rendered as an empty placeholder view.
    #[default]
    Empty,
    /// A single node.
    Node(VNode),
    /// A list of nodes, rendered as a keyed collection.
    Nodes(Vec<Option<VNode>>),
    /// Text, rendered as a text leaf.
    Text(Name),
}

impl Render {
    /// Converts this output into the node that gets reconciled.
    #[must_use]
    pub fn into_node(self) -> VNode {
        self.into_child().unwrap_or_else(VNode::empty)
    }

    /// Converts this output into a child slot.
    #[must_use]
    pub fn into_child(self) -> Option<VNode> {
        match self {
            Self::Empty => None,
            Self::Node(node) => Some(node),
            Self::Text(text) => Some(VNode::text(text)),
            Self::Nodes(mut nodes) => match nodes.len() {
                0 => None,
                1 => nodes.pop().flatten(),
                _ => Some(VNode::collection(nodes)),
            },
        }
    }
}

impl From<VNode> for Render {
    fn from(node: VNode) -> Self {
        Self::Node(node)
    }
}

impl From<NodeBuilder> for Render {
    fn from(builder: NodeBuilder) -> Self {
        Self::Node(builder.build())
    }
}

impl From<Option<VNode>> for Render {
    fn from(node: Option<VNode>) -> Self {
        node.map_or(Self::Empty, Self::Node)
    }
}

impl From<Vec<VNode>> for Render {
    fn from(nodes: Vec<VNode>) -> Self {
        Self::Nodes(nodes.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<VNode>>> for Render {
    fn from(nodes: Vec<Option<VNode>>) -> Self {
        Self::Nodes(nodes)
    }
}

impl From<&'static str> for Render {
    fn from(text: &'static str) -> Self {
        Self::Text(Name::Borrowed(text))
    }
}

impl From<String> for Render {
    fn from(text: String) -> Self {
        Self::Text(Name::Owned(text))
    }
}

impl From<()> for Render {
    fn from((): ()) -> Self {
        Self::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::{string::ToString, vec};

    fn label(text: &'static str) -> VNode {
        VNode::text(text)
    }

    #[test]
    fn identical_trees_hash_equal() {
        let build = || {
            VNode::view(ViewType::VIEW)
                .prop("width", 10)
                .child(label("a"))
                .child(label("b"))
                .build()
        };
        assert_eq!(build().hash(), build().hash());
    }

    #[test]
    fn property_order_does_not_change_hash() {
        let a = VNode::view(ViewType::VIEW).prop("x", 1).prop("y", 2).build();
        let b = VNode::view(ViewType::VIEW).prop("y", 2).prop("x", 1).build();
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.props_hash(), b.props_hash());
    }

    #[test]
    fn child_order_changes_hash() {
        let a = VNode::view(ViewType::VIEW)
            .child(label("a"))
            .child(label("b"))
            .build();
        let b = VNode::view(ViewType::VIEW)
            .child(label("b"))
            .child(label("a"))
            .build();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn empty_slots_are_positional() {
        let a = VNode::view(ViewType::VIEW)
            .maybe_child(None)
            .child(label("a"))
            .build();
        let b = VNode::view(ViewType::VIEW)
            .child(label("a"))
            .maybe_child(None)
            .build();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn view_types_change_hash() {
        let a = VNode::view(ViewType::VIEW).build();
        let b = VNode::view(ViewType::TEXT).build();
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn key_and_ref_take_part_in_hash() {
        let plain = VNode::view(ViewType::VIEW).build();
        let keyed = VNode::view(ViewType::VIEW).key(1).build();
        let named = VNode::view(ViewType::VIEW).reference("name").build();
        assert_ne!(plain.hash(), keyed.hash());
        assert_ne!(plain.hash(), named.hash());
    }

    #[test]
    fn prop_hashes_pinpoint_changes() {
        let a = VNode::view(ViewType::VIEW).prop("x", 1).prop("y", 2).build();
        let b = VNode::view(ViewType::VIEW).prop("x", 1).prop("y", 3).build();
        assert_eq!(a.prop_hash("x"), b.prop_hash("x"));
        assert_ne!(a.prop_hash("y"), b.prop_hash("y"));
        assert_eq!(a.prop_hash("z"), None);
    }

    #[test]
    fn create_node_lifts_key_and_ref() {
        let props = Props::new().with("key", "row").with("ref", "first").with("x", 1);
        let node = create_node(NodeKind::View(ViewType::VIEW), props, vec![]);
        assert_eq!(node.key(), Some(&Key::from("row")));
        assert_eq!(node.reference().map(|name| &**name), Some("first"));
        assert!(!node.props().contains("key"));
        assert_eq!(node.props().len(), 1);
    }

    #[test]
    fn render_conversions() {
        assert_eq!(Render::Empty.into_node().hash(), VNode::empty().hash());
        let single = Render::from(vec![label("a")]).into_node();
        assert_eq!(single.hash(), label("a").hash());
        let many = Render::from(vec![label("a"), label("b")]).into_node();
        assert_eq!(many.kind(), &NodeKind::Collection);
        assert_eq!(many.children().len(), 2);
        let text = Render::from("hi").into_node();
        assert_eq!(text.prop("value"), Some(&Value::from("hi")));
    }

    #[test]
    fn empty_collection_gets_placeholder() {
        let collection = VNode::collection(vec![None, None]);
        assert_eq!(collection.children().len(), 1);
        let placeholder = collection.children()[0].as_ref().map(VNode::kind);
        assert_eq!(placeholder, Some(&NodeKind::View(ViewType::VIEW)));
    }

    #[test]
    fn duplicate_keys_are_detected_at_construction() {
        let items = vec![
            Some(VNode::view(ViewType::VIEW).key("x").build()),
            Some(VNode::view(ViewType::VIEW).key("x").build()),
        ];
        let error = VNode::try_collection(items.clone()).unwrap_err();
        assert_eq!(error, ReconcileError::DuplicateKey { key: Key::from("x") });

        let nested = VNode::view(ViewType::VIEW)
            .child(VNode::collection(items))
            .build();
        assert_eq!(nested.duplicate_key(), Some(&Key::from("x")));
    }

    #[test]
    fn positional_keys_do_not_clash_with_numeric_keys() {
        let items = vec![
            Some(VNode::view(ViewType::VIEW).key(1).build()),
            Some(VNode::view(ViewType::VIEW).build()),
        ];
        assert!(VNode::try_collection(items).is_ok());
    }

    #[test]
    fn content_eq_matches_structure() {
        let a = VNode::view(ViewType::VIEW).prop("x", 1).child(label("a")).build();
        let b = VNode::view(ViewType::VIEW).prop("x", 1).child(label("a")).build();
        let c = VNode::view(ViewType::VIEW).prop("x", 2).child(label("a")).build();
        assert!(a.content_eq(&b));
        assert!(!a.content_eq(&c));
    }

    #[test]
    fn display_keeps_insertion_order() {
        let node = VNode::view(ViewType::VIEW)
            .prop("b", 2)
            .prop("a", 1)
            .child(label("x"))
            .build();
        assert_eq!(
            node.to_string(),
            "<view b=2 a=1>\n  <label value=\"x\"/>\n</view>\n"
        );
    }
}
