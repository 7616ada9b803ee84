//! Typed property values.
//!
//! Property and state maps hold [`Value`]s. Each value hashes explicitly and
//! deterministically through [`StructuralHash`], which is what the diff engine
//! uses to find changed properties.

use alloc::{borrow::Cow, rc::Rc, vec::Vec};
use core::{
    fmt::{self, Debug, Display},
    sync::atomic::{AtomicU64, Ordering},
};

use crate::hash::{self, StructuralHash, combine};

/// Name of a property, a state entry, or a ref.
pub type Name = Cow<'static, str>;

/// A dynamically typed property value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    Str(Name),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A nested property map.
    Map(Props),
    /// An event handler or other closure.
    Callback(Callback),
}

impl Value {
    /// Returns the contained string, if this is a [`Value::Str`].
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the contained integer, if this is a [`Value::Int`].
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the contained boolean, if this is a [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the contained number, widening integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Returns the contained callback, if any.
    #[must_use]
    pub const fn as_callback(&self) -> Option<&Callback> {
        match self {
            Self::Callback(callback) => Some(callback),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    const fn tag(&self) -> u64 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int(_) => 2,
            Self::Float(_) => 3,
            Self::Str(_) => 4,
            Self::List(_) => 5,
            Self::Map(_) => 6,
            Self::Callback(_) => 7,
        }
    }
}

impl StructuralHash for Value {
    fn structural_hash(&self) -> u64 {
        let content = match self {
            Self::Null => 0,
            Self::Bool(value) => value.structural_hash(),
            Self::Int(value) => value.structural_hash(),
            Self::Float(value) => value.structural_hash(),
            Self::Str(value) => hash::str(value),
            Self::List(values) => values.structural_hash(),
            Self::Map(props) => props.structural_hash(),
            Self::Callback(callback) => callback.id(),
        };
        combine(combine(hash::SEED, self.tag()), content)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => write!(f, "{value:?}"),
            Self::List(values) => {
                f.write_str("[")?;
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            Self::Map(props) => write!(f, "{props}"),
            Self::Callback(callback) => write!(f, "<callback #{}>", callback.id()),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::Int(i64::from(value))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&'static str> for Value {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<Name> for Value {
    fn from(value: Name) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<Props> for Value {
    fn from(value: Props) -> Self {
        Self::Map(value)
    }
}

impl From<Callback> for Value {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// A shared closure stored as a property value.
///
/// Each callback receives a process-unique id when created. The id is its
/// structural hash: clones hash equal, distinct closures never do.
#[derive(Clone)]
pub struct Callback {
    id: u64,
    handler: Rc<dyn Fn(&Value)>,
}

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

impl Callback {
    /// Wraps `handler` into a callback with a fresh id.
    pub fn new(handler: impl Fn(&Value) + 'static) -> Self {
        Self {
            id: NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed),
            handler: Rc::new(handler),
        }
    }

    /// Invokes the callback.
    pub fn call(&self, argument: &Value) {
        (self.handler)(argument);
    }

    /// Returns the unique id of this callback.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback(#{})", self.id)
    }
}

/// Ordered map from [`Name`] to [`Value`].
///
/// Entries keep their insertion order for display. Hashing is order
/// independent: [`Props::entry_hash`] values are folded in key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    entries: Vec<(Name, Value)>,
}

/// Controller state shares the representation of properties.
pub type State = Props;

impl Props {
    /// Creates an empty map.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts `value` under `name`, returning the previous value.
    ///
    /// Replacing an existing entry keeps its original position.
    pub fn insert(&mut self, name: impl Into<Name>, value: impl Into<Value>) -> Option<Value> {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(key, _)| *key == name) {
            return Some(core::mem::replace(&mut slot.1, value));
        }
        self.entries.push((name, value));
        None
    }

    /// Builder form of [`Props::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<Name>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Removes the entry named `name`.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    /// Returns the value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Returns `true` when an entry named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (&**key, value))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hash of a single entry: the name folded with the value hash.
    #[must_use]
    pub fn entry_hash(name: &str, value: &Value) -> u64 {
        combine(hash::str(name), value.structural_hash())
    }
}

impl StructuralHash for Props {
    fn structural_hash(&self) -> u64 {
        let mut hashes: Vec<(&str, u64)> = self
            .iter()
            .map(|(name, value)| (name, Self::entry_hash(name, value)))
            .collect();
        hashes.sort_unstable_by(|a, b| a.0.cmp(b.0));
        hashes
            .into_iter()
            .fold(hash::SEED, |hash, (_, entry)| combine(hash, entry))
    }
}

impl Display for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (name, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}

impl<N: Into<Name>, V: Into<Value>> FromIterator<(N, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (name, value) in iter {
            props.insert(name, value);
        }
        props
    }
}

impl<N: Into<Name>, V: Into<Value>, const LEN: usize> From<[(N, V); LEN]> for Props {
    fn from(entries: [(N, V); LEN]) -> Self {
        entries.into_iter().collect()
    }
}

/// Identity of an item inside a keyed collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    /// Numeric key.
    Int(i64),
    /// Textual key.
    Str(Name),
    /// Position of an item that declared no key.
    Index(usize),
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Index(value) => write!(f, "@{value}"),
        }
    }
}

impl StructuralHash for Key {
    fn structural_hash(&self) -> u64 {
        match self {
            Self::Int(value) => combine(1, value.structural_hash()),
            Self::Str(value) => combine(2, hash::str(value)),
            Self::Index(value) => combine(3, hash::bytes(&value.to_le_bytes())),
        }
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or_else(|_| Self::Str(Cow::Owned(value.to_string())), Self::Int)
    }
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}
