//! Keyed collections.
//!
//! A collection is an explicit list of items whose live instances keep their
//! identity across reorderings. Each item is identified by its declared key,
//! or by its position when it declares none. Positional keys lose identity on
//! reorder; the first use of that fallback is logged once per process.

use alloc::vec::Vec;
use std::{collections::HashMap, sync::Once};

use tracing::{trace, warn};

use crate::{
    controller::Controller,
    diff,
    error::{ReconcileError, Result},
    host::ViewId,
    live::Live,
    node::{VNode, item_key},
    value::Key,
};

static UNKEYED_WARNING: Once = Once::new();

#[derive(Debug)]
struct Entry {
    key: Key,
    node: VNode,
    live: Live,
}

/// A mounted keyed collection, in display order.
#[derive(Debug, Default)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    /// Keys in display order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.entries.iter().map(|entry| &entry.key)
    }

    /// Live instances in display order.
    pub fn lives(&self) -> impl Iterator<Item = &Live> {
        self.entries.iter().map(|entry| &entry.live)
    }

    /// Live instance stored under `key`.
    #[must_use]
    pub fn get(&self, key: &Key) -> Option<&Live> {
        self.entries
            .iter()
            .find(|entry| &entry.key == key)
            .map(|entry| &entry.live)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the collection holds no item.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First view of the collection and the position of the item owning it.
    fn first_view(&self) -> Option<(usize, ViewId)> {
        self.entries
            .iter()
            .enumerate()
            .find_map(|(position, entry)| entry.live.first_view().map(|view| (position, view)))
    }

    pub(crate) fn destroy(self, owner: &Controller) {
        for entry in self.entries {
            entry.live.destroy(owner);
        }
    }
}

/// Resolves the key of every item and rejects duplicates before any mutation.
fn resolve_keys(owner: &Controller, node: &VNode) -> Result<Vec<Key>> {
    let items = node.children().iter().flatten();
    let mut keys = Vec::with_capacity(node.children().len());
    let mut seen = HashMap::with_capacity(node.children().len());
    for (position, item) in items.enumerate() {
        if item.key().is_none() && owner.scheduler().config().warn_unkeyed {
            UNKEYED_WARNING.call_once(|| {
                warn!(
                    position,
                    "collection item has no key; falling back to its position"
                );
            });
        }
        let key = item_key(item, position);
        if seen.insert(key.clone(), position).is_some() {
            return Err(ReconcileError::DuplicateKey { key });
        }
        keys.push(key);
    }
    Ok(keys)
}

/// Mounts every item. The items are left detached; the caller places them.
pub(crate) fn mount(owner: &Controller, node: &VNode) -> Result<Collection> {
    let keys = resolve_keys(owner, node)?;
    let mut entries = Vec::with_capacity(keys.len());
    for (key, item) in keys.into_iter().zip(node.children().iter().flatten()) {
        let live = diff::mount(owner, item)?;
        entries.push(Entry {
            key,
            node: item.clone(),
            live,
        });
    }
    Ok(Collection { entries })
}

/// Reconciles `collection` with the items of `node` by key.
///
/// Reused items keep their live instance and are relinked after the previous
/// processed item; changed items are diffed in place first; unknown keys are
/// mounted; leftover old items are destroyed after the walk.
pub(crate) fn diff(owner: &Controller, node: &VNode, collection: &mut Collection) -> Result<()> {
    let keys = resolve_keys(owner, node)?;
    let anchor = collection.first_view();

    let mut old: Vec<Option<Entry>> = collection.entries.drain(..).map(Some).collect();
    let index: HashMap<Key, usize> = old
        .iter()
        .enumerate()
        .filter_map(|(position, entry)| entry.as_ref().map(|entry| (entry.key.clone(), position)))
        .collect();

    let mut prev: Option<ViewId> = None;
    let mut result = Ok(());
    for (key, item) in keys.into_iter().zip(node.children().iter().flatten()) {
        let position = index.get(&key).copied();
        let reused = position.and_then(|position| old[position].take());
        let live = match reused {
            Some(mut entry) => {
                if diff::needs_diff(owner, &entry.node, item)
                    && let Err(error) = diff::diff(owner, item, &entry.node, &mut entry.live)
                {
                    collection.entries.push(entry);
                    result = Err(error);
                    break;
                }
                trace!(%key, "reuse collection item");
                entry.live
            }
            None => match diff::mount(owner, item) {
                Ok(live) => {
                    trace!(%key, "mount collection item");
                    live
                }
                Err(error) => {
                    result = Err(error);
                    break;
                }
            },
        };

        match (prev, anchor) {
            (Some(prev), _) => {
                live.insert_after(owner, prev);
            }
            // the item owning the anchor is already in front, even if its
            // diff replaced the anchor view in place
            (None, Some((first, anchor)))
                if position != Some(first) && live.first_view() != Some(anchor) =>
            {
                live.insert_before(owner, anchor);
            }
            _ => {}
        }
        prev = live.last_view().or(prev);

        collection.entries.push(Entry {
            key,
            node: item.clone(),
            live,
        });
    }

    for entry in old.into_iter().flatten() {
        if result.is_ok() {
            trace!(key = %entry.key, "destroy collection item");
            entry.live.destroy(owner);
        } else {
            // unprocessed items stay owned by the collection
            collection.entries.push(entry);
        }
    }
    result
}
