//! Comparator-driven operations built on the [`rbtree`](crate::rbtree)
//! primitives
use core::{cmp::Ordering, fmt, iter::FusedIterator};

use crate::rbtree::{self, IsRightChild, NodeId, NodeStorage, Root};

/// Indicates a failure of a keyed tree operation.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "std", derive(thiserror::Error))]
pub enum Error {
    /// A node with an equal key is already in the tree. The tree was left
    /// unchanged.
    #[cfg_attr(feature = "std", error("a node with an equal key is already in the tree"))]
    DuplicateKey,
    /// No node in the tree matches the key.
    #[cfg_attr(feature = "std", error("no node matches the key"))]
    NotFound,
}

/// A vacant position found by [`search`].
///
/// It's only valid until the next mutation of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    parent: Option<NodeId>,
    side: IsRightChild,
}

/// The result of [`search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Search {
    Found(NodeId),
    Vacant(Slot),
}

/// Descend from the root guided by `probe`, which returns the ordering of the
/// sought key relative to the key of a given node.
pub fn search<S: NodeStorage + ?Sized>(
    storage: &S,
    root: &Root,
    mut probe: impl FnMut(&S::Key) -> Ordering,
) -> Search {
    let mut slot = Slot {
        parent: None,
        side: false,
    };
    let mut cursor = root.node;
    while let Some(node) = cursor {
        let side = match probe(storage.key(node)) {
            Ordering::Less => false,
            Ordering::Greater => true,
            Ordering::Equal => return Search::Found(node),
        };
        slot = Slot {
            parent: Some(node),
            side,
        };
        cursor = storage.link(node).children()[side as usize];
    }
    Search::Vacant(slot)
}

/// Link `node` at a vacant slot returned by [`search`] and rebalance.
pub fn insert_vacant<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    node: NodeId,
    slot: Slot,
) {
    rbtree::link_node(storage, root, node, slot.parent, slot.side);
    rbtree::insert_fixup(storage, root, node);
}

/// Insert `new_node` into a tree ordered by `cmp`.
///
/// `cmp` receives the key of `new_node` and the key of a node in the tree.
/// Returns [`Error::DuplicateKey`] without modifying anything if the tree
/// already contains an equal key.
pub fn insert<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    new_node: NodeId,
    mut cmp: impl FnMut(&S::Key, &S::Key) -> Ordering,
) -> Result<(), Error> {
    let slot = {
        let storage = &*storage;
        let new_key = storage.key(new_node);
        match search(storage, root, |existing| cmp(new_key, existing)) {
            Search::Found(_) => return Err(Error::DuplicateKey),
            Search::Vacant(slot) => slot,
        }
    };
    insert_vacant(storage, root, new_node, slot);
    Ok(())
}

/// Find the node whose key is equal to `key`.
pub fn find<S: NodeStorage + ?Sized, Q: ?Sized>(
    storage: &S,
    root: &Root,
    key: &Q,
    mut cmp: impl FnMut(&Q, &S::Key) -> Ordering,
) -> Result<NodeId, Error> {
    match search(storage, root, |existing| cmp(key, existing)) {
        Search::Found(node) => Ok(node),
        Search::Vacant(_) => Err(Error::NotFound),
    }
}

/// Find the first node whose key is not less than the key `probe` describes.
///
/// `probe` returns the ordering of the sought key relative to the key of a
/// given node.
pub fn lower_bound<S: NodeStorage + ?Sized>(
    storage: &S,
    root: &Root,
    mut probe: impl FnMut(&S::Key) -> Ordering,
) -> Option<NodeId> {
    bound(storage, root, |key| probe(key) != Ordering::Greater)
}

/// Find the first node whose key is greater than the key `probe` describes.
pub fn upper_bound<S: NodeStorage + ?Sized>(
    storage: &S,
    root: &Root,
    mut probe: impl FnMut(&S::Key) -> Ordering,
) -> Option<NodeId> {
    bound(storage, root, |key| probe(key) == Ordering::Less)
}

/// Find the first node for which `go_left` returns `true`. `go_left` must
/// be monotonic over the in-order sequence.
fn bound<S: NodeStorage + ?Sized>(
    storage: &S,
    root: &Root,
    mut go_left: impl FnMut(&S::Key) -> bool,
) -> Option<NodeId> {
    let mut found = None;
    let mut cursor = root.node;
    while let Some(node) = cursor {
        let children = storage.link(node).children();
        if go_left(storage.key(node)) {
            found = Some(node);
            cursor = children[0];
        } else {
            cursor = children[1];
        }
    }
    found
}

/// Iterate over the nodes of a tree in ascending key order.
pub fn inorder<'a, S: NodeStorage + ?Sized>(storage: &'a S, root: &Root) -> Iter<'a, S> {
    match root.node {
        Some(top) => Iter::between(
            storage,
            rbtree::first(storage, top),
            rbtree::last(storage, top),
        ),
        None => Iter::empty(storage),
    }
}

/// An in-order iterator over a contiguous run of nodes, created by
/// [`inorder`] or [`Iter::between`].
///
/// It borrows the storage, so the tree can't be mutated while it's alive.
/// Cloning it restarts from the current position.
pub struct Iter<'a, S: ?Sized> {
    storage: &'a S,
    /// `Some((front, back))` while there are remaining nodes
    range: Option<(NodeId, NodeId)>,
}

impl<'a, S: NodeStorage + ?Sized> Iter<'a, S> {
    /// Iterate from `first` to `last`, inclusive. `last` must not precede
    /// `first`, and both must be in the same tree.
    pub fn between(storage: &'a S, first: NodeId, last: NodeId) -> Self {
        Self {
            storage,
            range: Some((first, last)),
        }
    }

    pub fn empty(storage: &'a S) -> Self {
        Self {
            storage,
            range: None,
        }
    }
}

impl<S: ?Sized> Clone for Iter<'_, S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage,
            range: self.range,
        }
    }
}

impl<S: ?Sized> fmt::Debug for Iter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Iter").field("range", &self.range).finish()
    }
}

impl<S: NodeStorage + ?Sized> Iterator for Iter<'_, S> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let (front, back) = self.range?;
        self.range = if front == back {
            None
        } else {
            rbtree::successor(self.storage, front).map(|next| (next, back))
        };
        Some(front)
    }
}

impl<S: NodeStorage + ?Sized> DoubleEndedIterator for Iter<'_, S> {
    fn next_back(&mut self) -> Option<NodeId> {
        let (front, back) = self.range?;
        self.range = if front == back {
            None
        } else {
            rbtree::predecessor(self.storage, back).map(|prev| (front, prev))
        };
        Some(back)
    }
}

impl<S: NodeStorage + ?Sized> FusedIterator for Iter<'_, S> {}
