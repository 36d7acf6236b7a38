//! Index-linked [red-black][1] [tree][2] engine
//!
//! The engine only manipulates [`Link`]s. A consumer embeds a `Link` in each
//! of its records, keeps the records in storage of its own choosing, and
//! exposes them through [`NodeStorage`]. Nodes are addressed by [`NodeId`], so
//! no record ever holds a pointer into another one.
//!
//! [1]: https://en.wikipedia.org/wiki/Red%E2%80%93black_tree
//! [2]: https://en.wikipedia.org/wiki/Binary_search_tree
//!
//! # Panic Safety
//!
//! The mutation functions don't call back into consumer code except through
//! [`NodeStorage`]. If a `NodeStorage` method panics in the middle of a
//! mutation, the tree is left corrupted. Enable the `hardened` feature to
//! abort in that case.
use core::fmt;

use crate::utils::panicking::mutation;


/// A stable handle identifying a node in a [`NodeStorage`].
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the index this handle was created from.
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Color {
    Black,
    Red,
}

pub type IsRightChild = bool;

/// The structural part of a node: the links to its neighbors and its color.
///
/// A `Link` that isn't part of any tree is [`Link::new()`]. Linking a node
/// into a tree overwrites whatever the `Link` contained, and removing it
/// resets the `Link` to the initial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    children: [Option<NodeId>; 2],
    parent: Option<NodeId>,
    color: Color,
}

impl Link {
    pub const fn new() -> Self {
        Self {
            children: [None, None],
            parent: None,
            color: Color::Black,
        }
    }

    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// `[left, right]`
    #[inline]
    pub fn children(&self) -> [Option<NodeId>; 2] {
        self.children
    }

    #[inline]
    pub fn left(&self) -> Option<NodeId> {
        self.children[0]
    }

    #[inline]
    pub fn right(&self) -> Option<NodeId> {
        self.children[1]
    }

    #[inline]
    pub fn color(&self) -> Color {
        self.color
    }
}

impl Default for Link {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Gives the engine access to the nodes of a tree.
///
/// # Contract
///
/// `link` and `link_mut` must return the same `Link` for the same `NodeId`
/// as long as the node is in the tree. The engine only calls these methods
/// with ids that the consumer passed in or that it read from a `Link`.
pub trait NodeStorage {
    /// The key type. The engine never looks at it; it's only forwarded to
    /// consumer-provided comparators.
    type Key: ?Sized;

    fn link(&self, id: NodeId) -> &Link;
    fn link_mut(&mut self, id: NodeId) -> &mut Link;
    fn key(&self, id: NodeId) -> &Self::Key;
}

/// Points to the topmost node of a tree. `None` means the tree is empty.
///
/// This is deliberately not `Clone`: a second copy would go stale after the
/// first mutation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Root {
    pub(crate) node: Option<NodeId>,
}

impl Root {
    #[inline]
    pub const fn new() -> Self {
        Self { node: None }
    }

    #[inline]
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.node.is_none()
    }
}

// Rotation
// -----------------------------------------------------------------------------

/// Move `node`'s right child to `node`'s position, making `node` its left
/// child.
///
/// # Panics
///
/// Panics if `node` doesn't have a right child.
pub fn rotate_left<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    mutation(|| rotate(storage, root, node, false))
}

/// Move `node`'s left child to `node`'s position, making `node` its right
/// child.
///
/// # Panics
///
/// Panics if `node` doesn't have a left child.
pub fn rotate_right<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    mutation(|| rotate(storage, root, node, true))
}

/// Rotate a node. `dir` specifies `node`'s position after rotation.
fn rotate<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    node: NodeId,
    dir: IsRightChild,
) {
    let idir = (!dir) as usize;
    let dir = dir as usize;

    //          node            new_root
    //          /  \            /  \
    //         /    \          /    \
    //  new_root    y   ==>   x     node
    //    /  \                      /  \
    //   x  mid                    mid  y

    let Some(new_root) = storage.link(node).children[idir] else {
        invalid_structure!("{:?} has no child to rotate about", node);
    };
    let mid = storage.link(new_root).children[dir];
    let parent = storage.link(node).parent;

    storage.link_mut(node).children[idir] = mid;
    storage.link_mut(new_root).children[dir] = Some(node);

    storage.link_mut(new_root).parent = parent;
    storage.link_mut(node).parent = Some(new_root);
    if let Some(mid) = mid {
        storage.link_mut(mid).parent = Some(node);
    }

    replace_child(storage, root, parent, node, Some(new_root));
}

/// Replace `old` with `new` in `parent`'s children, or in `root` if `parent`
/// is `None`. Doesn't touch `new`'s parent link.
fn replace_child<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    parent: Option<NodeId>,
    old: NodeId,
    new: Option<NodeId>,
) {
    if let Some(parent) = parent {
        let children = &mut storage.link_mut(parent).children;
        if children[0] == Some(old) {
            children[0] = new;
        } else {
            check_structure!(
                children[1] == Some(old),
                "{:?} is not a child of its parent {:?}",
                old,
                parent
            );
            children[1] = new;
        }
    } else {
        check_structure!(
            root.node == Some(old),
            "{:?} has no parent but is not the root",
            old
        );
        root.node = new;
    }
}

#[inline]
fn is_right_child<S: NodeStorage + ?Sized>(storage: &S, parent: NodeId, child: NodeId) -> bool {
    storage.link(parent).children[1] == Some(child)
}

// Insertion
// -----------------------------------------------------------------------------

/// Make `node` a red leaf hanging at `parent`'s `side`, or the root if
/// `parent` is `None`. The tree violates the color invariant until
/// [`insert_fixup`] is called.
///
/// The slot must be vacant.
pub fn link_node<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    node: NodeId,
    parent: Option<NodeId>,
    side: IsRightChild,
) {
    *storage.link_mut(node) = Link {
        children: [None, None],
        parent,
        color: Color::Red,
    };

    let slot = if let Some(parent) = parent {
        &mut storage.link_mut(parent).children[side as usize]
    } else {
        &mut root.node
    };
    check_structure!(slot.is_none(), "the slot for {:?} is occupied", node);
    *slot = Some(node);
}

/// Restore the red-black invariants after `node` was linked as a red leaf.
pub fn insert_fixup<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    mutation(|| {
        insert_fixup_inner(storage, root, node);

        if let Some(top) = root.node {
            storage.link_mut(top).color = Color::Black;
        }
    })
}

fn insert_fixup_inner<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    let mut node = node;
    loop {
        check_structure!(
            storage.link(node).color == Color::Red,
            "fixing up a black node {:?}",
            node
        );

        // Color invariant fulfilled?
        let Some(parent) = storage.link(node).parent else {
            return;
        };
        if storage.link(parent).color == Color::Black {
            return;
        }
        let node_side = is_right_child(storage, parent, node);

        // `parent` is red, so `node` cannot be red. What do we do now?
        let Some(grandparent) = storage.link(parent).parent else {
            // `parent` is a red root. The caller repaints it.
            return;
        };
        let parent_side = is_right_child(storage, grandparent, parent);

        // Due to the color invariant, `grandparent` must be black.
        check_structure!(
            storage.link(grandparent).color == Color::Black,
            "{:?} and its parent {:?} are both red",
            parent,
            grandparent
        );

        let uncle = storage.link(grandparent).children[(!parent_side) as usize];
        if let Some(uncle) = uncle.filter(|&u| storage.link(u).color == Color::Red) {
            // Both `parent` and `uncle` are red. Repaint them to black and
            // `grandparent` to red. (This doesn't change `grandparent`'s
            // subtree's black height.)
            storage.link_mut(parent).color = Color::Black;
            storage.link_mut(uncle).color = Color::Black;
            storage.link_mut(grandparent).color = Color::Red;

            // `grandparent` might now violate the color invariant
            node = grandparent;
            continue;
        }

        // `uncle` is black (or nil). If `node` is an inner grandchild, rotate
        // it into `parent`'s position first.
        let parent = if parent_side != node_side {
            rotate(storage, root, parent, !node_side);
            node
        } else {
            parent
        };

        // Push `grandparent` to `uncle`'s side, making `parent` the parent of
        // `node` and `grandparent`, and repaint so that the black height of
        // the subtree is what it was before the insertion.
        rotate(storage, root, grandparent, !parent_side);
        storage.link_mut(parent).color = Color::Black;
        storage.link_mut(grandparent).color = Color::Red;
        return;
    }
}

// Removal
// -----------------------------------------------------------------------------

/// Remove `node` from a tree.
///
/// `node` must be in the tree `root` points to. Upon return, `node`'s link is
/// reset to [`Link::new()`].
pub fn erase<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    mutation(|| {
        erase_inner(storage, root, node);
        *storage.link_mut(node) = Link::new();
    })
}

fn erase_inner<S: NodeStorage + ?Sized>(storage: &mut S, root: &mut Root, node: NodeId) {
    if let [Some(_), Some(right)] = storage.link(node).children {
        swap_with_successor(storage, root, node, right);
    }

    // `node` now has at most one child. Move it to the left.
    {
        let children = &mut storage.link_mut(node).children;
        if children[0].is_none() {
            children.swap(0, 1);
        }
    }

    let Link {
        children: [child, _],
        parent,
        color,
    } = *storage.link(node);
    let mut node_side = parent.map_or(false, |parent| is_right_child(storage, parent, node));

    match (color, child) {
        (Color::Red, child) => {
            // If `child` is non-nil, it must be black as per the color
            // invariant. However, having a black child at this position
            // would violate the black height invariant. Therefore,
            // `child` is nil, and `node` can be simply removed.
            check_structure!(child.is_none(), "red {:?} has a single child", node);
            replace_child(storage, root, parent, node, None);
            return;
        }
        (Color::Black, Some(child)) => {
            // `child` must be red because of the black height invariant.
            // Move `child` to `node`'s position and repaint it black.
            check_structure!(
                storage.link(child).color == Color::Red,
                "black {:?} has a single black child",
                node
            );
            let child_link = storage.link_mut(child);
            child_link.parent = parent;
            child_link.color = Color::Black;
            replace_child(storage, root, parent, node, Some(child));
            return;
        }
        (Color::Black, None) => {
            // We need to work hard to preserve the black height invariant
            // in this case...
        }
    }

    // Remove `node` anyway. This will decrement its ancestors' black
    // height, violating the black height invariant. We will restore
    // this invariant by traveling up the tree.
    replace_child(storage, root, parent, node, None);

    // If `parent` is `None`, the black height change propagated up to
    // the root
    let Some(mut parent) = parent else {
        return;
    };

    loop {
        //       parent
        //        /   \
        //       /     \
        //     node  sibling
        //            /   \
        //           /     \
        //  close_nephew distant_nephew
        //
        // `node`'s sibling must exist because of the black height invariant
        let Some(sibling) = storage.link(parent).children[(!node_side) as usize] else {
            invalid_structure!("the deficient side of {:?} has no sibling", parent);
        };
        let sibling_link = storage.link(sibling);
        let close_nephew = sibling_link.children[node_side as usize];
        let distant_nephew = sibling_link.children[(!node_side) as usize];

        match (
            storage.link(parent).color,
            with_color(storage, close_nephew),
            sibling_link.color,
            with_color(storage, distant_nephew),
        ) {
            // Due to the black height invariant, there must be at least
            // one black in `sibling`'s side's path
            (_, None, Color::Red, _) | (_, _, Color::Red, None) => {
                invalid_structure!("red {:?} has a nil child and a sibling", sibling)
            }
            // Due to the color invariant
            (_, Some((_, Color::Red)), Color::Red, _)
            | (_, _, Color::Red, Some((_, Color::Red)))
            | (Color::Red, _, Color::Red, _) => {
                invalid_structure!("red {:?} is adjacent to another red node", sibling)
            }
            // Valid cases
            (Color::Black, Some((_, Color::Black)), Color::Red, Some((_, Color::Black))) => {
                // Move `parent` into `node`'s position. `parent` adopts
                // `close_nephew`.
                rotate(storage, root, parent, node_side);

                // Repaint `parent` and `sibling` (now grandparent) to red
                // and black
                storage.link_mut(parent).color = Color::Red;
                storage.link_mut(sibling).color = Color::Black;

                // `close_nephew` (now sibling) is black, so if we
                // iterate again, we will fall through to the below cases
            }
            (
                Color::Black,
                None | Some((_, Color::Black)),
                Color::Black,
                None | Some((_, Color::Black)),
            ) => {
                // Repaint `sibling` to red. This rectifies the black height
                // difference between `node` and `sibling`.
                storage.link_mut(sibling).color = Color::Red;

                // However, `parent` still has one less black height than
                // the rest of the tree.
                let Some(grandparent) = storage.link(parent).parent else {
                    // The black height change propagated up to the root
                    return;
                };
                node_side = is_right_child(storage, grandparent, parent);
                parent = grandparent;
            }
            (
                Color::Red,
                None | Some((_, Color::Black)),
                Color::Black,
                None | Some((_, Color::Black)),
            ) => {
                // Repaint `parent` and `sibling` to black and red. This
                // restores `node`'s black height and keeps `sibling`'s
                // intact.
                storage.link_mut(parent).color = Color::Black;
                storage.link_mut(sibling).color = Color::Red;
                return;
            }
            (_, _, Color::Black, Some((distant_nephew, Color::Red))) => {
                // Move `sibling` to `parent`'s position. `parent` adopts
                // `close_nephew`.
                rotate(storage, root, parent, node_side);

                // `sibling` takes over `parent`'s color
                let parent_color = storage.link(parent).color;
                storage.link_mut(sibling).color = parent_color;
                storage.link_mut(parent).color = Color::Black;
                storage.link_mut(distant_nephew).color = Color::Black;
                return;
            }
            (_, Some((close_nephew, Color::Red)), Color::Black, _) => {
                // Move `close_nephew` to `sibling`'s position.
                rotate(storage, root, sibling, !node_side);

                storage.link_mut(sibling).color = Color::Red;
                storage.link_mut(close_nephew).color = Color::Black;

                // `sibling` (now distant nephew) is red, so if we iterate
                // again, we will take the above case
            }
        } // match
    } // loop
}

#[inline]
fn with_color<S: NodeStorage + ?Sized>(
    storage: &S,
    node: Option<NodeId>,
) -> Option<(NodeId, Color)> {
    node.map(|node| (node, storage.link(node).color))
}

/// Exchange the structural positions and colors of `node` and its in-order
/// successor, the leftmost node of the subtree rooted by `right`. This
/// temporarily breaks ordering.
fn swap_with_successor<S: NodeStorage + ?Sized>(
    storage: &mut S,
    root: &mut Root,
    node: NodeId,
    right: NodeId,
) {
    let Link {
        children: node_children,
        parent,
        color: node_color,
    } = *storage.link(node);

    let mut succ = right;
    let mut succ_parent = node;
    while let Some(next_succ) = storage.link(succ).children[0] {
        succ_parent = succ;
        succ = next_succ;
    }
    let Link {
        children: [_, succ_right],
        color: succ_color,
        ..
    } = *storage.link(succ);

    if succ_parent != node {
        //      node                 succ
        //      /  \                 /  \
        //     x   right            x   right
        //          /                    /
        //        ...        ==>       ...
        //        /                    /
        //     succ                  node
        //        \                    \
        //     succ_right           succ_right
        *storage.link_mut(node) = Link {
            children: [None, succ_right],
            parent: Some(succ_parent),
            color: succ_color,
        };
        *storage.link_mut(succ) = Link {
            children: node_children,
            parent,
            color: node_color,
        };
        storage.link_mut(succ_parent).children[0] = Some(node);
        storage.link_mut(right).parent = Some(succ);
    } else {
        // `succ` is `right`
        *storage.link_mut(node) = Link {
            children: [None, succ_right],
            parent: Some(succ),
            color: succ_color,
        };
        *storage.link_mut(succ) = Link {
            children: [node_children[0], Some(node)],
            parent,
            color: node_color,
        };
    }
    if let Some(child) = node_children[0] {
        storage.link_mut(child).parent = Some(succ);
    }
    if let Some(child) = succ_right {
        storage.link_mut(child).parent = Some(node);
    }

    replace_child(storage, root, parent, node, Some(succ));
}

// Navigation
// -----------------------------------------------------------------------------

/// Find the minimum (leftmost) node in the subtree rooted by `this`.
#[inline]
pub fn first<S: NodeStorage + ?Sized>(storage: &S, mut this: NodeId) -> NodeId {
    while let Some(child) = storage.link(this).children[0] {
        this = child;
    }
    this
}

/// Find the maximum (rightmost) node in the subtree rooted by `this`.
#[inline]
pub fn last<S: NodeStorage + ?Sized>(storage: &S, mut this: NodeId) -> NodeId {
    while let Some(child) = storage.link(this).children[1] {
        this = child;
    }
    this
}

/// Find the in-order successor of `this`.
pub fn successor<S: NodeStorage + ?Sized>(storage: &S, this: NodeId) -> Option<NodeId> {
    step(storage, this, true)
}

/// Find the in-order predecessor of `this`.
pub fn predecessor<S: NodeStorage + ?Sized>(storage: &S, this: NodeId) -> Option<NodeId> {
    step(storage, this, false)
}

fn step<S: NodeStorage + ?Sized>(
    storage: &S,
    mut node: NodeId,
    forward: IsRightChild,
) -> Option<NodeId> {
    if let Some(child) = storage.link(node).children[forward as usize] {
        return Some(if forward {
            first(storage, child)
        } else {
            last(storage, child)
        });
    }

    // Climb until we leave a subtree on the side opposite to `forward`
    while let Some(parent) = storage.link(node).parent {
        if storage.link(parent).children[(!forward) as usize] == Some(node) {
            return Some(parent);
        }
        node = parent;
    }

    // There's none
    None
}
