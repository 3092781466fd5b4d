//! Rooted phylogeny representation.
//!
//! Provides [PhyloTree], a rooted tree over [PhyloNode] using the arena
//! pattern: nodes are stored in a contiguous vector and referenced by
//! [NodeIndex]. Aim is to avoid referencing troubles as well as to provide
//! efficient memory layout and cache locality for traversal operations; it
//! also makes cross-tree links (gene node → species node) plain indices that
//! survive stripping.
//!
//! # Structure
//! - All nodes (root, internal, external) are stored in the arena.
//! - The index of the root is maintained.
//! - Children are ordered; the species tree may branch arbitrarily.
//! - Deleting an external node *detaches* it (and collapses a resulting
//!   single-child parent); surviving nodes never move, so indices held
//!   elsewhere stay valid. Detached slots are simply unreachable from the
//!   root and are skipped by all traversals.
//!
//! # Construction
//! Build bottom-up: add external nodes, then internal nodes over their
//! children, then the root. Test validity with [PhyloTree::is_valid].

use crate::model::node::PhyloNode;

/// Index of a node in a tree (arena).
pub type NodeIndex = usize;

/// *During construction only*, index for unset root.
const NO_ROOT_SET_INDEX: NodeIndex = usize::MAX;

// =#========================================================================#=
// TREE
// =#========================================================================#=
/// A rooted phylogeny represented using the arena pattern on [PhyloNode].
///
/// # Example
/// ```
/// use taxodi::model::PhyloTree;
///
/// // Build ((a,b)x,c)r bottom-up.
/// let mut tree = PhyloTree::new();
/// let a = tree.add_external("a");
/// let b = tree.add_external("b");
/// let c = tree.add_external("c");
/// let x = tree.add_internal(&[a, b]);
/// tree.add_root(&[x, c]);
///
/// assert!(tree.is_valid());
/// assert_eq!(tree.num_externals(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct PhyloTree {
    /// Nodes of this tree (arena pattern)
    nodes: Vec<PhyloNode>,
    /// Index of the root of this tree
    root_index: NodeIndex,
    /// Name of tree; optional
    name: Option<String>,
}

impl Default for PhyloTree {
    fn default() -> Self {
        PhyloTree::new()
    }
}

impl PhyloTree {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        PhyloTree {
            nodes: Vec::new(),
            root_index: NO_ROOT_SET_INDEX,
            name: None,
        }
    }

    /// Creates a new tree with arena capacity for `num_nodes` nodes.
    pub fn with_capacity(num_nodes: usize) -> Self {
        PhyloTree {
            nodes: Vec::with_capacity(num_nodes),
            root_index: NO_ROOT_SET_INDEX,
            name: None,
        }
    }

    /// Attaches a name to this tree.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Adds an external node, assigning a unique index, which gets returned.
    pub fn add_external(&mut self, name: impl Into<String>) -> NodeIndex {
        let index = self.nodes.len();
        self.nodes.push(PhyloNode::new_external(index, name.into()));
        index
    }

    /// Adds an internal node over the given children, assigning a unique
    /// index, which gets returned.
    ///
    /// # Panics
    /// Panics if fewer than two children are given.
    pub fn add_internal(&mut self, children: &[NodeIndex]) -> NodeIndex {
        assert!(children.len() >= 2, "internal node needs at least two children");
        let index = self.nodes.len();
        self.nodes
            .push(PhyloNode::new_internal(index, children.to_vec()));
        for &child in children {
            self.nodes[child].set_parent(index);
        }
        index
    }

    /// Adds the root over the given children, assigning a unique index, which
    /// gets returned.
    ///
    /// # Panics
    /// Panics if fewer than two children are given.
    pub fn add_root(&mut self, children: &[NodeIndex]) -> NodeIndex {
        let index = self.add_internal(children);
        self.root_index = index;
        index
    }

    /// Returns reference to name of this tree, or `None` if not set.
    pub fn name(&self) -> Option<&String> {
        self.name.as_ref()
    }

    /// Returns whether the root of the tree has been set.
    pub fn is_root_set(&self) -> bool {
        self.root_index != NO_ROOT_SET_INDEX
    }

    /// Returns whether this tree has no reachable nodes (never rooted, or
    /// everything was stripped away).
    pub fn is_empty(&self) -> bool {
        !self.is_root_set()
    }

    /// Returns a reference to the root node.
    ///
    /// # Panics
    /// Panics if the root has not been set.
    pub fn root(&self) -> &PhyloNode {
        &self[self.root_index]
    }

    /// Returns the index of the root.
    pub fn root_index(&self) -> NodeIndex {
        self.root_index
    }

    /// Returns a reference to the node at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node(&self, index: NodeIndex) -> &PhyloNode {
        &self[index]
    }

    /// Returns a mutable reference to the node at the given index.
    ///
    /// # Panics
    /// Panics if `index` is out of bounds.
    pub fn node_mut(&mut self, index: NodeIndex) -> &mut PhyloNode {
        &mut self.nodes[index]
    }

    /// Returns the number of arena slots, including detached ones.
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of nodes reachable from the root.
    pub fn num_nodes(&self) -> usize {
        self.pre_order_iter().count()
    }

    /// Returns the number of external nodes reachable from the root.
    pub fn num_externals(&self) -> usize {
        self.externals_forward_iter().count()
    }

    /// Returns the number of internal nodes reachable from the root.
    pub fn num_internals(&self) -> usize {
        self.pre_order_iter()
            .filter(|&i| self[i].is_internal())
            .count()
    }

    /// Re-assigns preorder ids over all reachable nodes, starting at 0.
    ///
    /// Afterwards every ancestor carries a strictly smaller id than each of
    /// its descendants, which the GSDI least-common-ancestor walk relies on.
    pub fn preorder_reid(&mut self) {
        let order: Vec<NodeIndex> = self.pre_order_iter().collect();
        for (id, index) in order.into_iter().enumerate() {
            self.nodes[index].set_id(id);
        }
    }

    /// Returns the depth of the given node, i.e. the number of edges between
    /// it and the root.
    pub fn depth_of(&self, index: NodeIndex) -> usize {
        let mut depth = 0;
        let mut current = index;
        while let Some(parent) = self[current].parent() {
            current = parent;
            depth += 1;
        }
        depth
    }

    /// Returns the indices of all external descendants of the given node,
    /// left to right. A node that is itself external yields just itself.
    pub fn external_descendants_of(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut externals = Vec::new();
        let mut stack = vec![index];
        while let Some(current) = stack.pop() {
            let node = &self[current];
            if node.is_external() {
                externals.push(current);
            } else {
                for &child in node.children().iter().rev() {
                    stack.push(child);
                }
            }
        }
        externals
    }

    /// Deletes an external node from the tree.
    ///
    /// The node is detached from its parent. A parent left with a single
    /// child is collapsed: the remaining child takes the parent's place (or
    /// becomes the new root). Deleting the last reachable node leaves the
    /// tree empty. Indices of surviving nodes are unchanged; call
    /// [preorder_reid](PhyloTree::preorder_reid) afterwards to restore dense
    /// preorder ids.
    ///
    /// # Panics
    /// Panics if the node at `index` is not external.
    pub fn delete_external(&mut self, index: NodeIndex) {
        assert!(self[index].is_external(), "can only delete external nodes");
        let Some(parent) = self[index].parent() else {
            // Single-node tree
            if self.root_index == index {
                self.root_index = NO_ROOT_SET_INDEX;
            }
            return;
        };
        self.nodes[index].clear_parent();
        self.nodes[parent].children_mut().retain(|&c| c != index);
        if self.nodes[parent].children().len() == 1 {
            self.collapse_single_child(parent);
        }
    }

    /// Replaces a single-child internal node by its remaining child.
    fn collapse_single_child(&mut self, index: NodeIndex) {
        let only_child = self.nodes[index].children()[0];
        self.nodes[index].children_mut().clear();
        match self.nodes[index].parent() {
            Some(grandparent) => {
                self.nodes[index].clear_parent();
                for slot in self.nodes[grandparent].children_mut() {
                    if *slot == index {
                        *slot = only_child;
                    }
                }
                self.nodes[only_child].set_parent(grandparent);
            }
            None => {
                // Root with one child left: the child becomes the new root.
                self.nodes[only_child].clear_parent();
                self.root_index = only_child;
            }
        }
    }

    /// Validates the tree structure and all index references.
    ///
    /// Checks, over the nodes reachable from the root:
    /// - child indices are in bounds and point back to their parent
    /// - non-root nodes have their parent set and appear among its children
    /// - the root has no parent
    /// - no node is visited twice (no cycles, no sharing)
    ///
    /// # Returns
    /// `true` if the tree is valid, `false` otherwise
    pub fn is_valid(&self) -> bool {
        if !self.is_root_set() || self.root_index >= self.nodes.len() {
            return false;
        }
        if self.root().has_parent() {
            return false;
        }
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root_index];
        while let Some(index) = stack.pop() {
            if seen[index] {
                return false;
            }
            seen[index] = true;
            let node = &self[index];
            for &child in node.children() {
                if child >= self.nodes.len() {
                    return false;
                }
                if self[child].parent() != Some(index) {
                    return false;
                }
                stack.push(child);
            }
            if index != self.root_index {
                match node.parent() {
                    None => return false,
                    Some(parent) => {
                        if parent >= self.nodes.len()
                            || !self[parent].children().contains(&index)
                        {
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

impl std::ops::Index<NodeIndex> for PhyloTree {
    type Output = PhyloNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<NodeIndex> for PhyloTree {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.nodes[index]
    }
}

// =#========================================================================#=
// ITERATORS
// =#========================================================================#=
impl PhyloTree {
    /// Returns an iterator over reachable node indices in post-order
    /// (children before parents). Deterministic for a fixed tree.
    pub fn post_order_iter(&self) -> PostOrderIter<'_> {
        PostOrderIter::new(self)
    }

    /// Returns an iterator over reachable node indices in pre-order
    /// (parents before children). Deterministic for a fixed tree.
    pub fn pre_order_iter(&self) -> PreOrderIter<'_> {
        PreOrderIter::new(self)
    }

    /// Returns an iterator over the external node indices, left to right
    /// ("external forward" order). Deterministic for a fixed tree.
    pub fn externals_forward_iter(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.pre_order_iter().filter(|&i| self[i].is_external())
    }
}

/// Iterator for post-order traversal (children before parents).
///
/// Stack-based, no recursion. Each node is yielded after all its descendants.
pub struct PostOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<(NodeIndex, bool)>, // (index, children_visited)
}

impl<'a> PostOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push((tree.root_index, false));
        }
        PostOrderIter { tree, stack }
    }
}

impl Iterator for PostOrderIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((index, children_visited)) = self.stack.pop() {
            let node = &self.tree[index];
            if children_visited || node.is_external() {
                return Some(index);
            }
            self.stack.push((index, true));
            for &child in node.children().iter().rev() {
                self.stack.push((child, false));
            }
        }
        None
    }
}

/// Iterator for pre-order traversal (parents before children).
pub struct PreOrderIter<'a> {
    tree: &'a PhyloTree,
    stack: Vec<NodeIndex>,
}

impl<'a> PreOrderIter<'a> {
    fn new(tree: &'a PhyloTree) -> Self {
        let mut stack = Vec::new();
        if tree.is_root_set() {
            stack.push(tree.root_index);
        }
        PreOrderIter { tree, stack }
    }
}

impl Iterator for PreOrderIter<'_> {
    type Item = NodeIndex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        for &child in self.tree[index].children().iter().rev() {
            self.stack.push(child);
        }
        Some(index)
    }
}
