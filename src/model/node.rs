//! Node types for rooted phylogenies.

use crate::model::event::Event;
use crate::model::taxonomy::Taxonomy;
use crate::model::tree::NodeIndex;
use crate::model::visual::NodeVisual;

/// During construction, a non-root node might not have its parent set yet.
const NO_PARENT_SET: NodeIndex = usize::MAX;

// =#========================================================================#=
// PHYLO NODE
// =#========================================================================#=
/// A node in a rooted phylogeny.
///
/// Nodes live in the arena of their [PhyloTree](crate::model::tree::PhyloTree)
/// and reference each other by [NodeIndex]. A node with no children is
/// *external* (a leaf); any other node is *internal*. The species tree may
/// branch arbitrarily; gene trees handed to GSDI must be binary, which the
/// algorithms check at their entry points rather than here.
///
/// # Invariants
/// - `index` is the node's position in the arena.
/// - `id` is the preorder id, valid after
///   [preorder_reid](crate::model::tree::PhyloTree::preorder_reid); ancestors
///   always carry smaller ids than their descendants.
/// - `parent` is `NO_PARENT_SET` only for the root and during construction.
#[derive(Debug, Clone)]
pub struct PhyloNode {
    /// Index of this node in the tree arena
    index: NodeIndex,
    /// Preorder id, assigned by the owning tree
    id: usize,
    /// Index of the parent node
    parent: NodeIndex,
    /// Indices of child nodes, in order; empty for external nodes
    children: Vec<NodeIndex>,
    /// Free-text node name (e.g. a sequence or taxon label)
    name: String,
    /// Payload carried by this node
    pub data: NodeData,
}

impl PhyloNode {
    /// Creates a new external node.
    pub(crate) fn new_external(index: NodeIndex, name: String) -> Self {
        PhyloNode {
            index,
            id: 0,
            parent: NO_PARENT_SET,
            children: Vec::new(),
            name,
            data: NodeData::default(),
        }
    }

    /// Creates a new internal node with the given children.
    pub(crate) fn new_internal(index: NodeIndex, children: Vec<NodeIndex>) -> Self {
        PhyloNode {
            index,
            id: 0,
            parent: NO_PARENT_SET,
            children,
            name: String::new(),
            data: NodeData::default(),
        }
    }

    /// Returns the index of this node in its tree's arena.
    pub fn index(&self) -> NodeIndex {
        self.index
    }

    /// Returns the preorder id of this node.
    pub fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: usize) {
        self.id = id;
    }

    /// Returns the index of the parent, or `None` for the root.
    ///
    /// Note that the parent might not be set yet during construction.
    pub fn parent(&self) -> Option<NodeIndex> {
        if self.parent == NO_PARENT_SET {
            None
        } else {
            Some(self.parent)
        }
    }

    /// Returns `true` if this node has a parent set.
    pub fn has_parent(&self) -> bool {
        self.parent != NO_PARENT_SET
    }

    pub(crate) fn set_parent(&mut self, parent: NodeIndex) {
        self.parent = parent;
    }

    pub(crate) fn clear_parent(&mut self) {
        self.parent = NO_PARENT_SET;
    }

    /// Returns the indices of this node's children, in order.
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Returns the number of direct descendants of this node.
    pub fn num_descendants(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeIndex> {
        &mut self.children
    }

    /// Returns `true` if this node is external (has no children).
    pub fn is_external(&self) -> bool {
        self.children.is_empty()
    }

    /// Returns `true` if this node is internal (has children).
    pub fn is_internal(&self) -> bool {
        !self.children.is_empty()
    }

    /// Returns the name of this node (possibly empty).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name of this node.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Returns a label for reporting: the taxonomy's string form if one is
    /// attached and non-empty, else the node name, else the bracketed id.
    pub fn label(&self) -> String {
        if let Some(tax) = &self.data.taxonomy {
            let s = tax.to_string();
            if !s.is_empty() {
                return s;
            }
        }
        if !self.name.is_empty() {
            self.name.clone()
        } else {
            format!("[{}]", self.id)
        }
    }
}

// =#========================================================================#=
// NODE DATA
// =#========================================================================#=
/// Payload attached to a [PhyloNode].
///
/// All fields are optional. `link` is a back-reference into *another* tree's
/// arena (gene-tree nodes link into the species tree); it is never ownership,
/// and stays valid across stripping because deletion detaches arena slots
/// without moving survivors.
#[derive(Debug, Clone, Default)]
pub struct NodeData {
    /// Taxonomic classification of this node
    pub taxonomy: Option<Taxonomy>,
    /// Evolutionary event reconstructed for this node
    pub event: Option<Event>,
    /// Index of the linked node in the other tree
    pub link: Option<NodeIndex>,
    /// Rendering attributes; carried but never interpreted here
    pub visual: Option<NodeVisual>,
}

impl NodeData {
    /// Returns `true` if a taxonomy is attached.
    pub fn has_taxonomy(&self) -> bool {
        self.taxonomy.is_some()
    }
}
