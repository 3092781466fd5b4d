//! Data model for rooted phylogenies and taxonomy records.
//!
//! # Tree representation
//! Trees are represented by [PhyloTree], which uses the arena pattern to
//! store [PhyloNode] nodes referenced by [NodeIndex]. Gene and species trees
//! are separate owned arenas; a gene-tree node's [NodeData::link] is a plain
//! index into the species tree's arena.
//!
//! # Node payload
//! Every node carries a [NodeData] with optional [Taxonomy], [Event], link
//! and [NodeVisual] fields. Taxonomies attached by parsers are typically
//! partial and get completed by the
//! [taxonomy](crate::taxonomy) subsystem.

pub mod event;
pub mod node;
pub mod taxonomy;
pub mod tree;
pub mod visual;

pub use event::Event;
pub use node::NodeData;
pub use node::PhyloNode;
pub use taxonomy::Identifier;
pub use taxonomy::Taxonomy;
pub use taxonomy::LINEAGE_SEPARATOR;
pub use tree::NodeIndex;
pub use tree::PhyloTree;
pub use visual::NodeVisual;
