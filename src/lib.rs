//! Gene-tree/species-tree reconciliation and taxonomy resolution.
//!
//! This crate provides the two tightly coupled cores of a phylogenetics
//! reconciliation pipeline:
//!
//! * **GSDI**: generalized speciation/duplication inference: map every
//!   internal node of a rooted binary gene tree onto a rooted species tree
//!   (arbitrary branching) under the least-common-ancestor mapping and
//!   classify it as a speciation, duplication, or ambiguous event.
//! * **Taxonomy resolution**: cached lookups of canonical taxonomy records
//!   through a pluggable [TaxonomyService], in-place enrichment of node
//!   taxonomies, and ancestral taxonomy inference from descendants' common
//!   lineage.
//!
//! Tree I/O is out of scope: trees are constructed through the
//! [model](crate::model) API (typically by an external parser) and handed in
//! as owned arenas. The only external capabilities the crate consumes are a
//! [TaxonomyService] and a [UserNotifier].
//!
//! # Example
//! ```
//! use taxodi::model::{PhyloTree, Taxonomy};
//! use taxodi::sdi::Gsdi;
//!
//! // Species tree (A,B)S and gene tree (a1,b1)G.
//! let mut species = PhyloTree::new();
//! let a = species.add_external("A");
//! let b = species.add_external("B");
//! species.add_root(&[a, b]);
//! species[a].data.taxonomy = Some(Taxonomy::new().with_taxonomy_code("AAA"));
//! species[b].data.taxonomy = Some(Taxonomy::new().with_taxonomy_code("BBB"));
//!
//! let mut gene = PhyloTree::new();
//! let a1 = gene.add_external("a1");
//! let b1 = gene.add_external("b1");
//! gene.add_root(&[a1, b1]);
//! gene[a1].data.taxonomy = Some(Taxonomy::new().with_taxonomy_code("AAA"));
//! gene[b1].data.taxonomy = Some(Taxonomy::new().with_taxonomy_code("BBB"));
//!
//! let summary = Gsdi::new().run(&mut gene, &mut species).unwrap();
//! assert_eq!(summary.speciations(), 1);
//! assert_eq!(summary.duplications(), 0);
//! ```

pub mod cancel;
pub mod error;
pub mod model;
pub mod notify;
pub mod sdi;
pub mod taxonomy;

pub use cancel::CancelToken;
pub use error::{Error, Result};
pub use notify::UserNotifier;
pub use taxonomy::service::TaxonomyService;
