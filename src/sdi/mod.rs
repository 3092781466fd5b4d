//! Speciation/duplication inference over a gene tree and a species tree.
//!
//! [SpeciesMapper] binds gene-tree externals to species-tree externals under
//! a [ComparisonBase] projection; [Gsdi] then computes the
//! least-common-ancestor mapping and event classification for every internal
//! gene node. The gene tree is mutated in place (every internal node gains
//! an [Event](crate::model::Event) and a link) and the counters come back in
//! a [GsdiSummary].

pub mod gsdi;
pub mod species_mapper;

pub use gsdi::Gsdi;
pub use gsdi::GsdiSummary;
pub use species_mapper::determine_comparison_base;
pub use species_mapper::species_key;
pub use species_mapper::ComparisonBase;
pub use species_mapper::MappingOutcome;
pub use species_mapper::SpeciesMapper;
