//! Taxonomy resolution: cache, service interface, resolver, and ancestral
//! inference.
//!
//! # Flow
//! 1. A [TaxonomyResolver] completes the partial taxonomies parsers attach to
//!    tree nodes, looking records up in the shared [TaxonomyCache] and, on
//!    miss, through the injected [TaxonomyService].
//! 2. An [AncestralTaxonomyInferer] assigns taxonomies to internal nodes from
//!    the common lineage prefix of their descendants, reusing the same cache.
//!
//! The cache is one explicitly-constructed value shared by all concurrently
//! running jobs; every operation on it is atomic, and jobs tolerate seeing
//! each other's insertions because cached records are canonical.

pub mod ancestral;
pub mod cache;
pub mod resolver;
pub mod service;

pub use ancestral::AncestralTaxonomyInferer;
pub use cache::CacheFacet;
pub use cache::TaxonomyCache;
pub use cache::MAX_CACHE_ENTRIES;
pub use resolver::QueryKind;
pub use resolver::Resolution;
pub use resolver::TaxonomyResolver;
pub use service::SearchFacet;
pub use service::ServiceError;
pub use service::TaxonomyService;
pub use service::MAX_RESULTS_ANCESTRAL;
pub use service::MAX_RESULTS_DETAIL;
