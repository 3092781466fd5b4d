//! Error types for taxonomy resolution and reconciliation.

use crate::taxonomy::service::ServiceError;
use thiserror::Error;

/// Errors surfaced by the resolution, inference, and reconciliation jobs.
///
/// Per-node resolution failures inside
/// [enrich_tree](crate::taxonomy::resolver::TaxonomyResolver::enrich_tree) are
/// *not* reported through this type; they accumulate in the returned
/// unresolved set. Ancestral inference and GSDI treat every failure as fatal
/// for the whole job.
#[derive(Debug, Error)]
pub enum Error {
    /// The taxonomy service could not be reached.
    #[error("taxonomy service unreachable: {0}")]
    Network(String),

    /// The taxonomy service answered with a failure.
    #[error("taxonomy service error: {0}")]
    Service(String),

    /// A query returned more than one match where exactly one was required.
    #[error("ambiguous query: {0}")]
    Ambiguous(String),

    /// Zero matches where a match was required.
    #[error("not found: {0}")]
    NotFound(String),

    /// A node lacks the taxonomic data an operation requires.
    #[error("node {0} has no or inappropriate taxonomic data")]
    MissingTaxonomy(String),

    /// No taxonomic lineage could be obtained for a node.
    #[error("a taxonomic lineage for node \"{0}\" could not be found")]
    LineageUnavailable(String),

    /// Descendant lineages share no common prefix.
    #[error("no common lineage for:\n{0}")]
    NoCommonLineage(String),

    /// The gene tree does not carry enough taxonomic data to pick a
    /// comparison base.
    #[error("insufficient taxonomic data: {0}")]
    InsufficientTaxonomy(String),

    /// Two species-tree externals project to the same species key.
    #[error("taxonomy \"{0}\" is not unique in species tree")]
    DuplicateSpeciesKey(String),

    /// An internal invariant was violated; indicates a bug, not bad data.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The job was cancelled cooperatively.
    #[error("cancelled")]
    Cancelled,
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NetworkUnavailable(hint) => Error::Network(hint),
            ServiceError::Backend(detail) => Error::Service(detail),
        }
    }
}

/// Result alias for fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;
