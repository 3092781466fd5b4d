//! The external taxonomy database interface.

use crate::model::Taxonomy;
use thiserror::Error;

/// Maximum records requested for direct (single-taxon) lookups.
pub const MAX_RESULTS_DETAIL: usize = 10;

/// Maximum records requested for lineage disambiguation during ancestral
/// inference, where many homonymous candidates are expected.
pub const MAX_RESULTS_ANCESTRAL: usize = 100;

/// The facet a [TaxonomyService] query searches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchFacet {
    /// Identifier value (e.g. an NCBI taxon id)
    Id,
    /// Scientific name, exact
    ScientificName,
    /// Mnemonic taxonomy code (e.g. "DROME")
    Code,
    /// Common name, exact
    CommonName,
}

impl std::fmt::Display for SearchFacet {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SearchFacet::Id => write!(f, "id"),
            SearchFacet::ScientificName => write!(f, "scientific name"),
            SearchFacet::Code => write!(f, "code"),
            SearchFacet::CommonName => write!(f, "common name"),
        }
    }
}

/// Errors a [TaxonomyService] implementation reports.
///
/// Retries and per-call timeouts are the implementation's concern; by the
/// time an error reaches the core it is final and aborts the running job.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service could not be reached at all.
    #[error("taxonomy service unreachable: {0}")]
    NetworkUnavailable(String),

    /// The service was reached but answered with a failure.
    #[error("taxonomy service error: {0}")]
    Backend(String),
}

/// A searchable taxonomy database (typically a remote web service).
///
/// Implementations return up to `max_results` canonical records for an exact
/// query on the given facet; an empty list means no hit. Returned records are
/// never partial: at least the scientific name is populated whenever the
/// upstream database has it. Transport, authentication, rate limiting and
/// retries all belong to the implementation.
///
/// The call may block; it is the only suspension point inside the core's
/// algorithms. Implementations must be usable from multiple worker threads.
pub trait TaxonomyService: Send + Sync {
    /// Searches the database for records whose `facet` equals `query`.
    fn search(
        &self,
        facet: SearchFacet,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Taxonomy>, ServiceError>;
}
