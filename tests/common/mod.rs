//! Shared helpers for the integration tests: a scripted in-memory
//! taxonomy service and small tree/taxonomy builders.
#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::HashMap;
use taxodi::model::{NodeIndex, PhyloTree, Taxonomy};
use taxodi::taxonomy::{SearchFacet, ServiceError, TaxonomyService};

/// A taxonomy service whose answers are scripted per (facet, query) pair.
/// Unscripted queries return an empty result. Every call is recorded.
#[derive(Default)]
pub struct ScriptedService {
    responses: HashMap<(SearchFacet, String), Vec<Taxonomy>>,
    calls: Mutex<Vec<(SearchFacet, String)>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        ScriptedService::default()
    }

    /// Scripts the records returned for a query, builder style.
    pub fn respond(
        mut self,
        facet: SearchFacet,
        query: &str,
        records: Vec<Taxonomy>,
    ) -> Self {
        self.responses.insert((facet, query.to_string()), records);
        self
    }

    /// Number of service calls made so far.
    pub fn num_calls(&self) -> usize {
        self.calls.lock().len()
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<(SearchFacet, String)> {
        self.calls.lock().clone()
    }
}

impl TaxonomyService for ScriptedService {
    fn search(
        &self,
        facet: SearchFacet,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<Taxonomy>, ServiceError> {
        self.calls.lock().push((facet, query.to_string()));
        let records = self
            .responses
            .get(&(facet, query.to_string()))
            .cloned()
            .unwrap_or_default();
        Ok(records.into_iter().take(max_results).collect())
    }
}

/// A service that is never reachable.
pub struct UnreachableService;

impl TaxonomyService for UnreachableService {
    fn search(
        &self,
        _facet: SearchFacet,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<Taxonomy>, ServiceError> {
        Err(ServiceError::NetworkUnavailable(
            "connection refused".to_string(),
        ))
    }
}

/// Adds an external node carrying a taxonomy with just a code.
pub fn external_with_code(tree: &mut PhyloTree, name: &str, code: &str) -> NodeIndex {
    let index = tree.add_external(name);
    tree[index].data.taxonomy = Some(Taxonomy::new().with_taxonomy_code(code));
    index
}

/// Adds an external node carrying a taxonomy with just a scientific name.
pub fn external_with_sn(tree: &mut PhyloTree, name: &str, sn: &str) -> NodeIndex {
    let index = tree.add_external(name);
    tree[index].data.taxonomy = Some(Taxonomy::new().with_scientific_name(sn));
    index
}

/// The canonical fruit fly record used across the resolver tests.
pub fn drome_record() -> Taxonomy {
    Taxonomy::new()
        .with_identifier("7227", "ncbi")
        .with_scientific_name("Drosophila melanogaster")
        .with_taxonomy_code("DROME")
        .with_common_name("fruit fly")
        .with_rank("species")
        .with_lineage([
            "Eukaryota",
            "Metazoa",
            "Arthropoda",
            "Drosophila",
            "Drosophila melanogaster",
        ])
}
