//! Shared cache of canonical taxonomy records.

use crate::model::Taxonomy;
use crate::taxonomy::service::SearchFacet;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::debug;

/// Maximum number of entries a single facet map may hold before
/// [TaxonomyCache::maybe_evict] wholesale-clears it.
pub const MAX_CACHE_ENTRIES: usize = 100_000;

/// The five indices of the [TaxonomyCache].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFacet {
    Id,
    ScientificName,
    Code,
    CommonName,
    /// The lineage joined with `">"`
    LineagePath,
}

impl From<SearchFacet> for CacheFacet {
    fn from(facet: SearchFacet) -> Self {
        match facet {
            SearchFacet::Id => CacheFacet::Id,
            SearchFacet::ScientificName => CacheFacet::ScientificName,
            SearchFacet::Code => CacheFacet::Code,
            SearchFacet::CommonName => CacheFacet::CommonName,
        }
    }
}

/// All five facet maps; guarded as a whole by one mutex.
#[derive(Debug, Default)]
struct FacetMaps {
    by_id: HashMap<String, Taxonomy>,
    by_scientific_name: HashMap<String, Taxonomy>,
    by_code: HashMap<String, Taxonomy>,
    by_common_name: HashMap<String, Taxonomy>,
    by_lineage_path: HashMap<String, Taxonomy>,
}

impl FacetMaps {
    fn map(&self, facet: CacheFacet) -> &HashMap<String, Taxonomy> {
        match facet {
            CacheFacet::Id => &self.by_id,
            CacheFacet::ScientificName => &self.by_scientific_name,
            CacheFacet::Code => &self.by_code,
            CacheFacet::CommonName => &self.by_common_name,
            CacheFacet::LineagePath => &self.by_lineage_path,
        }
    }

    fn map_mut(&mut self, facet: CacheFacet) -> &mut HashMap<String, Taxonomy> {
        match facet {
            CacheFacet::Id => &mut self.by_id,
            CacheFacet::ScientificName => &mut self.by_scientific_name,
            CacheFacet::Code => &mut self.by_code,
            CacheFacet::CommonName => &mut self.by_common_name,
            CacheFacet::LineagePath => &mut self.by_lineage_path,
        }
    }
}

const ALL_FACETS: [CacheFacet; 5] = [
    CacheFacet::Id,
    CacheFacet::ScientificName,
    CacheFacet::Code,
    CacheFacet::CommonName,
    CacheFacet::LineagePath,
];

// =#========================================================================#=
// TAXONOMY CACHE
// =#========================================================================#=
/// A process-wide cache of canonical taxonomy records, keyed by five
/// alternate facets.
///
/// One explicitly-constructed value is threaded through the resolvers of all
/// concurrently running jobs; every public operation is a single critical
/// section under one mutex. Operations do not compose: a get-then-put pair
/// may interleave with another job's put, which is safe because cached
/// values are canonical.
///
/// Capacity is a sentinel, not an LRU: when a facet map exceeds
/// [MAX_CACHE_ENTRIES], [maybe_evict](TaxonomyCache::maybe_evict) clears that
/// facet entirely. A reader may observe the clear between two adjacent
/// operations.
#[derive(Debug, Default)]
pub struct TaxonomyCache {
    maps: Mutex<FacetMaps>,
}

impl TaxonomyCache {
    /// Creates a new, empty cache.
    pub fn new() -> Self {
        TaxonomyCache::default()
    }

    /// Looks up a record by facet key, returning a deep copy the caller may
    /// mutate freely.
    pub fn get(&self, facet: CacheFacet, key: &str) -> Option<Taxonomy> {
        self.maps.lock().map(facet).get(key).cloned()
    }

    /// Inserts a record into every facet map whose corresponding field on the
    /// record is non-empty, so later lookups via any facet succeed.
    pub fn put(&self, taxonomy: &Taxonomy) {
        let mut maps = self.maps.lock();
        if let Some(id) = taxonomy.identifier() {
            if !id.value().is_empty() {
                maps.by_id.insert(id.value().to_string(), taxonomy.clone());
            }
        }
        if !taxonomy.scientific_name().is_empty() {
            maps.by_scientific_name
                .insert(taxonomy.scientific_name().to_string(), taxonomy.clone());
        }
        if !taxonomy.taxonomy_code().is_empty() {
            maps.by_code
                .insert(taxonomy.taxonomy_code().to_string(), taxonomy.clone());
        }
        if !taxonomy.common_name().is_empty() {
            maps.by_common_name
                .insert(taxonomy.common_name().to_string(), taxonomy.clone());
        }
        if !taxonomy.lineage().is_empty() {
            maps.by_lineage_path
                .insert(taxonomy.lineage_path(), taxonomy.clone());
        }
    }

    /// Clears every facet map that has grown beyond [MAX_CACHE_ENTRIES].
    ///
    /// Called before a batch of insertions (tree enrichment, ancestral
    /// inference) rather than on every put.
    pub fn maybe_evict(&self) {
        let mut maps = self.maps.lock();
        for facet in ALL_FACETS {
            let map = maps.map_mut(facet);
            if map.len() > MAX_CACHE_ENTRIES {
                debug!("clearing taxonomy cache facet {:?} ({} entries)", facet, map.len());
                map.clear();
            }
        }
    }

    /// Returns the number of entries currently held by a facet.
    pub fn facet_len(&self, facet: CacheFacet) -> usize {
        self.maps.lock().map(facet).len()
    }

    /// Drops every entry from every facet.
    pub fn clear(&self) {
        let mut maps = self.maps.lock();
        for facet in ALL_FACETS {
            maps.map_mut(facet).clear();
        }
    }
}
