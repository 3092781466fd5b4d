use taxodi::model::Taxonomy;
use taxodi::taxonomy::{CacheFacet, TaxonomyCache, MAX_CACHE_ENTRIES};

mod common;
use common::drome_record;

#[test]
fn test_put_populates_every_non_empty_facet() {
    let cache = TaxonomyCache::new();
    let record = drome_record();
    cache.put(&record);

    assert_eq!(cache.get(CacheFacet::Id, "7227"), Some(record.clone()));
    assert_eq!(
        cache.get(CacheFacet::ScientificName, "Drosophila melanogaster"),
        Some(record.clone())
    );
    assert_eq!(cache.get(CacheFacet::Code, "DROME"), Some(record.clone()));
    assert_eq!(
        cache.get(CacheFacet::CommonName, "fruit fly"),
        Some(record.clone())
    );
    assert_eq!(
        cache.get(
            CacheFacet::LineagePath,
            "Eukaryota>Metazoa>Arthropoda>Drosophila>Drosophila melanogaster"
        ),
        Some(record)
    );
}

#[test]
fn test_put_skips_empty_facets() {
    let cache = TaxonomyCache::new();
    let record = Taxonomy::new().with_scientific_name("Nestor notabilis");
    cache.put(&record);

    assert_eq!(cache.facet_len(CacheFacet::ScientificName), 1);
    assert_eq!(cache.facet_len(CacheFacet::Id), 0);
    assert_eq!(cache.facet_len(CacheFacet::Code), 0);
    assert_eq!(cache.facet_len(CacheFacet::CommonName), 0);
    assert_eq!(cache.facet_len(CacheFacet::LineagePath), 0);
}

#[test]
fn test_get_returns_independent_copy() {
    let cache = TaxonomyCache::new();
    cache.put(&drome_record());

    let mut copy = cache.get(CacheFacet::Code, "DROME").unwrap();
    copy.set_scientific_name("mutated");
    copy.add_synonym("not in the cache");

    let fresh = cache.get(CacheFacet::Code, "DROME").unwrap();
    assert_eq!(fresh, drome_record());
    assert!(fresh.synonyms().is_empty());
}

#[test]
fn test_capacity_sentinel_clears_only_oversized_facets() {
    let cache = TaxonomyCache::new();
    // A couple of records that also land in the code facet.
    cache.put(&Taxonomy::new().with_scientific_name("Strigops habroptilus").with_taxonomy_code("STRHA"));
    cache.put(&Taxonomy::new().with_scientific_name("Nestor notabilis").with_taxonomy_code("NESNO"));
    // Fill the scientific-name facet past capacity with synthetic entries.
    for i in 0..MAX_CACHE_ENTRIES {
        cache.put(&Taxonomy::new().with_scientific_name(format!("synthetic taxon {i}")));
    }
    assert!(cache.facet_len(CacheFacet::ScientificName) > MAX_CACHE_ENTRIES);

    cache.maybe_evict();

    assert_eq!(cache.facet_len(CacheFacet::ScientificName), 0);
    // The code facet was below capacity and keeps its entries.
    assert_eq!(cache.facet_len(CacheFacet::Code), 2);
    assert!(cache.get(CacheFacet::Code, "NESNO").is_some());
    assert!(cache
        .get(CacheFacet::ScientificName, "Nestor notabilis")
        .is_none());
}

#[test]
fn test_evict_below_capacity_is_a_no_op() {
    let cache = TaxonomyCache::new();
    cache.put(&drome_record());
    cache.maybe_evict();
    assert_eq!(cache.facet_len(CacheFacet::ScientificName), 1);
}
