use taxodi::model::{PhyloTree, Taxonomy};
use taxodi::taxonomy::{
    CacheFacet, QueryKind, SearchFacet, TaxonomyCache, TaxonomyResolver, MAX_RESULTS_DETAIL,
};
use taxodi::{CancelToken, Error};

mod common;
use common::{drome_record, external_with_sn, ScriptedService, UnreachableService};

// --- STRATEGY SELECTION ---

#[test]
fn test_resolve_prefers_appropriate_id() {
    let service = ScriptedService::new().respond(SearchFacet::Id, "7227", vec![drome_record()]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    // Scientific name and code are present too, but the id wins.
    let tax = Taxonomy::new()
        .with_identifier("7227", "ncbi")
        .with_scientific_name("Drosophila melanogaster")
        .with_taxonomy_code("DROME");
    let resolution = resolver.resolve(&tax).unwrap().unwrap();

    assert_eq!(resolution.queried, QueryKind::Id);
    assert_eq!(resolution.record, drome_record());
    assert_eq!(service.calls(), vec![(SearchFacet::Id, "7227".to_string())]);
}

#[test]
fn test_resolve_unrecognized_provider_falls_through_to_name() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new()
        .with_identifier("x17", "inhouse")
        .with_scientific_name("Drosophila melanogaster");
    let resolution = resolver.resolve(&tax).unwrap().unwrap();

    assert_eq!(resolution.queried, QueryKind::ScientificName);
}

#[test]
fn test_resolve_lineage_preferred_over_scientific_name() {
    let record = Taxonomy::new()
        .with_identifier("7215", "ncbi")
        .with_scientific_name("Drosophila")
        .with_rank("genus")
        .with_lineage(["Eukaryota", "Metazoa", "Drosophila"]);
    let service =
        ScriptedService::new().respond(SearchFacet::ScientificName, "Drosophila", vec![record]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new()
        .with_scientific_name("Drosophila")
        .with_lineage(["Eukaryota", "Metazoa", "Drosophila"]);
    let resolution = resolver.resolve(&tax).unwrap().unwrap();

    assert_eq!(resolution.queried, QueryKind::Lineage);
    // The lineage strategy searches the service by the last lineage element.
    assert_eq!(
        service.calls(),
        vec![(SearchFacet::ScientificName, "Drosophila".to_string())]
    );
}

#[test]
fn test_resolve_falls_back_to_code_then_common_name() {
    let service =
        ScriptedService::new().respond(SearchFacet::CommonName, "fruit fly", vec![drome_record()]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new().with_common_name("fruit fly");
    let resolution = resolver.resolve(&tax).unwrap().unwrap();
    assert_eq!(resolution.queried, QueryKind::CommonName);
}

#[test]
fn test_resolve_nothing_queryable_is_unresolved() {
    let service = ScriptedService::new();
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new().with_rank("genus");
    assert!(resolver.resolve(&tax).unwrap().is_none());
    assert_eq!(service.num_calls(), 0);
}

// --- EXACTLY-ONE ACCEPTANCE ---

#[test]
fn test_multiple_service_records_leave_unresolved() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record(), drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new().with_scientific_name("Drosophila melanogaster");
    assert!(resolver.resolve(&tax).unwrap().is_none());
    // An ambiguous answer must not populate the cache.
    assert_eq!(cache.facet_len(CacheFacet::ScientificName), 0);
}

#[test]
fn test_single_record_is_cached_under_all_facets() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let tax = Taxonomy::new().with_scientific_name("Drosophila melanogaster");
    resolver.resolve(&tax).unwrap().unwrap();

    // A second resolve by a different facet hits the cache; no new call.
    let by_code = Taxonomy::new().with_taxonomy_code("DROME");
    let resolution = resolver.resolve(&by_code).unwrap().unwrap();
    assert_eq!(resolution.record, drome_record());
    assert_eq!(service.num_calls(), 1);
}

// --- LINEAGE DISAMBIGUATION ---

fn fly_genus() -> Taxonomy {
    Taxonomy::new()
        .with_identifier("7215", "ncbi")
        .with_scientific_name("Drosophila")
        .with_rank("genus")
        .with_lineage(["Eukaryota", "Metazoa", "Drosophila"])
}

fn homonym_genus() -> Taxonomy {
    Taxonomy::new()
        .with_identifier("122101", "ncbi")
        .with_scientific_name("Drosophila")
        .with_lineage(["Eukaryota", "Metazoa", "Drosophyllum"])
}

#[test]
fn test_lineage_disambiguation_selects_matching_record() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila",
        vec![homonym_genus(), fly_genus()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let lineage: Vec<String> = ["Eukaryota", "Metazoa", "Drosophila"]
        .into_iter()
        .map(String::from)
        .collect();
    let record = resolver
        .lookup_lineage(&lineage, MAX_RESULTS_DETAIL)
        .unwrap()
        .unwrap();
    assert_eq!(record, fly_genus());

    // Cached under all facets: a later id query makes no service call.
    let calls_before = service.num_calls();
    let by_id = Taxonomy::new().with_identifier("7215", "ncbi");
    let resolution = resolver.resolve(&by_id).unwrap().unwrap();
    assert_eq!(resolution.record, fly_genus());
    assert_eq!(service.num_calls(), calls_before);
}

#[test]
fn test_lineage_match_is_case_insensitive() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila",
        vec![fly_genus()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let lineage: Vec<String> = ["eukaryota", "METAZOA", "Drosophila"]
        .into_iter()
        .map(String::from)
        .collect();
    assert!(resolver
        .lookup_lineage(&lineage, MAX_RESULTS_DETAIL)
        .unwrap()
        .is_some());
}

#[test]
fn test_lineage_ambiguous_when_two_records_match() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila",
        vec![fly_genus(), fly_genus()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let lineage: Vec<String> = ["Eukaryota", "Metazoa", "Drosophila"]
        .into_iter()
        .map(String::from)
        .collect();
    let err = resolver
        .lookup_lineage(&lineage, MAX_RESULTS_DETAIL)
        .unwrap_err();
    assert!(matches!(err, Error::Ambiguous(_)));
}

#[test]
fn test_lineage_not_found_when_no_candidate_matches() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila",
        vec![homonym_genus()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let lineage: Vec<String> = ["Eukaryota", "Metazoa", "Drosophila"]
        .into_iter()
        .map(String::from)
        .collect();
    let err = resolver
        .lookup_lineage(&lineage, MAX_RESULTS_DETAIL)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn test_lineage_empty_service_answer_is_unresolved() {
    let service = ScriptedService::new();
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let lineage: Vec<String> = ["Eukaryota", "Metazoa", "Drosophila"]
        .into_iter()
        .map(String::from)
        .collect();
    assert!(resolver
        .lookup_lineage(&lineage, MAX_RESULTS_DETAIL)
        .unwrap()
        .is_none());
}

// --- ENRICHMENT ---

#[test]
fn test_enrich_fills_only_empty_fields() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = external_with_sn(&mut tree, "dm", "Drosophila melanogaster");
    let other = external_with_sn(&mut tree, "other", "Drosophila melanogaster");
    tree.add_root(&[dm, other]);
    // One node already carries a common name; it must survive enrichment.
    tree[dm]
        .data
        .taxonomy
        .as_mut()
        .unwrap()
        .set_common_name("banana fly");

    let unresolved = resolver.enrich_tree(&mut tree, false, false).unwrap();
    assert!(unresolved.is_empty());

    let enriched = tree[dm].data.taxonomy.as_ref().unwrap();
    assert_eq!(enriched.common_name(), "banana fly");
    assert_eq!(enriched.taxonomy_code(), "DROME");
    assert_eq!(enriched.rank(), "species");
    assert_eq!(enriched.identifier().unwrap().value(), "7227");
    assert_eq!(enriched.lineage(), drome_record().lineage());

    let plain = tree[other].data.taxonomy.as_ref().unwrap();
    assert_eq!(plain.common_name(), "fruit fly");
}

#[test]
fn test_enrich_replaces_stale_lineage() {
    let service =
        ScriptedService::new().respond(SearchFacet::Code, "DROME", vec![drome_record()]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = tree.add_external("dm");
    tree[dm].data.taxonomy = Some(
        Taxonomy::new()
            .with_taxonomy_code("DROME")
            .with_lineage(["Stale", "Lineage"]),
    );
    let other = external_with_sn(&mut tree, "other", "ignored");
    tree.add_root(&[dm, other]);

    resolver.enrich_tree(&mut tree, false, false).unwrap();
    let enriched = tree[dm].data.taxonomy.as_ref().unwrap();
    assert_eq!(enriched.lineage(), drome_record().lineage());
}

#[test]
fn test_enrich_keeps_existing_rank() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = external_with_sn(&mut tree, "dm", "Drosophila melanogaster");
    let other = external_with_sn(&mut tree, "other", "Drosophila melanogaster");
    tree.add_root(&[dm, other]);
    // A rank set on the input survives; the record's "species" does not win.
    tree[dm].data.taxonomy.as_mut().unwrap().set_rank("subspecies");

    resolver.enrich_tree(&mut tree, false, false).unwrap();
    assert_eq!(tree[dm].data.taxonomy.as_ref().unwrap().rank(), "subspecies");
    assert_eq!(tree[other].data.taxonomy.as_ref().unwrap().rank(), "species");
}

#[test]
fn test_enrich_bare_names_attach_taxonomy_and_clear_name() {
    let service = ScriptedService::new()
        // Not a scientific name, but the code lookup hits.
        .respond(SearchFacet::Code, "DROME", vec![drome_record()]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = tree.add_external("DROME");
    let other = tree.add_external("DROME");
    tree.add_root(&[dm, other]);

    let unresolved = resolver.enrich_tree(&mut tree, false, true).unwrap();
    assert!(unresolved.is_empty());
    let tax = tree[dm].data.taxonomy.as_ref().unwrap();
    assert_eq!(tax.scientific_name(), "Drosophila melanogaster");
    assert_eq!(tax.taxonomy_code(), "DROME");
    assert_eq!(tree[dm].name(), "");
}

#[test]
fn test_enrich_bare_names_ignored_without_permission() {
    let service = ScriptedService::new().respond(SearchFacet::Code, "DROME", vec![drome_record()]);
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = tree.add_external("DROME");
    let other = tree.add_external("DROME");
    tree.add_root(&[dm, other]);

    let unresolved = resolver.enrich_tree(&mut tree, false, false).unwrap();
    assert_eq!(unresolved.len(), 1);
    assert!(unresolved.contains("DROME"));
    assert!(tree[dm].data.taxonomy.is_none());
}

#[test]
fn test_enrich_collects_unresolved_labels_sorted() {
    let service = ScriptedService::new();
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let zebra = external_with_sn(&mut tree, "", "Zebrasoma");
    let aardvark = external_with_sn(&mut tree, "", "Orycteropus afer");
    tree.add_root(&[zebra, aardvark]);

    let unresolved = resolver.enrich_tree(&mut tree, false, false).unwrap();
    let labels: Vec<&String> = unresolved.iter().collect();
    assert_eq!(labels, ["Orycteropus afer", "Zebrasoma"]);
}

#[test]
fn test_enrich_deletes_unresolved_externals_in_deferred_pass() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = external_with_sn(&mut tree, "dm", "Drosophila melanogaster");
    let ghost = external_with_sn(&mut tree, "ghost", "No such taxon");
    let bare = tree.add_external("unnamedless");
    let inner = tree.add_internal(&[ghost, bare]);
    tree.add_root(&[dm, inner]);
    tree.preorder_reid();

    let unresolved = resolver.enrich_tree(&mut tree, true, false).unwrap();
    assert_eq!(unresolved.len(), 2);
    assert!(unresolved.contains("No such taxon"));
    assert!(unresolved.contains("unnamedless"));

    // Both unresolved externals were removed and the chain collapsed.
    assert!(tree.is_valid());
    assert_eq!(tree.num_externals(), 1);
    let externals: Vec<_> = tree.externals_forward_iter().collect();
    assert_eq!(externals, vec![dm]);
    // Ids are dense again after the rehash.
    assert_eq!(tree[tree.root_index()].id(), 0);
}

#[test]
fn test_enrich_network_failure_aborts() {
    let service = UnreachableService;
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let a = external_with_sn(&mut tree, "a", "Apis mellifera");
    let b = external_with_sn(&mut tree, "b", "Bombus terrestris");
    tree.add_root(&[a, b]);

    let err = resolver.enrich_tree(&mut tree, false, false).unwrap_err();
    assert!(matches!(err, Error::Network(_)));
}

#[test]
fn test_enrich_ambiguous_lineage_is_non_fatal() {
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila",
        vec![fly_genus(), fly_genus()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let fly = tree.add_external("fly");
    tree[fly].data.taxonomy = Some(
        Taxonomy::new()
            .with_scientific_name("Drosophila")
            .with_lineage(["Eukaryota", "Metazoa", "Drosophila"]),
    );
    let other = external_with_sn(&mut tree, "other", "Ignored");
    tree.add_root(&[fly, other]);

    let unresolved = resolver.enrich_tree(&mut tree, false, false).unwrap();
    assert!(unresolved.contains("Drosophila"));
}

#[test]
fn test_enrich_cancelled_job_aborts() {
    let service = ScriptedService::new();
    let cache = TaxonomyCache::new();
    let token = CancelToken::new();
    token.cancel();
    let resolver = TaxonomyResolver::new(&service, &cache).with_cancel_token(token);

    let mut tree = PhyloTree::new();
    let a = external_with_sn(&mut tree, "a", "Apis mellifera");
    let b = external_with_sn(&mut tree, "b", "Bombus terrestris");
    tree.add_root(&[a, b]);

    let err = resolver.enrich_tree(&mut tree, false, false).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn test_enrichment_never_loses_information() {
    // Law: after enrichment, the non-empty fields of a resolved taxonomy are
    // a superset of what the input carried.
    let service = ScriptedService::new().respond(
        SearchFacet::ScientificName,
        "Drosophila melanogaster",
        vec![drome_record()],
    );
    let cache = TaxonomyCache::new();
    let resolver = TaxonomyResolver::new(&service, &cache);

    let mut tree = PhyloTree::new();
    let dm = external_with_sn(&mut tree, "dm", "Drosophila melanogaster");
    let other = external_with_sn(&mut tree, "other", "Drosophila melanogaster");
    tree.add_root(&[dm, other]);
    {
        let tax = tree[dm].data.taxonomy.as_mut().unwrap();
        tax.set_common_name("banana fly");
        tax.add_synonym("Sophophora melanogaster");
    }
    let before = tree[dm].data.taxonomy.clone().unwrap();

    resolver.enrich_tree(&mut tree, false, false).unwrap();
    let after = tree[dm].data.taxonomy.as_ref().unwrap();

    assert_eq!(after.scientific_name(), before.scientific_name());
    assert_eq!(after.common_name(), before.common_name());
    assert!(after
        .synonyms()
        .contains(&"Sophophora melanogaster".to_string()));
    assert!(!after.taxonomy_code().is_empty());
    assert!(after.identifier().is_some());
}
