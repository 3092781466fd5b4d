//! Cached resolution of partial taxonomies against the taxonomy service.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::model::taxonomy::LINEAGE_SEPARATOR;
use crate::model::{Identifier, NodeIndex, PhyloTree, Taxonomy};
use crate::taxonomy::cache::{CacheFacet, TaxonomyCache};
use crate::taxonomy::service::{SearchFacet, TaxonomyService, MAX_RESULTS_DETAIL};
use std::collections::BTreeSet;
use tracing::debug;

// =#========================================================================#=
// RESOLUTION
// =#========================================================================#=
/// The strategy that produced a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Id,
    ScientificName,
    Code,
    CommonName,
    Lineage,
}

/// A successful lookup: the canonical record plus the facet it was found by.
///
/// The queried facet matters for enrichment, which must leave the queried
/// field of the node's taxonomy alone.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The canonical record (the caller's own copy)
    pub record: Taxonomy,
    /// The strategy that found it
    pub queried: QueryKind,
}

// =#========================================================================#=
// TAXONOMY RESOLVER
// =#========================================================================#=
/// Resolves partial taxonomies to canonical records, via the shared
/// [TaxonomyCache] and, on miss, the [TaxonomyService].
///
/// Strategies are ordered by the strongest identifier available on the input:
/// an appropriate id wins, then a scientific name *with* a lineage (resolved
/// through lineage disambiguation), then scientific name, taxonomy code, and
/// finally common name. A service answer is accepted only when it contains
/// exactly one record; anything else leaves the input unresolved.
///
/// The resolver is cheap to construct; build one per job and share the cache
/// across jobs.
pub struct TaxonomyResolver<'a, S: TaxonomyService> {
    service: &'a S,
    cache: &'a TaxonomyCache,
    cancel: CancelToken,
}

impl<'a, S: TaxonomyService> TaxonomyResolver<'a, S> {
    /// Creates a resolver over the given service and shared cache.
    pub fn new(service: &'a S, cache: &'a TaxonomyCache) -> Self {
        TaxonomyResolver {
            service,
            cache,
            cancel: CancelToken::new(),
        }
    }

    /// Attaches a cancellation token, checked before every service call.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cache this resolver populates.
    pub fn cache(&self) -> &TaxonomyCache {
        self.cache
    }

    /// Resolves a taxonomy to its canonical record.
    ///
    /// Strategy priority: appropriate id; scientific name plus lineage
    /// (lineage disambiguation); scientific name; taxonomy code; common
    /// name. Returns `Ok(None)` for an unresolved input, including one with
    /// no queryable facet at all.
    ///
    /// # Errors
    /// [Error::Ambiguous] / [Error::NotFound] from lineage disambiguation,
    /// and service/cancellation failures.
    pub fn resolve(&self, taxonomy: &Taxonomy) -> Result<Option<Resolution>> {
        if taxonomy.has_appropriate_id() {
            let id = taxonomy.identifier().unwrap().value().to_string();
            return self.resolve_by(SearchFacet::Id, &id, QueryKind::Id);
        }
        if !taxonomy.scientific_name().is_empty() {
            if !taxonomy.lineage().is_empty() {
                let record = self.lookup_lineage(taxonomy.lineage(), MAX_RESULTS_DETAIL)?;
                return Ok(record.map(|record| Resolution {
                    record,
                    queried: QueryKind::Lineage,
                }));
            }
            return self.resolve_by(
                SearchFacet::ScientificName,
                taxonomy.scientific_name(),
                QueryKind::ScientificName,
            );
        }
        if !taxonomy.taxonomy_code().is_empty() {
            return self.resolve_by(SearchFacet::Code, taxonomy.taxonomy_code(), QueryKind::Code);
        }
        if !taxonomy.common_name().is_empty() {
            return self.resolve_by(
                SearchFacet::CommonName,
                taxonomy.common_name(),
                QueryKind::CommonName,
            );
        }
        Ok(None)
    }

    /// Resolves a taxonomy without ever using the lineage strategy: id,
    /// then scientific name, then code, then common name.
    ///
    /// This is the ordering ancestral inference uses for its internal
    /// lookups, where the lineage is the query being built in the first
    /// place.
    pub fn resolve_basic(&self, taxonomy: &Taxonomy) -> Result<Option<Resolution>> {
        if taxonomy.has_appropriate_id() {
            let id = taxonomy.identifier().unwrap().value().to_string();
            return self.resolve_by(SearchFacet::Id, &id, QueryKind::Id);
        }
        if !taxonomy.scientific_name().is_empty() {
            return self.resolve_by(
                SearchFacet::ScientificName,
                taxonomy.scientific_name(),
                QueryKind::ScientificName,
            );
        }
        if !taxonomy.taxonomy_code().is_empty() {
            return self.resolve_by(SearchFacet::Code, taxonomy.taxonomy_code(), QueryKind::Code);
        }
        if !taxonomy.common_name().is_empty() {
            return self.resolve_by(
                SearchFacet::CommonName,
                taxonomy.common_name(),
                QueryKind::CommonName,
            );
        }
        Ok(None)
    }

    /// Resolves a bare node name by trying it as a scientific name, then a
    /// taxonomy code, then a common name. First hit wins.
    pub fn resolve_name(&self, name: &str) -> Result<Option<Resolution>> {
        if name.is_empty() {
            return Ok(None);
        }
        if let Some(resolution) =
            self.resolve_by(SearchFacet::ScientificName, name, QueryKind::ScientificName)?
        {
            return Ok(Some(resolution));
        }
        if let Some(resolution) = self.resolve_by(SearchFacet::Code, name, QueryKind::Code)? {
            return Ok(Some(resolution));
        }
        self.resolve_by(SearchFacet::CommonName, name, QueryKind::CommonName)
    }

    fn resolve_by(
        &self,
        facet: SearchFacet,
        query: &str,
        queried: QueryKind,
    ) -> Result<Option<Resolution>> {
        Ok(self
            .lookup(facet, query)?
            .map(|record| Resolution { record, queried }))
    }

    /// One cached lookup: cache first, service on miss, exactly-one
    /// acceptance, cross-facet cache population.
    fn lookup(&self, facet: SearchFacet, query: &str) -> Result<Option<Taxonomy>> {
        if let Some(hit) = self.cache.get(facet.into(), query) {
            return Ok(Some(hit));
        }
        self.cancel.check()?;
        debug!("query by {}: {}", facet, query);
        let records = self.service.search(facet, query, MAX_RESULTS_DETAIL)?;
        if records.len() == 1 {
            let record = records.into_iter().next().unwrap();
            self.cache.put(&record);
            Ok(Some(record))
        } else {
            if records.len() > 1 {
                debug!("{} matches for {} \"{}\", unresolved", records.len(), facet, query);
            }
            Ok(None)
        }
    }

    /// Looks up a full lineage, disambiguating homonymous scientific names.
    ///
    /// The service is asked for taxonomies matching the last lineage element;
    /// a returned record matches iff its lineage equals the query at every
    /// query index (case-insensitive). Exactly one match is cached under all
    /// facets and returned; `Ok(None)` means the service had no candidates at
    /// all.
    ///
    /// # Errors
    /// [Error::Ambiguous] if several candidates match the query lineage,
    /// [Error::NotFound] if candidates exist but none matches.
    pub fn lookup_lineage(
        &self,
        lineage: &[String],
        max_results: usize,
    ) -> Result<Option<Taxonomy>> {
        let key = lineage.join(LINEAGE_SEPARATOR);
        if let Some(hit) = self.cache.get(CacheFacet::LineagePath, &key) {
            return Ok(Some(hit));
        }
        let Some(last) = lineage.last() else {
            return Ok(None);
        };
        self.cancel.check()?;
        debug!("query by lineage: {}", key);
        let candidates = self
            .service
            .search(SearchFacet::ScientificName, last, max_results)?;
        if candidates.is_empty() {
            return Ok(None);
        }
        let mut matched: Option<Taxonomy> = None;
        for candidate in candidates {
            let matches = lineage.iter().enumerate().all(|(i, element)| {
                candidate
                    .lineage()
                    .get(i)
                    .is_some_and(|c| c.eq_ignore_ascii_case(element))
            });
            if matches {
                if matched.is_some() {
                    return Err(Error::Ambiguous(format!(
                        "lineage \"{}\" is not unique",
                        lineage.join(" > ")
                    )));
                }
                matched = Some(candidate);
            }
        }
        let Some(record) = matched else {
            return Err(Error::NotFound(format!(
                "lineage \"{}\" not found",
                lineage.join(" > ")
            )));
        };
        self.cache.put(&record);
        Ok(Some(record))
    }

    // ------------------------------------------------------------------
    // Tree enrichment
    // ------------------------------------------------------------------

    /// Walks the tree in postorder and completes every node's taxonomy from
    /// its canonical record.
    ///
    /// Nodes that cannot be resolved contribute a label to the returned
    /// sorted set; with `delete_unresolved_externals` those of them that are
    /// external are removed from the tree in one deferred pass (followed by a
    /// preorder re-numbering). With `allow_bare_node_names`, nodes without a
    /// taxonomy but with a name are resolved through
    /// [resolve_name](TaxonomyResolver::resolve_name); on success a fresh
    /// taxonomy is attached and the name cleared.
    ///
    /// Per-node failures (including ambiguous or unmatched lineages) are
    /// non-fatal and only grow the unresolved set. Service failures and
    /// cancellation abort the whole walk.
    pub fn enrich_tree(
        &self,
        tree: &mut PhyloTree,
        delete_unresolved_externals: bool,
        allow_bare_node_names: bool,
    ) -> Result<BTreeSet<String>> {
        self.cache.maybe_evict();
        let mut not_found: BTreeSet<String> = BTreeSet::new();
        let mut marked: Vec<NodeIndex> = Vec::new();
        let order: Vec<NodeIndex> = tree.post_order_iter().collect();
        for index in order {
            self.cancel.check()?;
            let is_external = tree[index].is_external();
            let name = tree[index].name().to_string();
            let id = tree[index].id();
            match tree[index].data.taxonomy.clone() {
                Some(taxonomy) => {
                    if !taxonomy.is_resolvable() {
                        // Nothing to query by; leave the node untouched.
                        continue;
                    }
                    match self.resolve_non_fatal(&taxonomy)? {
                        Some(resolution) => {
                            let tax = tree[index].data.taxonomy.as_mut().unwrap();
                            apply_record(tax, &resolution.record, Some(resolution.queried), is_external);
                        }
                        None => {
                            not_found.insert(unresolved_label(&taxonomy, &name, id));
                            if delete_unresolved_externals && is_external {
                                marked.push(index);
                            }
                        }
                    }
                }
                None if allow_bare_node_names && !name.is_empty() => {
                    match self.resolve_non_fatal_name(&name)? {
                        Some(resolution) => {
                            let mut tax = Taxonomy::new();
                            apply_record(&mut tax, &resolution.record, None, is_external);
                            let node = &mut tree[index];
                            node.data.taxonomy = Some(tax);
                            node.set_name("");
                        }
                        None => {
                            not_found.insert(name);
                            if delete_unresolved_externals && is_external {
                                marked.push(index);
                            }
                        }
                    }
                }
                None if is_external => {
                    not_found.insert(if name.is_empty() {
                        format!("[{id}]")
                    } else {
                        name
                    });
                    if delete_unresolved_externals {
                        marked.push(index);
                    }
                }
                None => {
                    // Internal node without taxonomy or usable name.
                }
            }
        }
        if delete_unresolved_externals && !marked.is_empty() {
            for index in marked {
                tree.delete_external(index);
            }
            if !tree.is_empty() {
                tree.preorder_reid();
            }
        }
        Ok(not_found)
    }

    /// [resolve](TaxonomyResolver::resolve), with ambiguous/unmatched
    /// lineages demoted to an unresolved outcome.
    fn resolve_non_fatal(&self, taxonomy: &Taxonomy) -> Result<Option<Resolution>> {
        match self.resolve(taxonomy) {
            Ok(resolution) => Ok(resolution),
            Err(Error::Ambiguous(_)) | Err(Error::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn resolve_non_fatal_name(&self, name: &str) -> Result<Option<Resolution>> {
        match self.resolve_name(name) {
            Ok(resolution) => Ok(resolution),
            Err(Error::Ambiguous(_)) | Err(Error::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// The label an unresolved node contributes to the reported set.
fn unresolved_label(taxonomy: &Taxonomy, name: &str, id: usize) -> String {
    let s = taxonomy.to_string();
    if !s.is_empty() {
        s
    } else if !name.is_empty() {
        name.to_string()
    } else {
        format!("[{id}]")
    }
}

/// Updates `tax` in place from the canonical `record`.
///
/// The queried facet is left alone; scientific name, code (external nodes
/// only), common name and identifier are filled only where empty; the rank is
/// filled (validated, lowercased) where empty; synonyms are unioned; the
/// lineage is always replaced when the record carries one.
pub(crate) fn apply_record(
    tax: &mut Taxonomy,
    record: &Taxonomy,
    queried: Option<QueryKind>,
    node_is_external: bool,
) {
    if queried != Some(QueryKind::ScientificName)
        && !record.scientific_name().is_empty()
        && tax.scientific_name().is_empty()
    {
        tax.set_scientific_name(record.scientific_name());
    }
    if node_is_external
        && queried != Some(QueryKind::Code)
        && !record.taxonomy_code().is_empty()
        && tax.taxonomy_code().is_empty()
    {
        tax.set_taxonomy_code(record.taxonomy_code());
    }
    if queried != Some(QueryKind::CommonName)
        && !record.common_name().is_empty()
        && tax.common_name().is_empty()
    {
        tax.set_common_name(record.common_name());
    }
    for synonym in record.synonyms() {
        tax.add_synonym(synonym.clone());
    }
    if !record.rank().is_empty() && tax.rank().is_empty() {
        tax.set_rank(record.rank());
    }
    if queried != Some(QueryKind::Id) && !tax.has_identifier_value() {
        if let Some(id) = record.identifier() {
            if !id.value().is_empty() {
                let provider = if id.provider().is_empty() {
                    "uniprot"
                } else {
                    id.provider()
                };
                tax.set_identifier(Identifier::new(id.value(), provider));
            }
        }
    }
    if !record.lineage().is_empty() {
        tax.set_lineage(record.lineage().iter().cloned());
    }
}
