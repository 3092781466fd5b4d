//! Ancestral taxonomy inference from descendants' common lineage.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::model::{Identifier, NodeIndex, PhyloTree, Taxonomy};
use crate::taxonomy::cache::TaxonomyCache;
use crate::taxonomy::resolver::TaxonomyResolver;
use crate::taxonomy::service::{TaxonomyService, MAX_RESULTS_ANCESTRAL};

// =#========================================================================#=
// ANCESTRAL TAXONOMY INFERER
// =#========================================================================#=
/// Assigns taxonomies to internal nodes from the longest common lineage
/// prefix of their direct descendants.
///
/// Unlike [enrich_tree](TaxonomyResolver::enrich_tree), any per-node failure
/// here is fatal for the whole job: the inference produces a single coherent
/// assignment or none at all. Rerunning after a failure or cancellation is
/// safe; every internal node's taxonomy is recomputed from scratch.
pub struct AncestralTaxonomyInferer<'a, S: TaxonomyService> {
    service: &'a S,
    cache: &'a TaxonomyCache,
    cancel: CancelToken,
}

impl<'a, S: TaxonomyService> AncestralTaxonomyInferer<'a, S> {
    /// Creates an inferer over the given service and shared cache.
    pub fn new(service: &'a S, cache: &'a TaxonomyCache) -> Self {
        AncestralTaxonomyInferer {
            service,
            cache,
            cancel: CancelToken::new(),
        }
    }

    /// Attaches a cancellation token, checked between node visits and before
    /// service calls.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The resolver used for the inferer's internal lookups. Scientific-name
    /// first, never by lineage; the lineage is the query being built here.
    fn resolver(&self) -> TaxonomyResolver<'a, S> {
        TaxonomyResolver::new(self.service, self.cache).with_cancel_token(self.cancel.clone())
    }

    /// Infers a taxonomy for every internal node of the tree, in postorder.
    ///
    /// Each direct descendant of an internal node must already carry a
    /// taxonomy with at least one resolvable identifier; external nodes are
    /// typically prepared by
    /// [enrich_tree](TaxonomyResolver::enrich_tree) first, and internal ones
    /// are produced by this walk itself as it climbs.
    pub fn infer(&self, tree: &mut PhyloTree) -> Result<()> {
        self.cache.maybe_evict();
        let resolver = self.resolver();
        let order: Vec<NodeIndex> = tree.post_order_iter().collect();
        for index in order {
            if tree[index].is_internal() {
                self.cancel.check()?;
                self.infer_node(&resolver, tree, index)?;
            }
        }
        Ok(())
    }

    fn infer_node(
        &self,
        resolver: &TaxonomyResolver<'a, S>,
        tree: &mut PhyloTree,
        index: NodeIndex,
    ) -> Result<()> {
        tree[index].data.taxonomy = None;
        let children: Vec<NodeIndex> = tree[index].children().to_vec();

        // Canonical lineage of every direct descendant.
        let mut lineages: Vec<Vec<String>> = Vec::with_capacity(children.len());
        for &child in &children {
            let node = &tree[child];
            let taxonomy = match &node.data.taxonomy {
                Some(tax) if tax.is_resolvable() => tax.clone(),
                _ => {
                    let label = if node.name().is_empty() {
                        format!("[{}]", node.id())
                    } else {
                        format!("\"{}\"", node.name())
                    };
                    return Err(Error::MissingTaxonomy(label));
                }
            };
            let lineage = resolver
                .resolve_basic(&taxonomy)?
                .map(|resolution| resolution.record.lineage().to_vec())
                .unwrap_or_default();
            if lineage.is_empty() {
                return Err(Error::LineageUnavailable(taxonomy.to_string()));
            }
            lineages.push(lineage);
        }

        // Longest common prefix across all descendant lineages.
        let shortest = lineages.iter().map(Vec::len).min().unwrap_or(0);
        let mut prefix: Vec<String> = Vec::new();
        'depth: for i in 0..shortest {
            let element = &lineages[0][i];
            for lineage in &lineages[1..] {
                if &lineage[i] != element {
                    break 'depth;
                }
            }
            prefix.push(element.clone());
        }
        if prefix.is_empty() {
            let mut details = String::new();
            for (counter, lineage) in lineages.iter().enumerate() {
                details.push_str(&format!("{counter}: {}\n", lineage.join(" ")));
            }
            return Err(Error::NoCommonLineage(details));
        }

        let mut taxonomy = Taxonomy::new().with_scientific_name(prefix.last().unwrap().clone());
        if let Some(record) = resolver.lookup_lineage(&prefix, MAX_RESULTS_ANCESTRAL)? {
            if !record.rank().is_empty() {
                taxonomy.set_rank(record.rank());
            }
            if let Some(id) = record.identifier() {
                if !id.value().is_empty() {
                    let provider = if id.provider().is_empty() {
                        "uniprot"
                    } else {
                        id.provider()
                    };
                    taxonomy.set_identifier(Identifier::new(id.value(), provider));
                }
            }
            if !record.common_name().is_empty() {
                taxonomy.set_common_name(record.common_name());
            }
            for synonym in record.synonyms() {
                taxonomy.add_synonym(synonym.clone());
            }
            if !record.lineage().is_empty() {
                taxonomy.set_lineage(record.lineage().iter().cloned());
            }
        }

        // Redundant inner assignments on an unbranched ancestral line are
        // dropped so the taxonomy appears once, at the deepest ancestor.
        for &child in &children {
            let node = &mut tree[child];
            if node.is_internal() && node.data.taxonomy.as_ref() == Some(&taxonomy) {
                node.data.taxonomy = None;
            }
        }
        tree[index].data.taxonomy = Some(taxonomy);
        Ok(())
    }
}
