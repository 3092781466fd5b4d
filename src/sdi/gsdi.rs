//! Generalized speciation/duplication inference.
//!
//! Implements the GSDI algorithm: given a rooted binary gene tree whose
//! externals are linked into a rooted species tree (arbitrary branching),
//! compute the least-common-ancestor mapping for every internal gene node
//! and classify it as a speciation, duplication, or (at unresolved species
//! multifurcations) an ambiguous event.
//!
//! The LCA walk exploits preorder ids: of the two current species nodes, the
//! one with the larger id is strictly deeper, so repeatedly replacing it by
//! its parent converges on the least common ancestor.

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::model::{Event, NodeIndex, PhyloTree};
use crate::sdi::species_mapper::{ComparisonBase, SpeciesMapper};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

// =#========================================================================#=
// GSDI
// =#========================================================================#=
/// A configured reconciliation run.
///
/// # Example
/// ```
/// use taxodi::model::{PhyloTree, Taxonomy};
/// use taxodi::sdi::Gsdi;
///
/// let mut species = PhyloTree::new();
/// let a = species.add_external("A");
/// let b = species.add_external("B");
/// species.add_root(&[a, b]);
/// species[a].data.taxonomy = Some(Taxonomy::new().with_scientific_name("A"));
/// species[b].data.taxonomy = Some(Taxonomy::new().with_scientific_name("B"));
///
/// let mut gene = PhyloTree::new();
/// let a1 = gene.add_external("a1");
/// let a2 = gene.add_external("a2");
/// gene.add_root(&[a1, a2]);
/// gene[a1].data.taxonomy = Some(Taxonomy::new().with_scientific_name("A"));
/// gene[a2].data.taxonomy = Some(Taxonomy::new().with_scientific_name("A"));
///
/// // Both gene copies are from species A: one duplication.
/// let summary = Gsdi::new().run(&mut gene, &mut species).unwrap();
/// assert_eq!(summary.duplications(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Gsdi {
    most_parsimonious_duplication_model: bool,
    strip_gene_tree: bool,
    strip_species_tree: bool,
    cancel: CancelToken,
}

impl Gsdi {
    /// Creates a run with the permissive duplication model and no stripping.
    pub fn new() -> Self {
        Gsdi::default()
    }

    /// Under the most parsimonious duplication model, events that would be
    /// ambiguous at a species multifurcation are classified as duplications.
    pub fn most_parsimonious_duplication_model(mut self, enabled: bool) -> Self {
        self.most_parsimonious_duplication_model = enabled;
        self
    }

    /// Removes unmappable gene-tree externals instead of failing.
    pub fn strip_gene_tree(mut self, strip: bool) -> Self {
        self.strip_gene_tree = strip;
        self
    }

    /// Removes species-tree externals no gene external maps to.
    pub fn strip_species_tree(mut self, strip: bool) -> Self {
        self.strip_species_tree = strip;
        self
    }

    /// Attaches a cancellation token, checked once per postorder iteration.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Reconciles the gene tree against the species tree.
    ///
    /// Renumbers both trees in preorder, links gene externals to species
    /// nodes via [SpeciesMapper], then traverses the gene tree in postorder,
    /// setting every internal node's link and event in place. Counters and
    /// the mapping-cost diagnostic are returned in the [GsdiSummary].
    ///
    /// # Errors
    /// Everything [SpeciesMapper::link] reports; [Error::InvalidState] for a
    /// non-binary gene tree, an empty input tree, or an unlinked external
    /// (the latter indicates a bug, not bad data); [Error::Cancelled].
    pub fn run(
        &self,
        gene_tree: &mut PhyloTree,
        species_tree: &mut PhyloTree,
    ) -> Result<GsdiSummary> {
        if gene_tree.is_empty() || species_tree.is_empty() {
            return Err(Error::InvalidState("cannot reconcile an empty tree".to_string()));
        }
        gene_tree.preorder_reid();
        species_tree.preorder_reid();
        let mapper = SpeciesMapper::new()
            .strip_gene_tree(self.strip_gene_tree)
            .strip_species_tree(self.strip_species_tree);
        let outcome = mapper.link(gene_tree, species_tree)?;
        if gene_tree.is_empty() {
            return Err(Error::InvalidState(
                "no gene tree externals could be mapped".to_string(),
            ));
        }

        let mut speciations = 0;
        let mut duplications = 0;
        let mut speciation_or_duplications = 0;
        let order: Vec<NodeIndex> = gene_tree.post_order_iter().collect();
        for g in order {
            self.cancel.check()?;
            let node = &gene_tree[g];
            if node.is_external() {
                if node.data.link.is_none() {
                    return Err(Error::InvalidState(format!(
                        "external gene tree node \"{}\" has no link",
                        node.label()
                    )));
                }
                continue;
            }
            let children = node.children();
            if children.len() != 2 {
                return Err(Error::InvalidState(
                    "gene tree must be binary".to_string(),
                ));
            }
            let (g1, g2) = (children[0], children[1]);

            // LCA step: walk the deeper (larger preorder id) side upward.
            let mut s1 = self.link_of(gene_tree, g1)?;
            let mut s2 = self.link_of(gene_tree, g2)?;
            while s1 != s2 {
                if species_tree[s1].id() > species_tree[s2].id() {
                    s1 = self.parent_of(species_tree, s1)?;
                } else {
                    s2 = self.parent_of(species_tree, s2)?;
                }
            }
            gene_tree[g].data.link = Some(s1);

            let event = self.determine_event(gene_tree, species_tree, g, s1);
            match event {
                Event::Speciation => speciations += 1,
                Event::Duplication => duplications += 1,
                Event::SpeciationOrDuplication => speciation_or_duplications += 1,
            }
            gene_tree[g].data.event = Some(event);
        }

        let mapping_cost = mapping_cost_l(gene_tree, species_tree);
        let summary = GsdiSummary {
            most_parsimonious_duplication_model: self.most_parsimonious_duplication_model,
            speciations,
            duplications,
            speciation_or_duplications,
            mapping_cost,
            base: outcome.base,
            stripped_gene_tree_nodes: outcome.stripped_gene_tree_nodes,
            stripped_species_tree_nodes: outcome.stripped_species_tree_nodes,
            mapped_species_tree_nodes: outcome.mapped_species_tree_nodes,
        };
        debug!(
            "reconciliation done: {} speciations, {} duplications, {} ambiguous, mapping cost {}",
            summary.speciations,
            summary.duplications,
            summary.speciation_or_duplications,
            summary.mapping_cost
        );
        Ok(summary)
    }

    /// Classifies the event at internal gene node `g`, mapped to species
    /// node `s`.
    fn determine_event(
        &self,
        gene_tree: &PhyloTree,
        species_tree: &PhyloTree,
        g: NodeIndex,
        s: NodeIndex,
    ) -> Event {
        let children = gene_tree[g].children();
        let (g1, g2) = (children[0], children[1]);
        // "oyako" (parent-child): one child maps to the same species node.
        let oyako =
            gene_tree[g1].data.link == Some(s) || gene_tree[g2].data.link == Some(s);
        if species_tree[s].num_descendants() == 2 {
            return if oyako {
                Event::Duplication
            } else {
                Event::Speciation
            };
        }
        // s is a multifurcation (or otherwise unresolved).
        if !oyako {
            return Event::Speciation;
        }
        // Do the two gene subtrees share a species subtree directly under s?
        let mut reached: HashSet<NodeIndex> = HashSet::new();
        for external in gene_tree.external_descendants_of(g1) {
            let link = gene_tree[external].data.link.expect("externals are linked");
            reached.insert(climb_to_child_of(species_tree, link, s));
        }
        let mut multiple = false;
        for external in gene_tree.external_descendants_of(g2) {
            let link = gene_tree[external].data.link.expect("externals are linked");
            if reached.contains(&climb_to_child_of(species_tree, link, s)) {
                multiple = true;
                break;
            }
        }
        if multiple || self.most_parsimonious_duplication_model {
            Event::Duplication
        } else {
            Event::SpeciationOrDuplication
        }
    }

    fn link_of(&self, gene_tree: &PhyloTree, g: NodeIndex) -> Result<NodeIndex> {
        gene_tree[g].data.link.ok_or_else(|| {
            Error::InvalidState(format!(
                "gene tree node \"{}\" has no link",
                gene_tree[g].label()
            ))
        })
    }

    fn parent_of(&self, species_tree: &PhyloTree, s: NodeIndex) -> Result<NodeIndex> {
        species_tree[s].parent().ok_or_else(|| {
            Error::InvalidState("species tree root reached during LCA walk".to_string())
        })
    }
}

/// Walks `node` upward until its parent is `s`; stops at the root.
fn climb_to_child_of(species_tree: &PhyloTree, mut node: NodeIndex, s: NodeIndex) -> NodeIndex {
    while species_tree[node].parent() != Some(s) {
        match species_tree[node].parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }
    node
}

/// The mapping-cost diagnostic L: the summed species-tree depth differences
/// between every internal gene node's mapping and its children's mappings.
/// A quality signal for the reconciliation, not a correctness guarantee.
fn mapping_cost_l(gene_tree: &PhyloTree, species_tree: &PhyloTree) -> u64 {
    let mut cost = 0u64;
    for g in gene_tree.post_order_iter() {
        let node = &gene_tree[g];
        if node.is_external() {
            continue;
        }
        let (Some(s), Some(s1), Some(s2)) = (
            node.data.link,
            gene_tree[node.children()[0]].data.link,
            gene_tree[node.children()[1]].data.link,
        ) else {
            continue;
        };
        let depth = species_tree.depth_of(s) as u64;
        cost += species_tree.depth_of(s1) as u64 + species_tree.depth_of(s2) as u64 - 2 * depth;
    }
    cost
}

// =#========================================================================#=
// GSDI SUMMARY
// =#========================================================================#=
/// Counters and bookkeeping of one reconciliation run.
#[derive(Debug)]
pub struct GsdiSummary {
    most_parsimonious_duplication_model: bool,
    speciations: usize,
    duplications: usize,
    speciation_or_duplications: usize,
    mapping_cost: u64,
    base: ComparisonBase,
    stripped_gene_tree_nodes: Vec<NodeIndex>,
    stripped_species_tree_nodes: Vec<NodeIndex>,
    mapped_species_tree_nodes: HashSet<NodeIndex>,
}

impl GsdiSummary {
    /// Number of internal gene nodes classified as speciations.
    pub fn speciations(&self) -> usize {
        self.speciations
    }

    /// Number of internal gene nodes classified as duplications.
    pub fn duplications(&self) -> usize {
        self.duplications
    }

    /// Number of internal gene nodes left ambiguous (permissive model only).
    pub fn speciation_or_duplications(&self) -> usize {
        self.speciation_or_duplications
    }

    /// The mapping-cost diagnostic L.
    pub fn mapping_cost(&self) -> u64 {
        self.mapping_cost
    }

    /// The comparison base the mapping was keyed on.
    pub fn comparison_base(&self) -> ComparisonBase {
        self.base
    }

    /// Gene-tree externals removed because they could not be mapped.
    pub fn stripped_gene_tree_nodes(&self) -> &[NodeIndex] {
        &self.stripped_gene_tree_nodes
    }

    /// Species-tree externals removed because nothing mapped to them.
    pub fn stripped_species_tree_nodes(&self) -> &[NodeIndex] {
        &self.stripped_species_tree_nodes
    }

    /// Species-tree externals some gene external links to.
    pub fn mapped_species_tree_nodes(&self) -> &HashSet<NodeIndex> {
        &self.mapped_species_tree_nodes
    }
}

impl fmt::Display for GsdiSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "Most parsimonious duplication model: {}",
            self.most_parsimonious_duplication_model
        )?;
        writeln!(f, "Speciations sum                    : {}", self.speciations)?;
        writeln!(f, "Duplications sum                   : {}", self.duplications)?;
        if !self.most_parsimonious_duplication_model {
            writeln!(
                f,
                "Speciation or duplications sum     : {}",
                self.speciation_or_duplications
            )?;
        }
        write!(f, "Mapping cost L                     : {}", self.mapping_cost)
    }
}
