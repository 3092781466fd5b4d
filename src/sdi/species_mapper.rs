//! Binding gene-tree externals to species-tree nodes.

use crate::error::{Error, Result};
use crate::model::{NodeIndex, PhyloTree, Taxonomy};
use std::collections::{HashMap, HashSet};
use tracing::debug;

// =#========================================================================#=
// COMPARISON BASE
// =#========================================================================#=
/// The taxonomy facet used to key the gene→species mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonBase {
    ScientificName,
    Id,
    Code,
}

impl std::fmt::Display for ComparisonBase {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ComparisonBase::ScientificName => write!(f, "scientific name"),
            ComparisonBase::Id => write!(f, "id"),
            ComparisonBase::Code => write!(f, "code"),
        }
    }
}

/// Picks the comparison base for a gene tree by scanning its externals once.
///
/// Counts how many externals carry an appropriate id, a taxonomy code, and a
/// scientific name; the base is scientific name if its count is the maximum,
/// else id if its count is the maximum, else code.
///
/// # Errors
/// [Error::InsufficientTaxonomy] if fewer than two externals carry any
/// taxonomic data.
pub fn determine_comparison_base(gene_tree: &PhyloTree) -> Result<ComparisonBase> {
    let mut with_id = 0;
    let mut with_code = 0;
    let mut with_sn = 0;
    for index in gene_tree.externals_forward_iter() {
        if let Some(tax) = &gene_tree[index].data.taxonomy {
            if tax.has_appropriate_id() {
                with_id += 1;
            }
            if !tax.taxonomy_code().is_empty() {
                with_code += 1;
            }
            if !tax.scientific_name().is_empty() {
                with_sn += 1;
            }
        }
    }
    let max = with_id.max(with_code).max(with_sn);
    if max == 0 {
        return Err(Error::InsufficientTaxonomy(
            "gene tree has no taxonomic data".to_string(),
        ));
    }
    if max == 1 {
        return Err(Error::InsufficientTaxonomy(
            "gene tree has only one node with taxonomic data".to_string(),
        ));
    }
    let base = if max == with_sn {
        ComparisonBase::ScientificName
    } else if max == with_id {
        ComparisonBase::Id
    } else {
        ComparisonBase::Code
    };
    debug!("comparison base: {}", base);
    Ok(base)
}

/// Projects a taxonomy onto the chosen comparison base. Empty when the facet
/// is not populated (or, for ids, not from a recognized provider).
pub fn species_key(taxonomy: &Taxonomy, base: ComparisonBase) -> String {
    match base {
        ComparisonBase::ScientificName => taxonomy.scientific_name().to_string(),
        ComparisonBase::Id => {
            if taxonomy.has_appropriate_id() {
                taxonomy.identifier().unwrap().value().to_string()
            } else {
                String::new()
            }
        }
        ComparisonBase::Code => taxonomy.taxonomy_code().to_string(),
    }
}

// =#========================================================================#=
// SPECIES MAPPER
// =#========================================================================#=
/// What a [SpeciesMapper::link] run did to the two trees.
#[derive(Debug)]
pub struct MappingOutcome {
    /// The comparison base the mapping was keyed on
    pub base: ComparisonBase,
    /// Gene-tree externals removed because they could not be mapped
    pub stripped_gene_tree_nodes: Vec<NodeIndex>,
    /// Species-tree externals removed because nothing mapped to them
    pub stripped_species_tree_nodes: Vec<NodeIndex>,
    /// Species-tree externals some gene external links to
    pub mapped_species_tree_nodes: HashSet<NodeIndex>,
}

/// Links every external gene-tree node to its species-tree node under a
/// taxonomy projection.
///
/// Without stripping, any gene external that cannot be mapped fails the run.
/// With `strip_gene_tree`, unmappable gene externals are removed instead (in
/// one deferred pass); with `strip_species_tree`, species externals nothing
/// mapped to are removed as well. Both trees are preorder re-numbered after
/// stripping.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeciesMapper {
    strip_gene_tree: bool,
    strip_species_tree: bool,
}

impl SpeciesMapper {
    /// Creates a mapper that fails on unmappable nodes.
    pub fn new() -> Self {
        SpeciesMapper::default()
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

    /// Builds the species-key map and sets every gene external's link.
    ///
    /// # Errors
    /// [Error::InsufficientTaxonomy] from base selection,
    /// [Error::DuplicateSpeciesKey] if two species externals project to the
    /// same key, and, without `strip_gene_tree`,
    /// [Error::MissingTaxonomy] / [Error::NotFound] for unmappable gene
    /// externals.
    pub fn link(
        &self,
        gene_tree: &mut PhyloTree,
        species_tree: &mut PhyloTree,
    ) -> Result<MappingOutcome> {
        let base = determine_comparison_base(gene_tree)?;

        // Species key → species node, over all species-tree externals.
        let species_externals: Vec<NodeIndex> = species_tree.externals_forward_iter().collect();
        let mut species_map: HashMap<String, NodeIndex> = HashMap::new();
        for &s in &species_externals {
            let Some(tax) = &species_tree[s].data.taxonomy else {
                continue;
            };
            let key = species_key(tax, base);
            if key.is_empty() {
                continue;
            }
            if species_map.contains_key(&key) {
                return Err(Error::DuplicateSpeciesKey(tax.to_string()));
            }
            species_map.insert(key, s);
        }

        // Link gene externals; defer removals until after the scan.
        let mut stripped_gene: Vec<NodeIndex> = Vec::new();
        let mut mapped: HashSet<NodeIndex> = HashSet::new();
        let gene_externals: Vec<NodeIndex> = gene_tree.externals_forward_iter().collect();
        for g in gene_externals {
            let node = &gene_tree[g];
            let Some(tax) = &node.data.taxonomy else {
                if self.strip_gene_tree {
                    stripped_gene.push(g);
                    continue;
                }
                return Err(Error::MissingTaxonomy(format!("\"{}\"", node.label())));
            };
            let key = species_key(tax, base);
            if key.is_empty() {
                if self.strip_gene_tree {
                    stripped_gene.push(g);
                    continue;
                }
                return Err(Error::MissingTaxonomy(format!("\"{}\"", node.label())));
            }
            let Some(&s) = species_map.get(&key) else {
                if self.strip_gene_tree {
                    stripped_gene.push(g);
                    continue;
                }
                return Err(Error::NotFound(format!(
                    "taxonomy \"{tax}\" not present in species tree"
                )));
            };
            gene_tree[g].data.link = Some(s);
            mapped.insert(s);
        }

        if self.strip_gene_tree && !stripped_gene.is_empty() {
            debug!("stripping {} unmappable gene tree externals", stripped_gene.len());
            for &g in &stripped_gene {
                gene_tree.delete_external(g);
            }
        }
        let mut stripped_species: Vec<NodeIndex> = Vec::new();
        if self.strip_species_tree {
            for &s in &species_externals {
                if !mapped.contains(&s) {
                    species_tree.delete_external(s);
                    stripped_species.push(s);
                }
            }
        }
        if !gene_tree.is_empty() {
            gene_tree.preorder_reid();
        }
        if !species_tree.is_empty() {
            species_tree.preorder_reid();
        }

        Ok(MappingOutcome {
            base,
            stripped_gene_tree_nodes: stripped_gene,
            stripped_species_tree_nodes: stripped_species,
            mapped_species_tree_nodes: mapped,
        })
    }
}
