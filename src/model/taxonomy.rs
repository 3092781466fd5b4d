//! Taxonomy records and identifiers.

use std::fmt;

/// Identifier providers whose ids are accepted for direct lookups
/// (case-insensitive).
const RECOGNIZED_PROVIDERS: [&str; 3] = ["ncbi", "uniprot", "uniprotkb"];

/// Taxonomic ranks accepted by [Taxonomy::set_rank] (the phyloXML rank
/// vocabulary). Anything else leaves the rank empty.
const VALID_RANKS: [&str; 34] = [
    "domain",
    "superkingdom",
    "kingdom",
    "subkingdom",
    "branch",
    "infrakingdom",
    "superphylum",
    "phylum",
    "subphylum",
    "infraphylum",
    "superdivision",
    "division",
    "subdivision",
    "superclass",
    "class",
    "subclass",
    "infraclass",
    "superorder",
    "order",
    "suborder",
    "infraorder",
    "superfamily",
    "family",
    "subfamily",
    "tribe",
    "subtribe",
    "genus",
    "subgenus",
    "species group",
    "species subgroup",
    "species",
    "subspecies",
    "varietas",
    "unknown",
];

/// Separator used to join a lineage into a single cache key.
pub const LINEAGE_SEPARATOR: &str = ">";

// =#========================================================================#=
// IDENTIFIER
// =#========================================================================#=
/// A taxonomy identifier: a value qualified by the database that issued it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    value: String,
    provider: String,
}

impl Identifier {
    /// Creates a new identifier.
    pub fn new(value: impl Into<String>, provider: impl Into<String>) -> Self {
        Identifier {
            value: value.into(),
            provider: provider.into(),
        }
    }

    /// Returns the identifier value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Returns the provider that issued this identifier.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Returns `true` if the provider is one of the recognized taxonomy
    /// databases (case-insensitive).
    pub fn has_recognized_provider(&self) -> bool {
        RECOGNIZED_PROVIDERS
            .iter()
            .any(|p| self.provider.eq_ignore_ascii_case(p))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.provider.is_empty() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}:{}", self.provider, self.value)
        }
    }
}

// =#========================================================================#=
// TAXONOMY
// =#========================================================================#=
/// A taxonomy record.
///
/// Canonical records come back from the
/// [TaxonomyService](crate::taxonomy::service::TaxonomyService); partial
/// records are attached to tree nodes by parsers and get filled in by the
/// [TaxonomyResolver](crate::taxonomy::resolver::TaxonomyResolver).
///
/// # Invariants
/// - `rank` is stored lowercased; setting an invalid rank leaves it empty.
/// - `synonyms` are de-duplicated on insert, insertion order kept.
/// - `lineage` runs kingdom-ward root to leaf-ward, the taxon itself as the
///   last element; empty strings are dropped on set.
///
/// Equality is field-wise on identifier, scientific name, code, common name,
/// rank and lineage; synonyms do not take part.
#[derive(Debug, Clone, Default)]
pub struct Taxonomy {
    identifier: Option<Identifier>,
    scientific_name: String,
    taxonomy_code: String,
    common_name: String,
    rank: String,
    synonyms: Vec<String>,
    lineage: Vec<String>,
}

impl Taxonomy {
    /// Creates a new, empty taxonomy.
    pub fn new() -> Self {
        Taxonomy::default()
    }

    /// Returns the identifier, or `None` if not set.
    pub fn identifier(&self) -> Option<&Identifier> {
        self.identifier.as_ref()
    }

    /// Sets the identifier.
    pub fn set_identifier(&mut self, identifier: Identifier) {
        self.identifier = Some(identifier);
    }

    /// Returns `true` if an identifier with a non-empty value is set.
    pub fn has_identifier_value(&self) -> bool {
        self.identifier
            .as_ref()
            .is_some_and(|id| !id.value().is_empty())
    }

    /// Returns `true` if this taxonomy carries an identifier with a non-empty
    /// value from a recognized provider, making it usable for ID lookups.
    pub fn has_appropriate_id(&self) -> bool {
        self.identifier
            .as_ref()
            .is_some_and(|id| !id.value().is_empty() && id.has_recognized_provider())
    }

    /// Returns the scientific name (possibly empty).
    pub fn scientific_name(&self) -> &str {
        &self.scientific_name
    }

    /// Sets the scientific name.
    pub fn set_scientific_name(&mut self, name: impl Into<String>) {
        self.scientific_name = name.into();
    }

    /// Returns the taxonomy code (possibly empty).
    pub fn taxonomy_code(&self) -> &str {
        &self.taxonomy_code
    }

    /// Sets the taxonomy code.
    pub fn set_taxonomy_code(&mut self, code: impl Into<String>) {
        self.taxonomy_code = code.into();
    }

    /// Returns the common name (possibly empty).
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Sets the common name.
    pub fn set_common_name(&mut self, name: impl Into<String>) {
        self.common_name = name.into();
    }

    /// Returns the rank (lowercase, possibly empty).
    pub fn rank(&self) -> &str {
        &self.rank
    }

    /// Sets the rank, lowercased. An unrecognized rank leaves it empty.
    pub fn set_rank(&mut self, rank: &str) {
        let lower = rank.to_lowercase();
        if VALID_RANKS.contains(&lower.as_str()) {
            self.rank = lower;
        } else {
            self.rank = String::new();
        }
    }

    /// Returns the synonyms, in insertion order.
    pub fn synonyms(&self) -> &[String] {
        &self.synonyms
    }

    /// Adds a synonym unless it is empty or already present.
    pub fn add_synonym(&mut self, synonym: impl Into<String>) {
        let synonym = synonym.into();
        if !synonym.is_empty() && !self.synonyms.contains(&synonym) {
            self.synonyms.push(synonym);
        }
    }

    /// Returns the lineage, kingdom-ward root first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Replaces the lineage, dropping empty elements.
    pub fn set_lineage(&mut self, lineage: impl IntoIterator<Item = String>) {
        self.lineage = lineage.into_iter().filter(|l| !l.is_empty()).collect();
    }

    /// Returns the lineage joined into a single cache key.
    pub fn lineage_path(&self) -> String {
        self.lineage.join(LINEAGE_SEPARATOR)
    }

    /// Returns `true` if at least one of identifier (appropriate), scientific
    /// name, code, or common name is available for a lookup.
    pub fn is_resolvable(&self) -> bool {
        self.has_appropriate_id()
            || !self.scientific_name.is_empty()
            || !self.taxonomy_code.is_empty()
            || !self.common_name.is_empty()
    }

    /// Returns `true` if no field of this taxonomy is populated.
    pub fn is_empty(&self) -> bool {
        self.identifier.is_none()
            && self.scientific_name.is_empty()
            && self.taxonomy_code.is_empty()
            && self.common_name.is_empty()
            && self.rank.is_empty()
            && self.synonyms.is_empty()
            && self.lineage.is_empty()
    }

    // ------------------------------------------------------------------
    // Builder-style helpers, mainly for construction in parsers and tests
    // ------------------------------------------------------------------

    /// Sets the identifier, builder style.
    pub fn with_identifier(mut self, value: impl Into<String>, provider: impl Into<String>) -> Self {
        self.set_identifier(Identifier::new(value, provider));
        self
    }

    /// Sets the scientific name, builder style.
    pub fn with_scientific_name(mut self, name: impl Into<String>) -> Self {
        self.set_scientific_name(name);
        self
    }

    /// Sets the taxonomy code, builder style.
    pub fn with_taxonomy_code(mut self, code: impl Into<String>) -> Self {
        self.set_taxonomy_code(code);
        self
    }

    /// Sets the common name, builder style.
    pub fn with_common_name(mut self, name: impl Into<String>) -> Self {
        self.set_common_name(name);
        self
    }

    /// Sets the rank, builder style (same validation as [set_rank](Taxonomy::set_rank)).
    pub fn with_rank(mut self, rank: &str) -> Self {
        self.set_rank(rank);
        self
    }

    /// Sets the lineage, builder style.
    pub fn with_lineage<I, S>(mut self, lineage: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_lineage(lineage.into_iter().map(Into::into));
        self
    }
}

impl PartialEq for Taxonomy {
    fn eq(&self, other: &Self) -> bool {
        self.identifier == other.identifier
            && self.scientific_name == other.scientific_name
            && self.taxonomy_code == other.taxonomy_code
            && self.common_name == other.common_name
            && self.rank == other.rank
            && self.lineage == other.lineage
    }
}

impl fmt::Display for Taxonomy {
    /// The string form used for reporting: scientific name, else code, else
    /// common name, else identifier.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if !self.scientific_name.is_empty() {
            write!(f, "{}", self.scientific_name)
        } else if !self.taxonomy_code.is_empty() {
            write!(f, "{}", self.taxonomy_code)
        } else if !self.common_name.is_empty() {
            write!(f, "{}", self.common_name)
        } else if let Some(id) = &self.identifier {
            write!(f, "{id}")
        } else {
            Ok(())
        }
    }
}
