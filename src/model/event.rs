//! Evolutionary events reconstructed for internal gene-tree nodes.

use std::fmt;

/// The event reconstructed for an internal gene-tree node.
///
/// A plain tagged value; the counters over a reconciliation run live in
/// [GsdiSummary](crate::sdi::GsdiSummary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The two child lineages diverged together with a species split.
    Speciation,
    /// Both child lineages trace back into the same species subtree.
    Duplication,
    /// Undecidable at a multifurcating species-tree node.
    SpeciationOrDuplication,
}

impl Event {
    /// Returns `true` for [Event::Speciation].
    pub fn is_speciation(&self) -> bool {
        matches!(self, Event::Speciation)
    }

    /// Returns `true` for [Event::Duplication].
    pub fn is_duplication(&self) -> bool {
        matches!(self, Event::Duplication)
    }

    /// Returns `true` for [Event::SpeciationOrDuplication].
    pub fn is_speciation_or_duplication(&self) -> bool {
        matches!(self, Event::SpeciationOrDuplication)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Event::Speciation => write!(f, "speciation"),
            Event::Duplication => write!(f, "duplication"),
            Event::SpeciationOrDuplication => write!(f, "speciation or duplication"),
        }
    }
}
