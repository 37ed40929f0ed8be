//! Static tables that symbol generation draws from.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Concept, ModifierKind, Subtype, SymbolId};

/// The fixed pool of symbol names available to every world.
pub const STANDARD_SYMBOL_POOL: [&str; 16] = [
    "symbol_leaf",
    "symbol_ember",
    "symbol_wave",
    "symbol_stone",
    "symbol_feather",
    "symbol_eye",
    "symbol_moon",
    "symbol_sun",
    "symbol_key",
    "symbol_thorn",
    "symbol_spiral",
    "symbol_crown",
    "symbol_bell",
    "symbol_root",
    "symbol_star",
    "symbol_mask",
];

/// A malformed catalog detected before generation.
///
/// Generation never fails outright: a fault aborts the seeded pass and the
/// world falls back to an all-`Basic` mapping.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GenerationFault {
    /// The symbol pool has no entries.
    #[error("symbol pool is empty")]
    EmptySymbolPool,

    /// A symbol name appears more than once in the pool.
    #[error("symbol {0} appears more than once in the pool")]
    DuplicateSymbol(SymbolId),

    /// The concept list has no assignable entries.
    #[error("concept list is empty")]
    EmptyConceptList,

    /// The concept list contains the `None` sentinel or a repeated concept.
    #[error("concept list contains invalid entry {0}")]
    InvalidConcept(Concept),

    /// A subtype is registered as a candidate for a concept it does not belong to.
    #[error("subtype {subtype:?} registered under {concept}")]
    MisregisteredSubtype {
        /// The offending subtype.
        subtype: Subtype,
        /// The concept it was registered under.
        concept: Concept,
    },

    /// An anchor names a symbol or concept missing from the catalog, repeats
    /// one already anchored, or pins a subtype the concept cannot take.
    #[error("anchor of {symbol} to {concept} is invalid")]
    InvalidAnchor {
        /// The anchored symbol.
        symbol: SymbolId,
        /// The concept it was anchored to.
        concept: Concept,
    },

    /// A base modifier value is negative or not finite.
    #[error("base modifier {kind:?} of {subtype:?} is invalid: {value}")]
    InvalidBaseModifier {
        /// The subtype carrying the modifier.
        subtype: Subtype,
        /// The modifier kind.
        kind: ModifierKind,
        /// The rejected value.
        value: f32,
    },
}

/// A symbol whose concept and subtype are fixed in every world.
///
/// Anchored symbols are always selected first and skip the subtype draw;
/// their modifiers still vary with the seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolAnchor {
    /// The pinned symbol.
    pub symbol: SymbolId,
    /// Its concept.
    pub concept: Concept,
    /// Its subtype; must be a candidate of `concept`.
    pub subtype: Subtype,
}

/// Tables consumed by [`SymbolMap::generate_from`](super::SymbolMap::generate_from).
///
/// [`SymbolCatalog::standard`] is the catalog every world uses; custom
/// catalogs exist for tools and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolCatalog {
    symbols: Vec<SymbolId>,
    concepts: Vec<Concept>,
    candidates: BTreeMap<Concept, Vec<Subtype>>,
    base_modifiers: BTreeMap<Subtype, Vec<(ModifierKind, f32)>>,
    anchors: Vec<SymbolAnchor>,
}

impl SymbolCatalog {
    /// The standard catalog: [`STANDARD_SYMBOL_POOL`], all concepts, the
    /// built-in subtype tables, and `symbol_leaf` anchored to a healing
    /// Bloom.
    #[must_use]
    pub fn standard() -> Self {
        let symbols = STANDARD_SYMBOL_POOL.iter().map(|s| SymbolId::new(s)).collect();
        Self::new(symbols, Concept::ALL.to_vec()).with_anchor(
            SymbolId::new(STANDARD_SYMBOL_POOL[0]),
            Concept::Bloom,
            Subtype::HealingGrowth,
        )
    }

    /// Creates a catalog with the built-in subtype tables for the given
    /// concepts and no anchors.
    #[must_use]
    pub fn new(symbols: Vec<SymbolId>, concepts: Vec<Concept>) -> Self {
        let candidates = concepts
            .iter()
            .map(|&c| (c, c.subtype_candidates().to_vec()))
            .collect();
        let base_modifiers = concepts
            .iter()
            .flat_map(|c| c.subtype_candidates().iter().copied())
            .chain(std::iter::once(Subtype::Basic))
            .map(|s| (s, s.base_modifiers().to_vec()))
            .collect();
        Self {
            symbols,
            concepts,
            candidates,
            base_modifiers,
            anchors: Vec::new(),
        }
    }

    /// Pins `symbol` to `concept` and `subtype`. Anchors are selected in the
    /// order they were added.
    #[must_use]
    pub fn with_anchor(mut self, symbol: SymbolId, concept: Concept, subtype: Subtype) -> Self {
        self.anchors.push(SymbolAnchor {
            symbol,
            concept,
            subtype,
        });
        self
    }

    /// Drops every anchor, leaving selection fully seeded.
    #[must_use]
    pub fn without_anchors(mut self) -> Self {
        self.anchors.clear();
        self
    }

    /// Replaces the subtype candidates of one concept.
    #[must_use]
    pub fn with_candidates(mut self, concept: Concept, subtypes: Vec<Subtype>) -> Self {
        for &subtype in &subtypes {
            self.base_modifiers
                .entry(subtype)
                .or_insert_with(|| subtype.base_modifiers().to_vec());
        }
        self.candidates.insert(concept, subtypes);
        self
    }

    /// Replaces the base modifiers of one subtype.
    #[must_use]
    pub fn with_base_modifiers(
        mut self,
        subtype: Subtype,
        modifiers: Vec<(ModifierKind, f32)>,
    ) -> Self {
        self.base_modifiers.insert(subtype, modifiers);
        self
    }

    /// The symbol pool, in catalog order.
    #[must_use]
    pub fn symbols(&self) -> &[SymbolId] {
        &self.symbols
    }

    /// The assignable concepts, in catalog order.
    #[must_use]
    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    /// Subtype candidates for a concept; empty means `Basic` fallback.
    #[must_use]
    pub fn candidates(&self, concept: Concept) -> &[Subtype] {
        self.candidates.get(&concept).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Anchored symbols, in selection order.
    #[must_use]
    pub fn anchors(&self) -> &[SymbolAnchor] {
        &self.anchors
    }

    /// The anchor pinning `concept`, if any.
    #[must_use]
    pub fn anchor_for(&self, concept: Concept) -> Option<&SymbolAnchor> {
        self.anchors.iter().find(|a| a.concept == concept)
    }

    /// Base modifiers for a subtype.
    #[must_use]
    pub fn base_modifiers(&self, subtype: Subtype) -> &[(ModifierKind, f32)] {
        self.base_modifiers
            .get(&subtype)
            .map_or(subtype.base_modifiers(), Vec::as_slice)
    }

    /// Checks the catalog for the malformations listed in [`GenerationFault`].
    ///
    /// Checks run in a fixed order so the reported fault is stable.
    pub fn validate(&self) -> Result<(), GenerationFault> {
        if self.symbols.is_empty() {
            return Err(GenerationFault::EmptySymbolPool);
        }
        let mut seen = BTreeSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol) {
                return Err(GenerationFault::DuplicateSymbol(symbol.clone()));
            }
        }

        if self.concepts.is_empty() {
            return Err(GenerationFault::EmptyConceptList);
        }
        let mut seen = BTreeSet::new();
        for &concept in &self.concepts {
            if concept.is_none() || !seen.insert(concept) {
                return Err(GenerationFault::InvalidConcept(concept));
            }
        }

        for &concept in &self.concepts {
            for &subtype in self.candidates(concept) {
                if subtype.concept() != Some(concept) {
                    return Err(GenerationFault::MisregisteredSubtype { subtype, concept });
                }
                for &(kind, value) in self.base_modifiers(subtype) {
                    if !value.is_finite() || value < 0.0 {
                        return Err(GenerationFault::InvalidBaseModifier {
                            subtype,
                            kind,
                            value,
                        });
                    }
                }
            }
        }

        let mut symbols = BTreeSet::new();
        let mut concepts = BTreeSet::new();
        for anchor in &self.anchors {
            let valid = self.symbols.contains(&anchor.symbol)
                && self.concepts.contains(&anchor.concept)
                && self.candidates(anchor.concept).contains(&anchor.subtype)
                && symbols.insert(&anchor.symbol)
                && concepts.insert(anchor.concept);
            if !valid {
                return Err(GenerationFault::InvalidAnchor {
                    symbol: anchor.symbol.clone(),
                    concept: anchor.concept,
                });
            }
        }
        Ok(())
    }
}

impl Default for SymbolCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_catalog_is_valid() {
        assert_eq!(SymbolCatalog::standard().validate(), Ok(()));
    }

    #[test]
    fn standard_pool_contains_leaf() {
        assert!(STANDARD_SYMBOL_POOL.contains(&"symbol_leaf"));
    }

    #[test]
    fn empty_pool_is_a_fault() {
        let catalog = SymbolCatalog::new(Vec::new(), Concept::ALL.to_vec());
        assert_eq!(catalog.validate(), Err(GenerationFault::EmptySymbolPool));
    }

    #[test]
    fn duplicate_symbol_is_a_fault() {
        let catalog = SymbolCatalog::new(
            vec![SymbolId::new("a"), SymbolId::new("b"), SymbolId::new("a")],
            Concept::ALL.to_vec(),
        );
        assert_eq!(
            catalog.validate(),
            Err(GenerationFault::DuplicateSymbol(SymbolId::new("a")))
        );
    }

    #[test]
    fn sentinel_concept_is_a_fault() {
        let catalog = SymbolCatalog::new(
            vec![SymbolId::new("a")],
            vec![Concept::Flame, Concept::None],
        );
        assert_eq!(
            catalog.validate(),
            Err(GenerationFault::InvalidConcept(Concept::None))
        );
    }

    #[test]
    fn misregistered_subtype_is_a_fault() {
        let catalog = SymbolCatalog::standard()
            .with_candidates(Concept::Flame, vec![Subtype::Wildfire, Subtype::Glacier]);
        assert_eq!(
            catalog.validate(),
            Err(GenerationFault::MisregisteredSubtype {
                subtype: Subtype::Glacier,
                concept: Concept::Flame,
            })
        );
    }

    #[test]
    fn negative_base_modifier_is_a_fault() {
        let catalog = SymbolCatalog::standard()
            .with_base_modifiers(Subtype::Quake, vec![(ModifierKind::Damage, -1.0)]);
        assert!(matches!(
            catalog.validate(),
            Err(GenerationFault::InvalidBaseModifier {
                subtype: Subtype::Quake,
                ..
            })
        ));
    }

    #[test]
    fn standard_catalog_anchors_leaf_to_healing_bloom() {
        let catalog = SymbolCatalog::standard();
        assert_eq!(
            catalog.anchors(),
            &[SymbolAnchor {
                symbol: SymbolId::new("symbol_leaf"),
                concept: Concept::Bloom,
                subtype: Subtype::HealingGrowth,
            }]
        );
        assert!(catalog.anchor_for(Concept::Bloom).is_some());
        assert!(catalog.anchor_for(Concept::Flame).is_none());
    }

    #[test]
    fn anchor_outside_pool_is_a_fault() {
        let catalog = SymbolCatalog::standard().with_anchor(
            SymbolId::new("symbol_nope"),
            Concept::Flame,
            Subtype::Wildfire,
        );
        assert_eq!(
            catalog.validate(),
            Err(GenerationFault::InvalidAnchor {
                symbol: SymbolId::new("symbol_nope"),
                concept: Concept::Flame,
            })
        );
    }

    #[test]
    fn anchor_with_foreign_subtype_is_a_fault() {
        let catalog = SymbolCatalog::standard().without_anchors().with_anchor(
            SymbolId::new("symbol_ember"),
            Concept::Flame,
            Subtype::Glacier,
        );
        assert!(matches!(
            catalog.validate(),
            Err(GenerationFault::InvalidAnchor { .. })
        ));
    }

    #[test]
    fn concept_anchored_twice_is_a_fault() {
        let catalog = SymbolCatalog::standard().with_anchor(
            SymbolId::new("symbol_root"),
            Concept::Bloom,
            Subtype::Thornweave,
        );
        assert_eq!(
            catalog.validate(),
            Err(GenerationFault::InvalidAnchor {
                symbol: SymbolId::new("symbol_root"),
                concept: Concept::Bloom,
            })
        );
    }

    #[test]
    fn missing_candidates_fall_back_to_empty() {
        let catalog = SymbolCatalog::standard();
        assert!(catalog.candidates(Concept::Spark).is_empty());
        assert_eq!(catalog.candidates(Concept::Bloom).len(), 3);
    }
}
