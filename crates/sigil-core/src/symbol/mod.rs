//! Symbols, concepts, subtypes and the per-world symbol map.
//!
//! A *symbol* is the abstract input token a caster selects. Each world maps its
//! symbols onto world-invariant *concepts* and a world-specific *subtype* with
//! numeric modifiers. The mapping is generated from the world seed and is
//! immutable afterwards:
//!
//! - [`SymbolCatalog`]: the static tables generation draws from
//! - [`SymbolMap`]: the generated mapping and its lookups
//! - [`fingerprint`]: a deterministic hash of a generated mapping
//!
//! # Example
//!
//! ```
//! use sigil_core::symbol::{Concept, SymbolMap};
//!
//! let map = SymbolMap::generate(12345, 10);
//! assert_eq!(map.len(), 10);
//!
//! // Every concept is represented before any repeats.
//! for concept in Concept::ALL {
//!     assert!(map.by_concept(concept).is_some());
//! }
//!
//! // Unknown symbols resolve to the sentinel concept.
//! assert_eq!(map.concept_of("symbol_missing"), Concept::None);
//! ```

mod catalog;
mod hash;
mod map;

pub use catalog::{GenerationFault, SymbolAnchor, SymbolCatalog, STANDARD_SYMBOL_POOL};
pub use hash::fingerprint;
pub use map::SymbolMap;

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

// =============================================================================
// Symbol Identification
// =============================================================================

/// Identifier of an input symbol, e.g. `"symbol_leaf"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(String);

impl SymbolId {
    /// Creates a new `SymbolId` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the symbol id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for SymbolId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SymbolId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SymbolId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// Concepts
// =============================================================================

/// World-invariant mechanical category of a symbol.
///
/// `None` is the sentinel returned for unmapped symbols. It is never assigned
/// by generation and never part of a valid combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Concept {
    /// Fire and heat.
    Flame,
    /// Cold and stillness.
    Frost,
    /// Wind and motion.
    Gale,
    /// Earth and weight.
    Stone,
    /// Growth and renewal.
    Bloom,
    /// Lightning and sudden force.
    Spark,
    /// Concealment and drain.
    Shadow,
    /// Protection and binding.
    Ward,
    /// Sentinel for unmapped symbols.
    None,
}

impl Concept {
    /// All assignable concepts, in declaration order. Excludes the sentinel.
    pub const ALL: [Concept; 8] = [
        Concept::Flame,
        Concept::Frost,
        Concept::Gale,
        Concept::Stone,
        Concept::Bloom,
        Concept::Spark,
        Concept::Shadow,
        Concept::Ward,
    ];

    /// Returns true for the `None` sentinel.
    #[must_use]
    pub const fn is_none(self) -> bool {
        matches!(self, Concept::None)
    }

    /// Subtype candidates registered for this concept.
    ///
    /// Concepts without candidates fall back to [`Subtype::Basic`].
    #[must_use]
    pub const fn subtype_candidates(self) -> &'static [Subtype] {
        match self {
            Concept::Flame => &[Subtype::Wildfire, Subtype::Ember],
            Concept::Frost => &[Subtype::Rime, Subtype::Glacier],
            Concept::Gale => &[Subtype::Gust, Subtype::Cyclone],
            Concept::Stone => &[Subtype::Bulwark, Subtype::Quake],
            Concept::Bloom => &[
                Subtype::HealingGrowth,
                Subtype::Thornweave,
                Subtype::SporeDrift,
            ],
            Concept::Shadow => &[Subtype::Veil, Subtype::Leech],
            Concept::Spark | Concept::Ward | Concept::None => &[],
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Flame => "Flame",
            Self::Frost => "Frost",
            Self::Gale => "Gale",
            Self::Stone => "Stone",
            Self::Bloom => "Bloom",
            Self::Spark => "Spark",
            Self::Shadow => "Shadow",
            Self::Ward => "Ward",
            Self::None => "None",
        };
        write!(f, "{name}")
    }
}

// =============================================================================
// Subtypes and Modifiers
// =============================================================================

/// Numeric modifier carried by a subtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Direct damage.
    Damage,
    /// Health restored.
    HealingAmount,
    /// Area radius in world units.
    Radius,
    /// Effect duration in seconds.
    Duration,
    /// Movement or projectile speed.
    Speed,
    /// Damage absorbed.
    Shielding,
    /// Generic strength multiplier.
    Potency,
}

/// World-specific flavour of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subtype {
    /// Universal fallback for concepts without registered subtypes.
    Basic,
    /// Flame: spreading blaze.
    Wildfire,
    /// Flame: lingering burn.
    Ember,
    /// Frost: slowing frost.
    Rime,
    /// Frost: ice barrier.
    Glacier,
    /// Gale: push.
    Gust,
    /// Gale: vortex.
    Cyclone,
    /// Stone: earthen wall.
    Bulwark,
    /// Stone: ground shock.
    Quake,
    /// Bloom: regeneration.
    HealingGrowth,
    /// Bloom: barbed vines.
    Thornweave,
    /// Bloom: restorative spores.
    SporeDrift,
    /// Shadow: concealment.
    Veil,
    /// Shadow: life drain.
    Leech,
}

impl Subtype {
    /// The concept this subtype belongs to, or `None` for the universal
    /// `Basic` subtype.
    #[must_use]
    pub const fn concept(self) -> Option<Concept> {
        match self {
            Subtype::Basic => None,
            Subtype::Wildfire | Subtype::Ember => Some(Concept::Flame),
            Subtype::Rime | Subtype::Glacier => Some(Concept::Frost),
            Subtype::Gust | Subtype::Cyclone => Some(Concept::Gale),
            Subtype::Bulwark | Subtype::Quake => Some(Concept::Stone),
            Subtype::HealingGrowth | Subtype::Thornweave | Subtype::SporeDrift => {
                Some(Concept::Bloom)
            }
            Subtype::Veil | Subtype::Leech => Some(Concept::Shadow),
        }
    }

    /// Static base modifier values before per-world variance.
    #[must_use]
    pub const fn base_modifiers(self) -> &'static [(ModifierKind, f32)] {
        match self {
            Subtype::Basic => &[(ModifierKind::Potency, 1.0)],
            Subtype::Wildfire => &[(ModifierKind::Damage, 12.0), (ModifierKind::Radius, 3.0)],
            Subtype::Ember => &[(ModifierKind::Damage, 6.0), (ModifierKind::Duration, 8.0)],
            Subtype::Rime => &[(ModifierKind::Damage, 8.0), (ModifierKind::Duration, 4.0)],
            Subtype::Glacier => &[(ModifierKind::Shielding, 20.0)],
            Subtype::Gust => &[(ModifierKind::Speed, 6.0), (ModifierKind::Radius, 4.0)],
            Subtype::Cyclone => &[(ModifierKind::Damage, 5.0), (ModifierKind::Radius, 6.0)],
            Subtype::Bulwark => &[(ModifierKind::Shielding, 25.0)],
            Subtype::Quake => &[(ModifierKind::Damage, 10.0), (ModifierKind::Radius, 5.0)],
            Subtype::HealingGrowth => &[
                (ModifierKind::HealingAmount, 15.0),
                (ModifierKind::Duration, 5.0),
            ],
            Subtype::Thornweave => &[(ModifierKind::Damage, 7.0), (ModifierKind::Duration, 6.0)],
            Subtype::SporeDrift => &[
                (ModifierKind::HealingAmount, 6.0),
                (ModifierKind::Radius, 4.0),
            ],
            Subtype::Veil => &[(ModifierKind::Duration, 6.0)],
            Subtype::Leech => &[
                (ModifierKind::Damage, 6.0),
                (ModifierKind::HealingAmount, 3.0),
            ],
        }
    }
}

// =============================================================================
// Symbol Definition
// =============================================================================

/// The generated meaning of one symbol in one world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolDefinition {
    /// Symbol identifier.
    pub id: SymbolId,
    /// Mechanical category.
    pub concept: Concept,
    /// World-specific variant of the concept.
    pub subtype: Subtype,
    /// Modifier values after per-world variance.
    pub modifiers: BTreeMap<ModifierKind, f32>,
}

impl SymbolDefinition {
    /// Returns the value of a modifier, if the subtype carries it.
    #[must_use]
    pub fn modifier(&self, kind: ModifierKind) -> Option<f32> {
        self.modifiers.get(&kind).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_candidate_belongs_to_its_concept() {
        for concept in Concept::ALL {
            for subtype in concept.subtype_candidates() {
                assert_eq!(subtype.concept(), Some(concept), "{subtype:?}");
            }
        }
    }

    #[test]
    fn sentinel_is_not_assignable() {
        assert!(!Concept::ALL.contains(&Concept::None));
        assert!(Concept::None.is_none());
        assert!(Concept::None.subtype_candidates().is_empty());
    }

    #[test]
    fn healing_growth_base_value() {
        let base = Subtype::HealingGrowth
            .base_modifiers()
            .iter()
            .find(|(kind, _)| *kind == ModifierKind::HealingAmount)
            .map(|(_, v)| *v);
        assert_eq!(base, Some(15.0));
    }

    #[test]
    fn symbol_id_borrows_as_str() {
        let mut map = BTreeMap::new();
        map.insert(SymbolId::new("symbol_leaf"), 1);
        assert_eq!(map.get("symbol_leaf"), Some(&1));
    }

    #[test]
    fn definition_serializes() {
        let def = SymbolDefinition {
            id: SymbolId::new("symbol_leaf"),
            concept: Concept::Bloom,
            subtype: Subtype::HealingGrowth,
            modifiers: BTreeMap::from([(ModifierKind::HealingAmount, 15.5)]),
        };
        let json = serde_json::to_string(&def).unwrap();
        let back: SymbolDefinition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, def);
    }
}
