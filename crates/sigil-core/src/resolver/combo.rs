//! Combo definitions and spell identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::symbol::Concept;

/// Minimum number of concepts in a registered combo.
pub const MIN_COMBO_LEN: usize = 2;

const EXPERIMENT: &str = "experiment";

/// Identifier of a spell outcome.
///
/// The reserved id `"experiment"` marks a plausible freeform sequence with no
/// registered meaning.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpellId(String);

impl SpellId {
    /// Creates a new `SpellId` from a string.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// The reserved experiment marker.
    #[must_use]
    pub fn experiment() -> Self {
        Self::new(EXPERIMENT)
    }

    /// Returns true for the experiment marker.
    #[must_use]
    pub fn is_experiment(&self) -> bool {
        self.0 == EXPERIMENT
    }

    /// Returns the spell id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SpellId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A registered ordered concept sequence and the spell it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboDefinition {
    /// Concepts in input order.
    pub concepts: Vec<Concept>,
    /// Outcome fired on an exact match.
    pub spell: SpellId,
}

impl ComboDefinition {
    /// Creates a combo definition.
    #[must_use]
    pub fn new(concepts: Vec<Concept>, spell: impl Into<SpellId>) -> Self {
        Self {
            concepts,
            spell: spell.into(),
        }
    }

    /// Checks the definition can be registered.
    pub fn validate(&self) -> Result<(), ComboError> {
        if self.concepts.len() < MIN_COMBO_LEN {
            return Err(ComboError::TooShort {
                spell: self.spell.clone(),
                len: self.concepts.len(),
            });
        }
        if self.concepts.iter().any(|c| c.is_none()) {
            return Err(ComboError::SentinelConcept {
                spell: self.spell.clone(),
            });
        }
        Ok(())
    }
}

/// A combo definition that cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComboError {
    /// Fewer than [`MIN_COMBO_LEN`] concepts.
    #[error("combo for {spell} has {len} concepts, at least {MIN_COMBO_LEN} required")]
    TooShort {
        /// The spell the combo was registered for.
        spell: SpellId,
        /// Number of concepts given.
        len: usize,
    },

    /// Contains the `None` sentinel.
    #[error("combo for {spell} contains the None concept")]
    SentinelConcept {
        /// The spell the combo was registered for.
        spell: SpellId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn experiment_marker() {
        assert!(SpellId::experiment().is_experiment());
        assert!(!SpellId::new("fireball").is_experiment());
    }

    #[test]
    fn single_concept_combo_is_rejected() {
        let combo = ComboDefinition::new(vec![Concept::Flame], "spark_shot");
        assert!(matches!(combo.validate(), Err(ComboError::TooShort { len: 1, .. })));
    }

    #[test]
    fn sentinel_combo_is_rejected() {
        let combo = ComboDefinition::new(vec![Concept::Flame, Concept::None], "broken");
        assert!(matches!(
            combo.validate(),
            Err(ComboError::SentinelConcept { .. })
        ));
    }

    #[test]
    fn valid_combo_passes() {
        let combo = ComboDefinition::new(vec![Concept::Flame, Concept::Gale], "firestorm");
        assert_eq!(combo.validate(), Ok(()));
    }
}
