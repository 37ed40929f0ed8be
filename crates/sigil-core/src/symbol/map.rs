//! Seeded generation of the per-world symbol map.
//!
//! # Determinism
//!
//! The generator is a `ChaCha8Rng` seeded solely from the world seed, and it
//! is consumed in a fixed order:
//!
//! 1. shuffle the unanchored symbols; the anchored symbols followed by the
//!    shuffled ones form the selection order, cut at `symbol_count`
//! 2. shuffle the unanchored concepts; the anchored concepts followed by the
//!    shuffled ones form the cycle (symbol `i` takes concept `i % len`)
//! 3. per concept in cycle order: pick a subtype, then draw one variance
//!    factor per base modifier
//!
//! Anchored concepts and concepts without subtype candidates take their
//! subtype without drawing, so the consumption order depends only on the
//! catalog, never on earlier draws.
//!
//! The standard catalog anchors `symbol_leaf` to Bloom with `HealingGrowth`;
//! the rest of the map varies by seed.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::catalog::{GenerationFault, SymbolCatalog, STANDARD_SYMBOL_POOL};
use super::{Concept, ModifierKind, Subtype, SymbolDefinition, SymbolId};

/// Lower bound of the multiplicative modifier variance.
const VARIANCE_MIN: f32 = 0.9;
/// Upper bound of the multiplicative modifier variance.
const VARIANCE_MAX: f32 = 1.1;

/// The generated symbol → concept → subtype → modifier mapping of one world.
///
/// Definitions are stored densely in generation order; lookups by symbol go
/// through an ordered index into that storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolMap {
    seed: u64,
    definitions: Vec<SymbolDefinition>,
    index: BTreeMap<SymbolId, usize>,
    fault: Option<GenerationFault>,
}

impl SymbolMap {
    /// Generates the map for a world from the standard catalog.
    ///
    /// # Arguments
    ///
    /// * `seed` - World seed; the only source of randomness
    /// * `symbol_count` - Number of symbols to select from the pool
    #[must_use]
    pub fn generate(seed: u64, symbol_count: usize) -> Self {
        Self::generate_from(&SymbolCatalog::standard(), seed, symbol_count)
    }

    /// Generates the map from an explicit catalog.
    ///
    /// A malformed catalog aborts seeded generation; the fault is logged and
    /// an all-`Basic` mapping is returned instead. The fault stays readable
    /// through [`SymbolMap::fault`].
    #[must_use]
    pub fn generate_from(catalog: &SymbolCatalog, seed: u64, symbol_count: usize) -> Self {
        match catalog.validate() {
            Ok(()) => Self::seeded(catalog, seed, symbol_count),
            Err(fault) => {
                error!(seed, %fault, "symbol catalog is malformed, using Basic fallback mapping");
                Self::fallback(catalog, seed, symbol_count, fault)
            }
        }
    }

    fn seeded(catalog: &SymbolCatalog, seed: u64, symbol_count: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let anchors = catalog.anchors();

        let mut pool: Vec<SymbolId> = catalog
            .symbols()
            .iter()
            .filter(|s| !anchors.iter().any(|a| &a.symbol == *s))
            .cloned()
            .collect();
        pool.shuffle(&mut rng);
        let count = clamp_count(symbol_count, catalog.symbols().len());
        let selected: Vec<SymbolId> = anchors
            .iter()
            .map(|a| a.symbol.clone())
            .chain(pool)
            .take(count)
            .collect();

        let mut concepts: Vec<Concept> = catalog
            .concepts()
            .iter()
            .copied()
            .filter(|&c| catalog.anchor_for(c).is_none())
            .collect();
        concepts.shuffle(&mut rng);
        let concepts: Vec<Concept> = anchors.iter().map(|a| a.concept).chain(concepts).collect();

        let mut flavours: BTreeMap<Concept, (Subtype, BTreeMap<ModifierKind, f32>)> =
            BTreeMap::new();
        for &concept in &concepts {
            let candidates = catalog.candidates(concept);
            let subtype = match catalog.anchor_for(concept) {
                Some(anchor) => anchor.subtype,
                None if candidates.is_empty() => Subtype::Basic,
                None => candidates[rng.gen_range(0..candidates.len())],
            };
            let modifiers = catalog
                .base_modifiers(subtype)
                .iter()
                .map(|&(kind, base)| (kind, base * rng.gen_range(VARIANCE_MIN..=VARIANCE_MAX)))
                .collect();
            flavours.insert(concept, (subtype, modifiers));
        }

        let definitions = selected
            .into_iter()
            .enumerate()
            .map(|(i, id)| {
                let concept = concepts[i % concepts.len()];
                let (subtype, modifiers) = flavours[&concept].clone();
                SymbolDefinition {
                    id,
                    concept,
                    subtype,
                    modifiers,
                }
            })
            .collect();

        let map = Self::from_definitions(seed, definitions, None);
        debug!(seed, symbols = map.len(), "generated symbol map");
        map
    }

    fn fallback(
        catalog: &SymbolCatalog,
        seed: u64,
        symbol_count: usize,
        fault: GenerationFault,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let mut pool: Vec<SymbolId> = catalog
            .symbols()
            .iter()
            .filter(|s| seen.insert((*s).clone()))
            .cloned()
            .collect();
        if pool.is_empty() {
            pool = STANDARD_SYMBOL_POOL.iter().map(|s| SymbolId::new(s)).collect();
        }

        let mut seen = BTreeSet::new();
        let mut concepts: Vec<Concept> = catalog
            .concepts()
            .iter()
            .copied()
            .filter(|c| !c.is_none() && seen.insert(*c))
            .collect();
        if concepts.is_empty() {
            concepts = Concept::ALL.to_vec();
        }

        let basic: BTreeMap<ModifierKind, f32> =
            Subtype::Basic.base_modifiers().iter().copied().collect();
        let count = clamp_count(symbol_count, pool.len());
        let definitions = pool
            .into_iter()
            .take(count)
            .enumerate()
            .map(|(i, id)| SymbolDefinition {
                id,
                concept: concepts[i % concepts.len()],
                subtype: Subtype::Basic,
                modifiers: basic.clone(),
            })
            .collect();

        Self::from_definitions(seed, definitions, Some(fault))
    }

    fn from_definitions(
        seed: u64,
        definitions: Vec<SymbolDefinition>,
        fault: Option<GenerationFault>,
    ) -> Self {
        let index = definitions
            .iter()
            .enumerate()
            .map(|(i, def)| (def.id.clone(), i))
            .collect();
        Self {
            seed,
            definitions,
            index,
            fault,
        }
    }

    /// Looks up a symbol's definition; `None` means the symbol is invalid in
    /// this world.
    #[must_use]
    pub fn by_symbol(&self, id: &str) -> Option<&SymbolDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// Returns the first definition (in generation order) with the given concept.
    #[must_use]
    pub fn by_concept(&self, concept: Concept) -> Option<&SymbolDefinition> {
        self.definitions.iter().find(|def| def.concept == concept)
    }

    /// Returns a symbol's concept, or the [`Concept::None`] sentinel for
    /// unmapped symbols. Callers must check for the sentinel.
    #[must_use]
    pub fn concept_of(&self, id: &str) -> Concept {
        self.by_symbol(id).map_or(Concept::None, |def| def.concept)
    }

    /// Concepts assigned to at least one symbol in this world.
    #[must_use]
    pub fn concepts_present(&self) -> BTreeSet<Concept> {
        self.definitions.iter().map(|def| def.concept).collect()
    }

    /// Iterates definitions in generation order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolDefinition> + '_ {
        self.definitions.iter()
    }

    /// The world seed this map was generated from.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The catalog fault that forced the fallback mapping, if any.
    #[must_use]
    pub fn fault(&self) -> Option<&GenerationFault> {
        self.fault.as_ref()
    }

    /// Number of symbols in this world.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns true if the world has no symbols.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn clamp_count(requested: usize, available: usize) -> usize {
    if requested > available {
        warn!(requested, available, "symbol count exceeds pool size, clamping");
    }
    requested.min(available)
}
