//! State hashing for determinism verification.
//!
//! Two symbol maps generated from the same `(seed, symbol_count)` must hash
//! identically. Replays record the fingerprint so a trace can be checked
//! against the world it was captured in.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{SymbolDefinition, SymbolMap};

/// Computes a deterministic hash of a symbol map.
///
/// The hash covers:
/// - the world seed and symbol count
/// - every definition in generation order
/// - modifier values by bit pattern, so float formatting never matters
#[must_use]
pub fn fingerprint(map: &SymbolMap) -> u64 {
    let mut hasher = DefaultHasher::new();

    map.seed().hash(&mut hasher);
    map.len().hash(&mut hasher);

    for def in map.iter() {
        hash_definition(def, &mut hasher);
    }

    // A fallback map must never collide with the seeded map it replaced.
    map.fault().is_some().hash(&mut hasher);

    hasher.finish()
}

fn hash_definition<H: Hasher>(def: &SymbolDefinition, hasher: &mut H) {
    def.id.hash(hasher);
    def.concept.hash(hasher);
    def.subtype.hash(hasher);
    def.modifiers.len().hash(hasher);
    for (kind, value) in &def.modifiers {
        kind.hash(hasher);
        value.to_bits().hash(hasher);
    }
}
