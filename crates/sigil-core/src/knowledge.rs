//! Per-caster symbol familiarity.
//!
//! Each (caster, symbol) pair carries a [`KnowledgeState`]. States only move
//! forward; the single way back is [`KnowledgeTracker::reset`], reserved for
//! administrative and contract-revocation flows.
//!
//! # Example
//!
//! ```
//! use sigil_core::caster::CasterId;
//! use sigil_core::knowledge::{KnowledgeState, KnowledgeTracker};
//! use sigil_core::symbol::SymbolId;
//!
//! let mut tracker = KnowledgeTracker::new();
//! let caster = CasterId::new(1);
//! let leaf = SymbolId::new("symbol_leaf");
//!
//! assert_eq!(tracker.get(caster, "symbol_leaf"), KnowledgeState::Hidden);
//!
//! tracker.update(caster, &leaf, KnowledgeState::Known);
//! // Downgrades are ignored.
//! tracker.update(caster, &leaf, KnowledgeState::Seen);
//! assert_eq!(tracker.get(caster, "symbol_leaf"), KnowledgeState::Known);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::caster::CasterId;
use crate::symbol::SymbolId;

/// Familiarity tier of a caster with a symbol. Ordered `Hidden < Seen < Known`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum KnowledgeState {
    /// Never encountered.
    #[default]
    Hidden,
    /// Encountered once; meaning not yet understood.
    Seen,
    /// Fully understood; may be bound to a hotbar slot.
    Known,
}

impl KnowledgeState {
    /// The next tier, or `None` from `Known`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Hidden => Some(Self::Seen),
            Self::Seen => Some(Self::Known),
            Self::Known => None,
        }
    }

    /// Returns true for `Known`.
    #[must_use]
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Known)
    }
}

/// Result of a knowledge update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnowledgeChange {
    /// The state moved forward.
    Advanced {
        /// State before the update.
        from: KnowledgeState,
        /// State after the update.
        to: KnowledgeState,
    },
    /// The request was not strictly greater than the current state.
    Unchanged {
        /// The retained state.
        current: KnowledgeState,
    },
}

impl KnowledgeChange {
    /// Returns true if the state moved.
    #[must_use]
    pub const fn is_advanced(self) -> bool {
        matches!(self, Self::Advanced { .. })
    }
}

/// Owner and sole writer of every caster's knowledge table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeTracker {
    tables: BTreeMap<CasterId, BTreeMap<SymbolId, KnowledgeState>>,
}

impl KnowledgeTracker {
    /// Creates an empty tracker; every pair starts `Hidden`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of a pair, `Hidden` if untracked.
    #[must_use]
    pub fn get(&self, caster: CasterId, symbol: &str) -> KnowledgeState {
        self.tables
            .get(&caster)
            .and_then(|table| table.get(symbol))
            .copied()
            .unwrap_or_default()
    }

    /// Moves a pair to `new_state` if it is strictly greater than the current
    /// state. Anything else is a logged no-op.
    pub fn update(
        &mut self,
        caster: CasterId,
        symbol: &SymbolId,
        new_state: KnowledgeState,
    ) -> KnowledgeChange {
        let current = self.get(caster, symbol.as_str());
        if new_state <= current {
            debug!(
                %caster,
                %symbol,
                ?current,
                requested = ?new_state,
                "ignoring non-advancing knowledge update"
            );
            return KnowledgeChange::Unchanged { current };
        }
        self.tables
            .entry(caster)
            .or_default()
            .insert(symbol.clone(), new_state);
        KnowledgeChange::Advanced {
            from: current,
            to: new_state,
        }
    }

    /// Advances a pair by exactly one tier.
    pub fn promote(&mut self, caster: CasterId, symbol: &SymbolId) -> KnowledgeChange {
        let current = self.get(caster, symbol.as_str());
        match current.next() {
            Some(next) => self.update(caster, symbol, next),
            None => KnowledgeChange::Unchanged { current },
        }
    }

    /// Administrative reset of a pair back to `Hidden`.
    ///
    /// Returns the state held before the reset.
    pub fn reset(&mut self, caster: CasterId, symbol: &str) -> KnowledgeState {
        let previous = self
            .tables
            .get_mut(&caster)
            .and_then(|table| table.remove(symbol))
            .unwrap_or_default();
        info!(%caster, symbol, ?previous, "knowledge reset");
        previous
    }

    /// Administrative reset of every symbol a caster knows.
    pub fn reset_caster(&mut self, caster: CasterId) {
        if self.tables.remove(&caster).is_some() {
            info!(%caster, "knowledge table cleared");
        }
    }

    /// States of several symbols, in request order.
    #[must_use]
    pub fn bulk_query(&self, caster: CasterId, symbols: &[SymbolId]) -> Vec<KnowledgeState> {
        symbols
            .iter()
            .map(|symbol| self.get(caster, symbol.as_str()))
            .collect()
    }

    /// Returns true if every symbol is at least `minimum`.
    #[must_use]
    pub fn all_at_least(
        &self,
        caster: CasterId,
        symbols: &[SymbolId],
        minimum: KnowledgeState,
    ) -> bool {
        self.bulk_query(caster, symbols)
            .into_iter()
            .all(|state| state >= minimum)
    }

    /// Tracked (non-`Hidden`) pairs of a caster, ordered by symbol id.
    pub fn tracked(
        &self,
        caster: CasterId,
    ) -> impl Iterator<Item = (&SymbolId, KnowledgeState)> + '_ {
        self.tables
            .get(&caster)
            .into_iter()
            .flat_map(|table| table.iter().map(|(id, state)| (id, *state)))
    }
}
