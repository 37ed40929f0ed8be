//! Slot-to-symbol bindings for one caster.
//!
//! Only `Known` symbols may be bound. A layout is bound all at once: if any
//! symbol in it is not `Known`, nothing changes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::caster::CasterId;
use crate::knowledge::{KnowledgeState, KnowledgeTracker};
use crate::symbol::{SymbolId, SymbolMap};

/// Default number of hotbar slots.
pub const DEFAULT_SLOTS: usize = 10;

/// A binding request that was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    /// Slot index past the end of the hotbar.
    #[error("slot {slot} out of range, hotbar has {slots} slots")]
    SlotOutOfRange {
        /// Requested slot.
        slot: usize,
        /// Hotbar size.
        slots: usize,
    },

    /// Symbol does not exist in this world.
    #[error("symbol {0} is not part of this world")]
    InvalidSymbol(SymbolId),

    /// Symbol is not yet `Known` to the caster.
    #[error("symbol {symbol} is {state:?}, must be Known to bind")]
    NotKnown {
        /// The symbol.
        symbol: SymbolId,
        /// Its current tier.
        state: KnowledgeState,
    },
}

/// Fixed-size slot bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotbar {
    slots: Vec<Option<SymbolId>>,
}

impl Hotbar {
    /// Creates an empty hotbar with `slots` slots.
    #[must_use]
    pub fn new(slots: usize) -> Self {
        Self {
            slots: vec![None; slots],
        }
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true for a zero-slot hotbar.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Symbol bound to `slot`.
    #[must_use]
    pub fn symbol_at(&self, slot: usize) -> Option<&SymbolId> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Binds one symbol. Returns the previous binding of the slot.
    pub fn bind(
        &mut self,
        caster: CasterId,
        slot: usize,
        symbol: SymbolId,
        map: &SymbolMap,
        knowledge: &KnowledgeTracker,
    ) -> Result<Option<SymbolId>, BindError> {
        let mut previous = self.bind_layout(caster, vec![(slot, symbol)], map, knowledge)?;
        Ok(previous.pop().flatten())
    }

    /// Binds several slots at once, all or nothing.
    ///
    /// Returns the previous binding of each slot, in request order.
    pub fn bind_layout(
        &mut self,
        caster: CasterId,
        layout: Vec<(usize, SymbolId)>,
        map: &SymbolMap,
        knowledge: &KnowledgeTracker,
    ) -> Result<Vec<Option<SymbolId>>, BindError> {
        let slots = self.slots.len();
        for (slot, symbol) in &layout {
            if *slot >= slots {
                return Err(BindError::SlotOutOfRange { slot: *slot, slots });
            }
            if map.by_symbol(symbol.as_str()).is_none() {
                return Err(BindError::InvalidSymbol(symbol.clone()));
            }
        }

        let symbols: Vec<SymbolId> = layout.iter().map(|(_, s)| s.clone()).collect();
        let states = knowledge.bulk_query(caster, &symbols);
        if let Some((symbol, state)) = symbols
            .into_iter()
            .zip(states)
            .find(|(_, state)| !state.is_known())
        {
            return Err(BindError::NotKnown { symbol, state });
        }

        Ok(layout
            .into_iter()
            .map(|(slot, symbol)| self.slots[slot].replace(symbol))
            .collect())
    }

    /// Clears a slot, returning what was bound.
    pub fn unbind(&mut self, slot: usize) -> Option<SymbolId> {
        self.slots.get_mut(slot).and_then(Option::take)
    }
}

impl Default for Hotbar {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS)
    }
}
