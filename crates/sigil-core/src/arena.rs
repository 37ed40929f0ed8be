//! Per-caster runtime state storage.
//!
//! Each caster the engine has seen owns one [`CasterSlot`]: its input buffer,
//! casting state machine and hotbar. Slots live densely in a `Vec` and are
//! addressed by [`CasterHandle`]; a `BTreeMap` maps caster ids to handles so
//! iteration is always in caster-id order.
//!
//! Released slots are recycled by the next insertion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buffer::InputSequenceBuffer;
use crate::cast::CastingStateMachine;
use crate::caster::CasterId;
use crate::hotbar::Hotbar;

/// Index of a slot in the [`CasterArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CasterHandle(u32);

impl CasterHandle {
    /// Returns the raw slot index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Runtime state of one caster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CasterSlot {
    id: CasterId,
    /// Buffered inputs.
    pub buffer: InputSequenceBuffer,
    /// Casting lifecycle.
    pub machine: CastingStateMachine,
    /// Slot bindings.
    pub hotbar: Hotbar,
}

impl CasterSlot {
    /// Creates an idle slot with an empty buffer and hotbar.
    #[must_use]
    pub fn new(id: CasterId, buffer: InputSequenceBuffer, hotbar: Hotbar) -> Self {
        Self {
            id,
            buffer,
            machine: CastingStateMachine::new(),
            hotbar,
        }
    }

    /// The caster owning this slot.
    #[must_use]
    pub fn id(&self) -> CasterId {
        self.id
    }
}

/// Dense storage of caster slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CasterArena {
    slots: Vec<Option<CasterSlot>>,
    lookup: BTreeMap<CasterId, CasterHandle>,
    free: Vec<CasterHandle>,
}

impl CasterArena {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of a caster's slot, if one exists.
    #[must_use]
    pub fn handle(&self, caster: CasterId) -> Option<CasterHandle> {
        self.lookup.get(&caster).copied()
    }

    /// Returns the caster's slot, creating it with `make` on first use.
    pub fn get_or_insert_with(
        &mut self,
        caster: CasterId,
        make: impl FnOnce() -> CasterSlot,
    ) -> &mut CasterSlot {
        let handle = match self.handle(caster) {
            Some(handle) => handle,
            None => self.reserve(caster),
        };
        self.slots[handle.index()].get_or_insert_with(make)
    }

    fn reserve(&mut self, caster: CasterId) -> CasterHandle {
        let handle = self.free.pop().unwrap_or_else(|| {
            self.slots.push(None);
            CasterHandle(u32::try_from(self.slots.len() - 1).unwrap_or(u32::MAX))
        });
        self.lookup.insert(caster, handle);
        handle
    }

    /// Slot of a caster.
    #[must_use]
    pub fn get(&self, caster: CasterId) -> Option<&CasterSlot> {
        let handle = self.handle(caster)?;
        self.slots.get(handle.index())?.as_ref()
    }

    /// Mutable slot of a caster.
    pub fn get_mut(&mut self, caster: CasterId) -> Option<&mut CasterSlot> {
        let handle = self.handle(caster)?;
        self.slots.get_mut(handle.index())?.as_mut()
    }

    /// Slot at a handle.
    #[must_use]
    pub fn slot(&self, handle: CasterHandle) -> Option<&CasterSlot> {
        self.slots.get(handle.index())?.as_ref()
    }

    /// Removes a caster's slot and returns it.
    pub fn release(&mut self, caster: CasterId) -> Option<CasterSlot> {
        let handle = self.lookup.remove(&caster)?;
        let slot = self.slots.get_mut(handle.index())?.take();
        self.free.push(handle);
        slot
    }

    /// Caster ids in ascending order.
    pub fn ids_sorted(&self) -> impl Iterator<Item = CasterId> + '_ {
        self.lookup.keys().copied()
    }

    /// Slots in ascending caster-id order.
    pub fn slots_sorted(&self) -> impl Iterator<Item = &CasterSlot> + '_ {
        self.lookup
            .values()
            .filter_map(|handle| self.slots.get(handle.index())?.as_ref())
    }

    /// Number of live slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    /// Returns true if no caster has a slot.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(id: u64) -> CasterSlot {
        CasterSlot::new(
            CasterId::new(id),
            InputSequenceBuffer::default(),
            Hotbar::new(4),
        )
    }

    #[test]
    fn insertion_is_lazy_and_stable() {
        let mut arena = CasterArena::new();
        assert!(arena.get(CasterId::new(5)).is_none());

        arena.get_or_insert_with(CasterId::new(5), || slot(5));
        let handle = arena.handle(CasterId::new(5)).unwrap();

        // Second call reuses the slot; `make` is not consulted.
        arena.get_or_insert_with(CasterId::new(5), || slot(99));
        assert_eq!(arena.handle(CasterId::new(5)), Some(handle));
        assert_eq!(arena.slot(handle).map(CasterSlot::id), Some(CasterId::new(5)));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn iteration_is_by_caster_id() {
        let mut arena = CasterArena::new();
        for id in [9, 2, 5] {
            arena.get_or_insert_with(CasterId::new(id), || slot(id));
        }
        let ids: Vec<u64> = arena.ids_sorted().map(CasterId::as_u64).collect();
        assert_eq!(ids, vec![2, 5, 9]);
        let slot_ids: Vec<u64> = arena.slots_sorted().map(|s| s.id().as_u64()).collect();
        assert_eq!(slot_ids, vec![2, 5, 9]);
    }

    #[test]
    fn released_handles_are_recycled() {
        let mut arena = CasterArena::new();
        arena.get_or_insert_with(CasterId::new(1), || slot(1));
        let first = arena.handle(CasterId::new(1)).unwrap();
        assert!(arena.release(CasterId::new(1)).is_some());
        assert!(arena.get(CasterId::new(1)).is_none());

        arena.get_or_insert_with(CasterId::new(2), || slot(2));
        assert_eq!(arena.handle(CasterId::new(2)), Some(first));
        assert!(arena.release(CasterId::new(1)).is_none());
    }
}
