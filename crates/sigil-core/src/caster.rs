//! Caster identity and the registry collaborator.
//!
//! The casting core never owns caster entities. It only needs to know whether
//! an id refers to a registered caster and which caster is the player. Both
//! questions are answered by a [`CasterRegistry`] injected at engine build
//! time.
//!
//! # Example
//!
//! ```
//! use sigil_core::caster::{CasterId, CasterRegistry, CasterRoster};
//!
//! let mut roster = CasterRoster::new();
//! let player = CasterId::new(1);
//! roster.register(player);
//! roster.set_player(player);
//!
//! assert!(roster.is_registered(player));
//! assert!(!roster.is_registered(CasterId::new(2)));
//! assert_eq!(roster.player(), Some(player));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a caster.
///
/// Caster ids are assigned by the surrounding game; the core treats them as
/// opaque, ordered keys. Ordering is used for deterministic iteration.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CasterId(u64);

impl CasterId {
    /// Creates a new `CasterId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for CasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CasterId({})", self.0)
    }
}

impl fmt::Display for CasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CasterId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<CasterId> for u64 {
    fn from(id: CasterId) -> Self {
        id.0
    }
}

/// Entity registry as seen by the casting core.
pub trait CasterRegistry {
    /// Returns true if `caster` refers to a live, registered caster.
    fn is_registered(&self, caster: CasterId) -> bool;

    /// Returns the designated player caster, if any.
    fn player(&self) -> Option<CasterId>;
}

/// Simple set-backed [`CasterRegistry`].
///
/// Used by the replay tool and tests; games normally adapt their own entity
/// store to the trait instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CasterRoster {
    casters: BTreeSet<CasterId>,
    player: Option<CasterId>,
}

impl CasterRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a caster. Returns false if it was already registered.
    pub fn register(&mut self, caster: CasterId) -> bool {
        self.casters.insert(caster)
    }

    /// Removes a caster. The player designation is cleared if it pointed at
    /// the removed caster.
    pub fn unregister(&mut self, caster: CasterId) -> bool {
        if self.player == Some(caster) {
            self.player = None;
        }
        self.casters.remove(&caster)
    }

    /// Designates the player caster, registering it if needed.
    pub fn set_player(&mut self, caster: CasterId) {
        self.casters.insert(caster);
        self.player = Some(caster);
    }

    /// Number of registered casters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.casters.len()
    }

    /// Returns true if no caster is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.casters.is_empty()
    }
}

impl CasterRegistry for CasterRoster {
    fn is_registered(&self, caster: CasterId) -> bool {
        self.casters.contains(&caster)
    }

    fn player(&self) -> Option<CasterId> {
        self.player
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caster_id_ordering() {
        assert!(CasterId::new(1) < CasterId::new(2));
        assert_eq!(format!("{:?}", CasterId::new(7)), "CasterId(7)");
        assert_eq!(CasterId::new(7).to_string(), "7");
    }

    #[test]
    fn register_is_idempotent() {
        let mut roster = CasterRoster::new();
        assert!(roster.register(CasterId::new(3)));
        assert!(!roster.register(CasterId::new(3)));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn unregister_clears_player() {
        let mut roster = CasterRoster::new();
        roster.set_player(CasterId::new(9));
        assert!(roster.unregister(CasterId::new(9)));
        assert_eq!(roster.player(), None);
        assert!(roster.is_empty());
    }
}
