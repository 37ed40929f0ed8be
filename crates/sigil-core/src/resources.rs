//! Caster resource pools and the stats collaborator trait.
//!
//! Casts are paid for at the commit point with an atomic, all-or-nothing
//! debit. Pools are owned by the surrounding game; the core talks to them
//! through [`ResourcePool`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::caster::CasterId;

/// A spendable caster resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Primary casting energy.
    Chakra,
    /// Concentration; drained by long or unstable casts.
    Stability,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chakra => write!(f, "chakra"),
            Self::Stability => write!(f, "stability"),
        }
    }
}

/// Amounts of each resource a cast consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceCost(BTreeMap<ResourceKind, f32>);

impl ResourceCost {
    /// A cost of nothing.
    #[must_use]
    pub fn free() -> Self {
        Self::default()
    }

    /// Adds an amount of one resource to the cost.
    #[must_use]
    pub fn with(mut self, kind: ResourceKind, amount: f32) -> Self {
        *self.0.entry(kind).or_insert(0.0) += amount;
        self
    }

    /// Amount of one resource, zero if absent.
    #[must_use]
    pub fn amount(&self, kind: ResourceKind) -> f32 {
        self.0.get(&kind).copied().unwrap_or(0.0)
    }

    /// Returns true if nothing is charged.
    #[must_use]
    pub fn is_free(&self) -> bool {
        self.0.values().all(|v| *v <= 0.0)
    }

    /// Iterates `(kind, amount)` in kind order.
    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f32)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

/// Why a debit was refused.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shortfall {
    /// The first resource that could not be paid.
    pub kind: ResourceKind,
    /// Amount requested.
    pub required: f32,
    /// Amount available.
    pub available: f32,
}

/// Stats collaborator as seen by the casting core.
pub trait ResourcePool {
    /// Current amount of a resource.
    fn current(&self, caster: CasterId, kind: ResourceKind) -> f32;

    /// Maximum amount of a resource.
    fn maximum(&self, caster: CasterId, kind: ResourceKind) -> f32;

    /// Debits every resource in `cost` or none of them.
    fn try_debit(&mut self, caster: CasterId, cost: &ResourceCost) -> Result<(), Shortfall>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct Gauge {
    current: f32,
    maximum: f32,
}

/// Map-backed [`ResourcePool`] used by the replay tool and tests.
///
/// Casters without an entry have empty pools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InMemoryResources {
    gauges: BTreeMap<(CasterId, ResourceKind), Gauge>,
}

impl InMemoryResources {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a resource to full at `maximum`.
    pub fn set_full(&mut self, caster: CasterId, kind: ResourceKind, maximum: f32) {
        let maximum = maximum.max(0.0);
        self.gauges.insert(
            (caster, kind),
            Gauge {
                current: maximum,
                maximum,
            },
        );
    }

    /// Restores an amount, capped at the maximum.
    pub fn restore(&mut self, caster: CasterId, kind: ResourceKind, amount: f32) {
        if let Some(gauge) = self.gauges.get_mut(&(caster, kind)) {
            gauge.current = (gauge.current + amount.max(0.0)).min(gauge.maximum);
        }
    }
}

impl ResourcePool for InMemoryResources {
    fn current(&self, caster: CasterId, kind: ResourceKind) -> f32 {
        self.gauges.get(&(caster, kind)).map_or(0.0, |g| g.current)
    }

    fn maximum(&self, caster: CasterId, kind: ResourceKind) -> f32 {
        self.gauges.get(&(caster, kind)).map_or(0.0, |g| g.maximum)
    }

    fn try_debit(&mut self, caster: CasterId, cost: &ResourceCost) -> Result<(), Shortfall> {
        // Check everything before touching anything.
        for (kind, required) in cost.iter().filter(|(_, amount)| *amount > 0.0) {
            let available = self.current(caster, kind);
            if available < required {
                debug!(%caster, %kind, required, available, "debit refused");
                return Err(Shortfall {
                    kind,
                    required,
                    available,
                });
            }
        }
        for (kind, amount) in cost.iter().filter(|(_, amount)| *amount > 0.0) {
            if let Some(gauge) = self.gauges.get_mut(&(caster, kind)) {
                gauge.current -= amount;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASTER: CasterId = CasterId::new(1);

    fn stocked() -> InMemoryResources {
        let mut pool = InMemoryResources::new();
        pool.set_full(CASTER, ResourceKind::Chakra, 50.0);
        pool.set_full(CASTER, ResourceKind::Stability, 10.0);
        pool
    }

    #[test]
    fn debit_takes_every_resource() {
        let mut pool = stocked();
        let cost = ResourceCost::free()
            .with(ResourceKind::Chakra, 20.0)
            .with(ResourceKind::Stability, 5.0);
        assert!(pool.try_debit(CASTER, &cost).is_ok());
        assert!((pool.current(CASTER, ResourceKind::Chakra) - 30.0).abs() < 1e-4);
        assert!((pool.current(CASTER, ResourceKind::Stability) - 5.0).abs() < 1e-4);
    }

    #[test]
    fn shortfall_debits_nothing() {
        let mut pool = stocked();
        let cost = ResourceCost::free()
            .with(ResourceKind::Chakra, 20.0)
            .with(ResourceKind::Stability, 15.0);
        let err = pool.try_debit(CASTER, &cost).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Stability);
        assert!((pool.current(CASTER, ResourceKind::Chakra) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn unknown_caster_has_empty_pools() {
        let mut pool = stocked();
        let other = CasterId::new(2);
        assert!(pool.current(other, ResourceKind::Chakra).abs() < 1e-6);
        assert!(pool.try_debit(other, &ResourceCost::free()).is_ok());
        assert!(pool
            .try_debit(other, &ResourceCost::free().with(ResourceKind::Chakra, 1.0))
            .is_err());
    }

    #[test]
    fn restore_is_capped() {
        let mut pool = stocked();
        pool.try_debit(CASTER, &ResourceCost::free().with(ResourceKind::Chakra, 10.0))
            .unwrap();
        pool.restore(CASTER, ResourceKind::Chakra, 100.0);
        assert!((pool.current(CASTER, ResourceKind::Chakra) - 50.0).abs() < 1e-4);
        assert!((pool.maximum(CASTER, ResourceKind::Chakra) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn cost_parses_from_toml_table() {
        let cost: ResourceCost = toml::from_str("chakra = 12.5\nstability = 2.0").unwrap();
        assert!((cost.amount(ResourceKind::Chakra) - 12.5).abs() < 1e-6);
        assert!(!cost.is_free());
        assert!(ResourceCost::free().is_free());
    }
}
