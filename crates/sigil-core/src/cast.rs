//! Per-caster casting lifecycle.
//!
//! ```text
//!            input                success (debit ok)        wind-up
//!   Idle ───────────▶ Channeling ───────────────────▶ CastStart ───────▶ Casting
//!    ▲                 │     │                                             │
//!    │  buffer empties │     │ success (debit refused)                     │ effect applied
//!    ├─────────────────┘     ▼                                             ▼
//!    │    penalty        Interrupted ◀──────── cancel / damage ──────── Recovery
//!    ├──────────────────────┘                                              │
//!    └─────────────────────────────── recovery ────────────────────────────┘
//! ```
//!
//! Any non-`Idle` state can be interrupted. An `Idle` caster holds no
//! [`ActiveCast`] record; one is created on the first accepted input and
//! dropped on the return to `Idle`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::caster::CasterId;
use crate::resolver::SpellId;
use crate::resources::{ResourceCost, ResourcePool};
use crate::time::{SimDuration, SimTime};

// =============================================================================
// States
// =============================================================================

/// Lifecycle phase of a caster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastState {
    /// No active cast.
    #[default]
    Idle,
    /// Inputs are being buffered.
    Channeling,
    /// Committed and paid; winding up.
    CastStart,
    /// Effect is executing.
    Casting,
    /// Cooling down after the effect.
    Recovery,
    /// Cancelled; serving the interrupt penalty.
    Interrupted,
}

impl CastState {
    /// Returns true if new inputs feed the buffer in this state.
    #[must_use]
    pub const fn accepts_input(self) -> bool {
        matches!(self, Self::Idle | Self::Channeling)
    }
}

impl fmt::Display for CastState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Why a cast was interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterruptReason {
    /// Damage above the interrupt threshold.
    Damage,
    /// Explicit cancel from the caster.
    PlayerCancel,
    /// The cast could not be paid for at commit.
    InsufficientResource,
}

/// Timing and cost of casting one outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastProfile {
    /// `CastStart` to `Casting`.
    pub wind_up: SimDuration,
    /// `Recovery` to `Idle`.
    pub recovery: SimDuration,
    /// `Interrupted` to `Idle`.
    pub interrupt_penalty: SimDuration,
    /// Debited at commit.
    pub cost: ResourceCost,
}

impl Default for CastProfile {
    fn default() -> Self {
        Self {
            wind_up: SimDuration::from_millis(500),
            recovery: SimDuration::from_millis(500),
            interrupt_penalty: SimDuration::from_millis(1000),
            cost: ResourceCost::free(),
        }
    }
}

/// One state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// State before.
    pub from: CastState,
    /// State after.
    pub to: CastState,
    /// Spell of the active cast, once committed.
    pub spell: Option<SpellId>,
    /// Set when `to` is `Interrupted`.
    pub reason: Option<InterruptReason>,
}

// =============================================================================
// Active Cast
// =============================================================================

/// The single in-flight cast of a caster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCast {
    state: CastState,
    spell: Option<SpellId>,
    profile: CastProfile,
    deadline: Option<SimTime>,
    committed: bool,
    started_at: SimTime,
}

impl ActiveCast {
    /// Current state.
    #[must_use]
    pub fn state(&self) -> CastState {
        self.state
    }

    /// Committed spell, if any.
    #[must_use]
    pub fn spell(&self) -> Option<&SpellId> {
        self.spell.as_ref()
    }

    /// Returns true once resources have been paid.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Time the current timed phase ends.
    #[must_use]
    pub fn deadline(&self) -> Option<SimTime> {
        self.deadline
    }

    /// Time channeling began.
    #[must_use]
    pub fn started_at(&self) -> SimTime {
        self.started_at
    }
}

// =============================================================================
// State Machine
// =============================================================================

/// Casting lifecycle of one caster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastingStateMachine {
    active: Option<ActiveCast>,
}

impl CastingStateMachine {
    /// Creates an idle machine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; `Idle` when there is no active cast.
    #[must_use]
    pub fn state(&self) -> CastState {
        self.active.as_ref().map_or(CastState::Idle, |a| a.state)
    }

    /// The active cast record.
    #[must_use]
    pub fn active(&self) -> Option<&ActiveCast> {
        self.active.as_ref()
    }

    fn transition(&mut self, to: CastState, reason: Option<InterruptReason>) -> Transition {
        let from = self.state();
        let spell = self.active.as_ref().and_then(|a| a.spell.clone());
        if to == CastState::Idle {
            self.active = None;
        } else if let Some(active) = self.active.as_mut() {
            active.state = to;
        }
        Transition {
            from,
            to,
            spell,
            reason,
        }
    }

    /// `Idle → Channeling` on the first accepted input.
    ///
    /// `profile` governs the interrupt penalty until a commit replaces it.
    pub fn begin_channeling(&mut self, now: SimTime, profile: CastProfile) -> Option<Transition> {
        if self.active.is_some() {
            return None;
        }
        self.active = Some(ActiveCast {
            state: CastState::Idle,
            spell: None,
            profile,
            deadline: None,
            committed: false,
            started_at: now,
        });
        Some(self.transition(CastState::Channeling, None))
    }

    /// `Channeling → CastStart` on a successful resolution.
    ///
    /// The profile's cost is debited atomically here. If it cannot be paid
    /// the cast moves to `Interrupted` instead and nothing is charged.
    pub fn commit(
        &mut self,
        caster: CasterId,
        spell: SpellId,
        profile: CastProfile,
        pool: &mut dyn ResourcePool,
        now: SimTime,
    ) -> Option<Transition> {
        if self.state() != CastState::Channeling {
            return None;
        }
        let paid = pool.try_debit(caster, &profile.cost);
        let active = self.active.as_mut()?;
        active.spell = Some(spell);
        match paid {
            Ok(()) => {
                active.committed = true;
                active.deadline = Some(now + profile.wind_up);
                active.profile = profile;
                Some(self.transition(CastState::CastStart, None))
            }
            Err(shortfall) => {
                info!(
                    %caster,
                    kind = %shortfall.kind,
                    required = shortfall.required,
                    available = shortfall.available,
                    "cast refused, insufficient resource"
                );
                active.deadline = Some(now + profile.interrupt_penalty);
                active.profile = profile;
                Some(self.transition(
                    CastState::Interrupted,
                    Some(InterruptReason::InsufficientResource),
                ))
            }
        }
    }

    /// `Channeling → Idle` when the buffer empties without a success.
    pub fn settle_channel(&mut self) -> Option<Transition> {
        (self.state() == CastState::Channeling).then(|| self.transition(CastState::Idle, None))
    }

    /// `Casting → Recovery` on the external effect-applied acknowledgment.
    pub fn acknowledge_effect(&mut self, now: SimTime) -> Option<Transition> {
        let active = self.active.as_mut()?;
        if active.state != CastState::Casting {
            return None;
        }
        active.deadline = Some(now + active.profile.recovery);
        Some(self.transition(CastState::Recovery, None))
    }

    /// Any non-`Idle` state → `Interrupted`.
    ///
    /// Already-interrupted casts keep their original penalty. Resources paid
    /// at commit are not refunded.
    pub fn interrupt(&mut self, reason: InterruptReason, now: SimTime) -> Option<Transition> {
        let active = self.active.as_mut()?;
        if active.state == CastState::Interrupted {
            return None;
        }
        active.deadline = Some(now + active.profile.interrupt_penalty);
        debug!(?reason, committed = active.committed, "cast interrupted");
        Some(self.transition(CastState::Interrupted, Some(reason)))
    }

    /// Advances timed phases whose deadline has passed.
    ///
    /// At most one transition per call.
    pub fn tick(&mut self, now: SimTime) -> Option<Transition> {
        let active = self.active.as_mut()?;
        let deadline = active.deadline?;
        if now < deadline {
            return None;
        }
        let state = active.state;
        match state {
            CastState::CastStart => {
                active.deadline = None;
                Some(self.transition(CastState::Casting, None))
            }
            CastState::Recovery | CastState::Interrupted => {
                Some(self.transition(CastState::Idle, None))
            }
            CastState::Idle | CastState::Channeling | CastState::Casting => None,
        }
    }
}
