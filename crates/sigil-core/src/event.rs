//! Events produced by the casting core.
//!
//! Everything that leaves the core is an immutable [`SpellEvent`] wrapped in an
//! [`EventEnvelope`] carrying the tick and a per-tick sequence number, so
//! consumers can order events totally without looking at wall time.
//!
//! # Example
//!
//! ```
//! use sigil_core::caster::CasterId;
//! use sigil_core::event::{EventLog, RejectReason, SpellEvent};
//!
//! let mut log = EventLog::new();
//! log.begin_tick(3);
//! log.record(SpellEvent::CommandRejected {
//!     caster: CasterId::new(9),
//!     reason: RejectReason::UnknownCaster,
//! });
//!
//! let events = log.take_events();
//! assert_eq!(events[0].tick(), 3);
//! assert_eq!(events[0].sequence(), 0);
//! assert!(log.is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::caster::CasterId;
use crate::cast::{CastState, InterruptReason};
use crate::knowledge::KnowledgeState;
use crate::resolver::{Discovery, OutcomeKind, SpellId};
use crate::symbol::{Concept, SymbolId};

/// Why a command was dropped without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    /// The caster id is not registered.
    UnknownCaster,
    /// The symbol id is not part of this world.
    InvalidSymbol,
    /// The pressed hotbar slot has no binding.
    EmptySlot,
    /// The caster is past channeling and cannot take input.
    CastInProgress,
    /// Same symbol pressed again within the debounce interval.
    Debounced,
    /// Input timestamp earlier than the newest buffered input.
    OutOfOrder,
}

/// Observable result of processing a command or a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SpellEvent {
    /// A press was resolved to a symbol and buffered.
    InputRecognized {
        /// The caster.
        caster: CasterId,
        /// The symbol pressed.
        symbol: SymbolId,
        /// Concept the symbol maps to in this world.
        concept: Concept,
        /// Caster's knowledge of the symbol at press time.
        knowledge: KnowledgeState,
    },

    /// The resolver produced an outcome.
    ComboOutcome {
        /// The caster.
        caster: CasterId,
        /// Spell id for combo matches and experiments.
        outcome: Option<SpellId>,
        /// Which rule fired.
        kind: OutcomeKind,
        /// Concepts involved, in input order.
        concepts: Vec<Concept>,
        /// Knowledge change for discoveries.
        discovery: Option<Discovery>,
    },

    /// The caster's lifecycle state changed.
    CastStateChanged {
        /// The caster.
        caster: CasterId,
        /// State before.
        old: CastState,
        /// State after.
        new: CastState,
        /// Spell of the active cast, once committed.
        outcome: Option<SpellId>,
        /// Set on transitions into `Interrupted`.
        reason: Option<InterruptReason>,
    },

    /// A command was dropped.
    CommandRejected {
        /// The caster the command targeted.
        caster: CasterId,
        /// Why.
        reason: RejectReason,
    },
}

impl SpellEvent {
    /// The caster this event concerns.
    #[must_use]
    pub fn caster(&self) -> CasterId {
        match self {
            Self::InputRecognized { caster, .. }
            | Self::ComboOutcome { caster, .. }
            | Self::CastStateChanged { caster, .. }
            | Self::CommandRejected { caster, .. } => *caster,
        }
    }

    /// Returns the outcome kind for `ComboOutcome` events.
    #[must_use]
    pub fn outcome_kind(&self) -> Option<OutcomeKind> {
        match self {
            Self::ComboOutcome { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns `(old, new)` for `CastStateChanged` events.
    #[must_use]
    pub fn state_change(&self) -> Option<(CastState, CastState)> {
        match self {
            Self::CastStateChanged { old, new, .. } => Some((*old, *new)),
            _ => None,
        }
    }

    /// Returns the reason for `CommandRejected` events.
    #[must_use]
    pub fn rejection(&self) -> Option<RejectReason> {
        match self {
            Self::CommandRejected { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

/// A [`SpellEvent`] with ordering metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    tick: u64,
    sequence: u32,
    event: SpellEvent,
}

impl EventEnvelope {
    /// Wraps an event.
    #[must_use]
    pub fn new(event: SpellEvent, tick: u64, sequence: u32) -> Self {
        Self {
            tick,
            sequence,
            event,
        }
    }

    /// Tick the event was produced in.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Position within the tick.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// The wrapped event.
    #[must_use]
    pub fn event(&self) -> &SpellEvent {
        &self.event
    }

    /// Consumes the envelope and returns the event.
    #[must_use]
    pub fn into_event(self) -> SpellEvent {
        self.event
    }
}

/// Append-only event log, drained by the caller.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<EventEnvelope>,
    tick: u64,
    next_sequence: u32,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts stamping events with `tick`; sequence numbers restart at 0.
    pub fn begin_tick(&mut self, tick: u64) {
        self.tick = tick;
        self.next_sequence = 0;
    }

    /// Appends an event.
    pub fn record(&mut self, event: SpellEvent) {
        self.entries
            .push(EventEnvelope::new(event, self.tick, self.next_sequence));
        self.next_sequence = self.next_sequence.saturating_add(1);
    }

    /// Drains and returns every recorded event, oldest first.
    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.entries)
    }

    /// Number of undrained events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is waiting to be drained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Undrained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventEnvelope> + '_ {
        self.entries.iter()
    }
}
