//! Combo resolution over a caster's buffered inputs.
//!
//! The [`ComboResolver`] matches the unconsumed inputs inside the combo window
//! against the registered [`ComboDefinition`]s. Rules are evaluated in strict
//! priority order and the first satisfied rule short-circuits, so a single
//! resolution produces at most one outcome:
//!
//! 1. **Combo match**: the whole window spells a registered combo.
//! 2. **Experiment**: at least two inputs, all `Known`, no registered combo.
//! 3. **Discovery**: a single input whose symbol is not yet `Known`.
//! 4. **Fizzle**: the oldest unconsumed input has outlived the window.
//!
//! # Longest match
//!
//! A window that matches a combo but is also the prefix of a longer combo is
//! held back, so the longer combo stays reachable. The held match fires when
//! the window times out, or as soon as a later input leaves the trie: only
//! the matched inputs are consumed and the rest stay buffered. A window that
//! prefixes a registered combo is pending rather than an experiment; if the
//! longer combo never arrives, known inputs still resolve as an experiment at
//! timeout.
//!
//! # Tie-break
//!
//! Registering the same sequence twice keeps the earliest registration.
//!
//! # Example
//!
//! ```
//! use sigil_core::buffer::{InputEvent, InputSequenceBuffer};
//! use sigil_core::caster::CasterId;
//! use sigil_core::knowledge::KnowledgeTracker;
//! use sigil_core::resolver::{ComboDefinition, ComboResolver, OutcomeKind};
//! use sigil_core::symbol::{Concept, SymbolId};
//! use sigil_core::time::{SimDuration, SimTime};
//!
//! let combos = vec![ComboDefinition::new(vec![Concept::Flame, Concept::Gale], "firestorm")];
//! let resolver = ComboResolver::new(combos, SimDuration::from_millis(1500)).unwrap();
//!
//! let caster = CasterId::new(1);
//! let mut knowledge = KnowledgeTracker::new();
//! let mut buffer = InputSequenceBuffer::default();
//! buffer.push(InputEvent::new(SymbolId::new("a"), Concept::Flame, SimTime::from_millis(0)));
//! buffer.push(InputEvent::new(SymbolId::new("b"), Concept::Gale, SimTime::from_millis(200)));
//!
//! let resolution = resolver
//!     .resolve_after_push(caster, &mut buffer, &mut knowledge, SimTime::from_millis(200))
//!     .unwrap();
//! assert_eq!(resolution.kind, OutcomeKind::ComboMatch);
//! assert!(buffer.is_empty());
//! ```

mod combo;
mod trie;

pub use combo::{ComboDefinition, ComboError, SpellId, MIN_COMBO_LEN};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::buffer::{InputEvent, InputSequenceBuffer};
use crate::caster::CasterId;
use crate::knowledge::{KnowledgeChange, KnowledgeState, KnowledgeTracker};
use crate::symbol::{Concept, SymbolId};
use crate::time::{SimDuration, SimTime};

use trie::ComboTrie;

/// Default maximum age of an unconsumed input before it fizzles.
pub const DEFAULT_COMBO_WINDOW: SimDuration = SimDuration::from_millis(1500);

/// Category of a resolution outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// A registered combo matched.
    ComboMatch,
    /// A plausible freeform sequence of known symbols.
    Experiment,
    /// A symbol's knowledge tier advanced.
    Discovery,
    /// The window expired without a match.
    Fizzle,
}

impl OutcomeKind {
    /// Returns true for outcomes that start a cast.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::ComboMatch | Self::Experiment)
    }
}

/// A knowledge tier change produced by rule 3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discovery {
    /// The symbol that advanced.
    pub symbol: SymbolId,
    /// Tier before.
    pub from: KnowledgeState,
    /// Tier after.
    pub to: KnowledgeState,
}

/// One resolution outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Which rule fired.
    pub kind: OutcomeKind,
    /// The spell to cast; set for combo matches and experiments.
    pub spell: Option<SpellId>,
    /// Concepts of the inputs involved, in input order.
    pub concepts: Vec<Concept>,
    /// The inputs involved.
    pub inputs: Vec<InputEvent>,
    /// Knowledge change, for discoveries.
    pub discovery: Option<Discovery>,
}

impl Resolution {
    fn new(kind: OutcomeKind, spell: Option<SpellId>, inputs: Vec<InputEvent>) -> Self {
        Self {
            kind,
            spell,
            concepts: inputs.iter().map(|e| e.concept).collect(),
            inputs,
            discovery: None,
        }
    }
}

/// Matches buffered inputs against the registered combos.
///
/// Built once at startup; the combo table is immutable afterwards.
#[derive(Debug, Clone)]
pub struct ComboResolver {
    combos: Vec<ComboDefinition>,
    trie: ComboTrie,
    window: SimDuration,
}

impl ComboResolver {
    /// Builds a resolver from combo definitions, in registration order.
    ///
    /// Duplicated sequences keep the earliest registration and log a warning.
    pub fn new(definitions: Vec<ComboDefinition>, window: SimDuration) -> Result<Self, ComboError> {
        let mut trie = ComboTrie::new();
        let mut combos = Vec::with_capacity(definitions.len());
        for definition in definitions {
            definition.validate()?;
            match trie.insert(&definition.concepts, combos.len()) {
                Ok(()) => combos.push(definition),
                Err(existing) => {
                    let kept: &ComboDefinition = &combos[existing];
                    warn!(
                        kept = %kept.spell,
                        dropped = %definition.spell,
                        "duplicate combo sequence, keeping earliest registration"
                    );
                }
            }
        }
        Ok(Self {
            combos,
            trie,
            window,
        })
    }

    /// Logs combos that use concepts no symbol in this world maps to.
    ///
    /// Returns the unreachable spells.
    pub fn report_unreachable(&self, present: &BTreeSet<Concept>) -> Vec<SpellId> {
        let mut unreachable = Vec::new();
        for combo in &self.combos {
            if let Some(missing) = combo.concepts.iter().find(|c| !present.contains(*c)) {
                warn!(spell = %combo.spell, %missing, "combo is unreachable in this world");
                unreachable.push(combo.spell.clone());
            }
        }
        unreachable
    }

    /// Registered combos, in registration order.
    #[must_use]
    pub fn combos(&self) -> &[ComboDefinition] {
        &self.combos
    }

    /// Maximum age of an unconsumed input.
    #[must_use]
    pub fn window(&self) -> SimDuration {
        self.window
    }

    /// Resolution attempt after a successful buffer push.
    ///
    /// Evaluates all four rules against the inputs within the window.
    pub fn resolve_after_push(
        &self,
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        knowledge: &mut KnowledgeTracker,
        now: SimTime,
    ) -> Option<Resolution> {
        let window = buffer.recent_unconsumed(now.saturating_sub(self.window));
        if window.is_empty() {
            return self.resolve_timeout(caster, buffer, knowledge, now);
        }
        let concepts: Vec<Concept> = window.iter().map(|e| e.concept).collect();
        let extendable = self.trie.has_extension(&concepts);

        // Rule 1: exact combo match over the full window.
        if let Some(index) = self.trie.exact(&concepts) {
            if !extendable {
                return Some(self.fire_combo(caster, buffer, index, window));
            }
            debug!(%caster, spell = %self.combos[index].spell, "holding match for longer combo");
        } else if concepts.len() >= MIN_COMBO_LEN && !extendable {
            // A held match whose longer combo was abandoned.
            if let Some(resolution) = self.fire_held_prefix(caster, buffer, &window) {
                return Some(resolution);
            }
            // Rule 2: all known, nothing registered.
            if let Some(resolution) = Self::experiment(caster, buffer, knowledge, window) {
                return Some(resolution);
            }
        } else if let [input] = window.as_slice() {
            // Rule 3: single unfamiliar symbol.
            if let Some(resolution) = Self::discover(caster, buffer, knowledge, input) {
                return Some(resolution);
            }
        }

        // Rule 4: timeout.
        self.resolve_timeout(caster, buffer, knowledge, now)
    }

    /// Timeout handling, evaluated every tick for casters with buffered input.
    ///
    /// Once the oldest unconsumed input is older than the window, pending
    /// inputs that all fit inside one window resolve in order of preference:
    ///
    /// - a combo spelled by all of them fires;
    /// - otherwise the longest registered prefix fires and the rest stay
    ///   buffered;
    /// - otherwise two or more `Known` inputs are an experiment;
    /// - otherwise the buffer fizzles and is cleared.
    ///
    /// Pending inputs spread wider than the window always fizzle.
    pub fn resolve_timeout(
        &self,
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        knowledge: &KnowledgeTracker,
        now: SimTime,
    ) -> Option<Resolution> {
        let oldest = buffer.oldest_unconsumed()?.timestamp;
        if now.since(oldest) <= self.window {
            return None;
        }

        let pending = buffer.unconsumed();
        let concepts: Vec<Concept> = pending.iter().map(|e| e.concept).collect();
        // Inputs further apart than the window never formed one sequence.
        let held = pending
            .last()
            .is_some_and(|newest| newest.timestamp.since(oldest) <= self.window);
        if held {
            if let Some(index) = self.trie.exact(&concepts) {
                return Some(self.fire_combo(caster, buffer, index, pending));
            }
            if let Some(resolution) = self.fire_held_prefix(caster, buffer, &pending) {
                return Some(resolution);
            }
            if pending.len() >= MIN_COMBO_LEN {
                if let Some(resolution) =
                    Self::experiment(caster, buffer, knowledge, pending.clone())
                {
                    return Some(resolution);
                }
            }
        }

        buffer.clear();
        debug!(%caster, ?concepts, "fizzle");
        Some(Resolution::new(OutcomeKind::Fizzle, None, pending))
    }

    /// Fires the longest registered prefix of `inputs`, leaving the tail
    /// buffered.
    fn fire_held_prefix(
        &self,
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        inputs: &[InputEvent],
    ) -> Option<Resolution> {
        let concepts: Vec<Concept> = inputs.iter().map(|e| e.concept).collect();
        let (len, index) = self.trie.longest_match(&concepts)?;
        if len < MIN_COMBO_LEN {
            return None;
        }
        debug!(%caster, left = inputs.len() - len, "releasing held match");
        Some(self.fire_combo(caster, buffer, index, inputs[..len].to_vec()))
    }

    fn experiment(
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        knowledge: &KnowledgeTracker,
        inputs: Vec<InputEvent>,
    ) -> Option<Resolution> {
        let symbols: Vec<SymbolId> = inputs.iter().map(|e| e.symbol.clone()).collect();
        if !knowledge.all_at_least(caster, &symbols, KnowledgeState::Known) {
            return None;
        }
        buffer.mark_consumed(&inputs);
        let resolution = Resolution::new(
            OutcomeKind::Experiment,
            Some(SpellId::experiment()),
            inputs,
        );
        debug!(%caster, concepts = ?resolution.concepts, "plausible experiment");
        Some(resolution)
    }

    fn fire_combo(
        &self,
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        index: usize,
        inputs: Vec<InputEvent>,
    ) -> Resolution {
        let spell = self.combos[index].spell.clone();
        buffer.mark_consumed(&inputs);
        debug!(%caster, %spell, "combo matched");
        Resolution::new(OutcomeKind::ComboMatch, Some(spell), inputs)
    }

    fn discover(
        caster: CasterId,
        buffer: &mut InputSequenceBuffer,
        knowledge: &mut KnowledgeTracker,
        input: &InputEvent,
    ) -> Option<Resolution> {
        let KnowledgeChange::Advanced { from, to } = knowledge.promote(caster, &input.symbol)
        else {
            return None;
        };
        // A first sighting stays buffered for real combo matching.
        if from != KnowledgeState::Hidden {
            buffer.mark_consumed(std::slice::from_ref(input));
        }
        debug!(%caster, symbol = %input.symbol, ?from, ?to, "discovery");
        let mut resolution = Resolution::new(OutcomeKind::Discovery, None, vec![input.clone()]);
        resolution.discovery = Some(Discovery {
            symbol: input.symbol.clone(),
            from,
            to,
        });
        Some(resolution)
    }
}
