//! The spell engine and its fixed-step tick loop.
//!
//! Commands are queued with [`SpellEngine::submit`] and applied on the next
//! [`SpellEngine::step`], in five phases:
//!
//! 1. **SIGNALS**: cancels, damage reports and effect acknowledgments
//! 2. **TIMERS**: wind-up, recovery and penalty deadlines
//! 3. **INPUTS**: symbol and slot presses in submission order, all stamped
//!    with the tick's simulation time
//! 4. **EXPIRY**: timeout resolution for casters with buffered input
//! 5. **APPLY**: the clock advances one tick
//!
//! Casters are visited in id order in every phase, so a given seed and
//! command trace always produce the same event stream.
//!
//! # Example
//!
//! ```
//! use sigil_core::caster::{CasterId, CasterRoster};
//! use sigil_core::command::CasterCommand;
//! use sigil_core::config::SpellConfig;
//! use sigil_core::engine::SpellEngine;
//! use sigil_core::event::SpellEvent;
//!
//! let player = CasterId::new(1);
//! let mut roster = CasterRoster::new();
//! roster.set_player(player);
//!
//! let mut engine = SpellEngine::builder(SpellConfig::with_seed(12345))
//!     .with_registry(Box::new(roster))
//!     .build()
//!     .unwrap();
//!
//! let symbol = engine.symbol_map().iter().next().unwrap().id.clone();
//! engine.submit(CasterCommand::PressSymbol { caster: player, symbol });
//! engine.step();
//!
//! let events = engine.take_events();
//! assert!(matches!(events[0].event(), SpellEvent::InputRecognized { .. }));
//! ```

use std::fmt;

use tracing::{debug, info, warn};

use crate::arena::{CasterArena, CasterSlot};
use crate::buffer::{InputEvent, InputSequenceBuffer, PushOutcome};
use crate::cast::{ActiveCast, CastState, InterruptReason, Transition};
use crate::caster::{CasterId, CasterRegistry, CasterRoster};
use crate::command::CasterCommand;
use crate::config::SpellConfig;
use crate::error::{Error, Result};
use crate::event::{EventEnvelope, EventLog, RejectReason, SpellEvent};
use crate::hotbar::Hotbar;
use crate::knowledge::{KnowledgeChange, KnowledgeState, KnowledgeTracker};
use crate::resolver::{ComboResolver, Resolution};
use crate::resources::{InMemoryResources, ResourcePool};
use crate::startup::{DependencyGraph, StartupError, Subsystem};
use crate::symbol::{fingerprint, SymbolId, SymbolMap};
use crate::time::{SimTime, TickClock};

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`SpellEngine`] from a config and its collaborators.
pub struct SpellEngineBuilder {
    config: SpellConfig,
    registry: Box<dyn CasterRegistry>,
    resources: Box<dyn ResourcePool>,
    graph: DependencyGraph,
}

impl SpellEngineBuilder {
    /// Starts a builder with an empty roster and empty resource pools.
    #[must_use]
    pub fn new(config: SpellConfig) -> Self {
        Self {
            config,
            registry: Box::new(CasterRoster::new()),
            resources: Box::new(InMemoryResources::new()),
            graph: DependencyGraph::standard(),
        }
    }

    /// Sets the caster registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Box<dyn CasterRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the resource pool.
    #[must_use]
    pub fn with_resources(mut self, resources: Box<dyn ResourcePool>) -> Self {
        self.resources = resources;
        self
    }

    /// Replaces the subsystem dependency graph.
    #[must_use]
    pub fn with_startup_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = graph;
        self
    }

    /// Validates the config and builds every subsystem in dependency order.
    pub fn build(self) -> Result<SpellEngine> {
        let config = self.config;
        config.validate()?;
        let order = self.graph.resolve()?;

        let mut clock = None;
        let mut symbols = None;
        let mut knowledge = None;
        let mut resolver = None;
        let mut casters = None;
        let mut events = None;

        for subsystem in &order {
            match subsystem {
                Subsystem::Clock => clock = Some(TickClock::new(config.tick_rate)),
                Subsystem::SymbolMap => {
                    symbols = Some(SymbolMap::generate(config.world_seed, config.symbol_count));
                }
                Subsystem::Knowledge => knowledge = Some(KnowledgeTracker::new()),
                Subsystem::Resolver => {
                    let map: &SymbolMap = symbols
                        .as_ref()
                        .ok_or(StartupError::NotBuilt(Subsystem::SymbolMap))?;
                    let built = ComboResolver::new(config.combo_definitions(), config.combo_window())?;
                    built.report_unreachable(&map.concepts_present());
                    resolver = Some(built);
                }
                Subsystem::Casters => casters = Some(CasterArena::new()),
                Subsystem::Events => events = Some(EventLog::new()),
            }
            debug!(%subsystem, "subsystem ready");
        }

        let symbols = symbols.ok_or(StartupError::NotBuilt(Subsystem::SymbolMap))?;
        info!(
            seed = config.world_seed,
            symbols = symbols.len(),
            fingerprint = fingerprint(&symbols),
            ?order,
            "spell engine ready"
        );

        Ok(SpellEngine {
            clock: clock.ok_or(StartupError::NotBuilt(Subsystem::Clock))?,
            knowledge: knowledge.ok_or(StartupError::NotBuilt(Subsystem::Knowledge))?,
            resolver: resolver.ok_or(StartupError::NotBuilt(Subsystem::Resolver))?,
            casters: casters.ok_or(StartupError::NotBuilt(Subsystem::Casters))?,
            events: events.ok_or(StartupError::NotBuilt(Subsystem::Events))?,
            symbols,
            config,
            registry: self.registry,
            resources: self.resources,
            queue: Vec::new(),
        })
    }
}

// =============================================================================
// Engine
// =============================================================================

/// The casting core of one world.
pub struct SpellEngine {
    config: SpellConfig,
    clock: TickClock,
    symbols: SymbolMap,
    knowledge: KnowledgeTracker,
    resolver: ComboResolver,
    casters: CasterArena,
    events: EventLog,
    registry: Box<dyn CasterRegistry>,
    resources: Box<dyn ResourcePool>,
    queue: Vec<CasterCommand>,
}

impl fmt::Debug for SpellEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpellEngine")
            .field("tick", &self.clock.tick())
            .field("seed", &self.config.world_seed)
            .field("symbols", &self.symbols.len())
            .field("casters", &self.casters.len())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl SpellEngine {
    /// Starts building an engine.
    #[must_use]
    pub fn builder(config: SpellConfig) -> SpellEngineBuilder {
        SpellEngineBuilder::new(config)
    }

    /// Queues a command for the next tick.
    pub fn submit(&mut self, command: CasterCommand) {
        self.queue.push(command);
    }

    /// Runs one tick.
    pub fn step(&mut self) {
        let now = self.clock.now();
        self.events.begin_tick(self.clock.tick());

        let (signals, presses): (Vec<_>, Vec<_>) = std::mem::take(&mut self.queue)
            .into_iter()
            .partition(CasterCommand::is_signal);

        // Phase 1: SIGNALS
        for command in signals {
            self.apply_signal(command, now);
        }

        // Phase 2: TIMERS
        self.advance_timers(now);

        // Phase 3: INPUTS
        for command in presses {
            self.apply_press(command, now);
        }

        // Phase 4: EXPIRY
        self.expire_buffers(now);

        // Phase 5: APPLY
        self.clock.advance();
    }

    /// Drains every event produced so far.
    pub fn take_events(&mut self) -> Vec<EventEnvelope> {
        self.events.take_events()
    }

    // -------------------------------------------------------------------------
    // Phases
    // -------------------------------------------------------------------------

    fn admit(&mut self, caster: CasterId) -> bool {
        if self.registry.is_registered(caster) {
            return true;
        }
        warn!(%caster, "command for unregistered caster");
        self.reject(caster, RejectReason::UnknownCaster);
        false
    }

    fn reject(&mut self, caster: CasterId, reason: RejectReason) {
        self.events
            .record(SpellEvent::CommandRejected { caster, reason });
    }

    fn record_transition(events: &mut EventLog, caster: CasterId, transition: Transition) {
        events.record(SpellEvent::CastStateChanged {
            caster,
            old: transition.from,
            new: transition.to,
            outcome: transition.spell,
            reason: transition.reason,
        });
    }

    fn apply_signal(&mut self, command: CasterCommand, now: SimTime) {
        let caster = command.caster();
        if !self.admit(caster) {
            return;
        }
        let Some(slot) = self.casters.get_mut(caster) else {
            debug!(%caster, ?command, "signal for idle caster");
            return;
        };
        let transition = match command {
            CasterCommand::Cancel { .. } => slot.machine.interrupt(InterruptReason::PlayerCancel, now),
            CasterCommand::Damage { amount, .. } => {
                if amount > self.config.interrupt_damage_threshold {
                    slot.machine.interrupt(InterruptReason::Damage, now)
                } else {
                    debug!(%caster, amount, "damage below interrupt threshold");
                    None
                }
            }
            CasterCommand::EffectApplied { .. } => slot.machine.acknowledge_effect(now),
            CasterCommand::ResourceDepleted { .. } => slot
                .machine
                .interrupt(InterruptReason::InsufficientResource, now),
            CasterCommand::PressSymbol { .. } | CasterCommand::PressSlot { .. } => None,
        };
        if let Some(transition) = transition {
            if transition.to == CastState::Interrupted {
                slot.buffer.clear();
            }
            Self::record_transition(&mut self.events, caster, transition);
        }
    }

    fn advance_timers(&mut self, now: SimTime) {
        let ids: Vec<CasterId> = self.casters.ids_sorted().collect();
        for caster in ids {
            let Some(slot) = self.casters.get_mut(caster) else {
                continue;
            };
            if let Some(transition) = slot.machine.tick(now) {
                Self::record_transition(&mut self.events, caster, transition);
            }
        }
    }

    fn apply_press(&mut self, command: CasterCommand, now: SimTime) {
        let caster = command.caster();
        if !self.admit(caster) {
            return;
        }

        let symbol = match command {
            CasterCommand::PressSymbol { symbol, .. } => symbol,
            CasterCommand::PressSlot { slot, .. } => {
                let bound = self
                    .casters
                    .get(caster)
                    .and_then(|s| s.hotbar.symbol_at(slot))
                    .cloned();
                match bound {
                    Some(symbol) => symbol,
                    None => {
                        debug!(%caster, slot, "press on empty slot");
                        self.reject(caster, RejectReason::EmptySlot);
                        return;
                    }
                }
            }
            CasterCommand::Cancel { .. }
            | CasterCommand::Damage { .. }
            | CasterCommand::EffectApplied { .. }
            | CasterCommand::ResourceDepleted { .. } => return,
        };

        let concept = self.symbols.concept_of(symbol.as_str());
        if concept.is_none() {
            warn!(%caster, %symbol, "press of symbol outside this world");
            self.reject(caster, RejectReason::InvalidSymbol);
            return;
        }

        let (capacity, debounce, slots) = (
            self.config.buffer_capacity,
            self.config.debounce(),
            self.config.hotbar_slots,
        );
        let slot = self.casters.get_or_insert_with(caster, || {
            CasterSlot::new(
                caster,
                InputSequenceBuffer::new(capacity, debounce),
                Hotbar::new(slots),
            )
        });

        if !slot.machine.state().accepts_input() {
            debug!(%caster, state = %slot.machine.state(), "input during active cast dropped");
            self.reject(caster, RejectReason::CastInProgress);
            return;
        }

        let knowledge = self.knowledge.get(caster, symbol.as_str());
        match slot.buffer.push(InputEvent::new(symbol.clone(), concept, now)) {
            PushOutcome::Debounced => {
                self.reject(caster, RejectReason::Debounced);
                return;
            }
            PushOutcome::OutOfOrder => {
                self.reject(caster, RejectReason::OutOfOrder);
                return;
            }
            PushOutcome::Accepted | PushOutcome::AcceptedWithEviction(_) => {}
        }
        self.events.record(SpellEvent::InputRecognized {
            caster,
            symbol,
            concept,
            knowledge,
        });

        if let Some(transition) = slot
            .machine
            .begin_channeling(now, self.config.default_profile.to_profile())
        {
            Self::record_transition(&mut self.events, caster, transition);
        }

        let resolution =
            self.resolver
                .resolve_after_push(caster, &mut slot.buffer, &mut self.knowledge, now);
        if let Some(resolution) = resolution {
            self.apply_resolution(caster, resolution, now);
        }
    }

    fn expire_buffers(&mut self, now: SimTime) {
        let ids: Vec<CasterId> = self.casters.ids_sorted().collect();
        for caster in ids {
            let Some(slot) = self.casters.get_mut(caster) else {
                continue;
            };
            if slot.buffer.is_empty() {
                continue;
            }
            let expired = self
                .resolver
                .resolve_timeout(caster, &mut slot.buffer, &self.knowledge, now);
            if let Some(resolution) = expired {
                self.apply_resolution(caster, resolution, now);
            }
        }
    }

    /// Publishes an outcome and drives the caster's state machine from it.
    fn apply_resolution(&mut self, caster: CasterId, resolution: Resolution, now: SimTime) {
        let Resolution {
            kind,
            spell,
            concepts,
            discovery,
            ..
        } = resolution;
        self.events.record(SpellEvent::ComboOutcome {
            caster,
            outcome: spell.clone(),
            kind,
            concepts,
            discovery,
        });

        let Some(slot) = self.casters.get_mut(caster) else {
            return;
        };
        let transition = match spell.filter(|_| kind.is_success()) {
            Some(spell) => {
                // Leftover inputs do not outlive the commit.
                slot.buffer.clear();
                let profile = self.config.profile_for(&spell);
                slot.machine
                    .commit(caster, spell, profile, self.resources.as_mut(), now)
            }
            None if slot.buffer.is_empty() => slot.machine.settle_channel(),
            None => None,
        };
        if let Some(transition) = transition {
            Self::record_transition(&mut self.events, caster, transition);
        }
    }

    // -------------------------------------------------------------------------
    // Knowledge and hotbar
    // -------------------------------------------------------------------------

    /// Binds a `Known` symbol to a caster's hotbar slot.
    ///
    /// Returns the previous binding of the slot.
    pub fn bind_slot(
        &mut self,
        caster: CasterId,
        slot: usize,
        symbol: SymbolId,
    ) -> Result<Option<SymbolId>> {
        if !self.registry.is_registered(caster) {
            return Err(Error::UnknownCaster(caster));
        }
        let (capacity, debounce, slots) = (
            self.config.buffer_capacity,
            self.config.debounce(),
            self.config.hotbar_slots,
        );
        let entry = self.casters.get_or_insert_with(caster, || {
            CasterSlot::new(
                caster,
                InputSequenceBuffer::new(capacity, debounce),
                Hotbar::new(slots),
            )
        });
        Ok(entry
            .hotbar
            .bind(caster, slot, symbol, &self.symbols, &self.knowledge)?)
    }

    /// Advances a caster's knowledge of a symbol, e.g. from a tutor or scroll.
    pub fn learn(
        &mut self,
        caster: CasterId,
        symbol: &SymbolId,
        state: KnowledgeState,
    ) -> Result<KnowledgeChange> {
        if !self.registry.is_registered(caster) {
            return Err(Error::UnknownCaster(caster));
        }
        Ok(self.knowledge.update(caster, symbol, state))
    }

    /// Administrative reset of a caster's knowledge of one symbol.
    ///
    /// Returns the state held before the reset.
    pub fn forget(&mut self, caster: CasterId, symbol: &str) -> KnowledgeState {
        self.knowledge.reset(caster, symbol)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The knowledge tables.
    #[must_use]
    pub fn knowledge(&self) -> &KnowledgeTracker {
        &self.knowledge
    }

    /// The world's symbol map.
    #[must_use]
    pub fn symbol_map(&self) -> &SymbolMap {
        &self.symbols
    }

    /// The combo resolver.
    #[must_use]
    pub fn resolver(&self) -> &ComboResolver {
        &self.resolver
    }

    /// The active config.
    #[must_use]
    pub fn config(&self) -> &SpellConfig {
        &self.config
    }

    /// The resource collaborator.
    #[must_use]
    pub fn resources(&self) -> &dyn ResourcePool {
        self.resources.as_ref()
    }

    /// Lifecycle state of a caster; `Idle` for casters never seen.
    #[must_use]
    pub fn cast_state(&self, caster: CasterId) -> CastState {
        self.casters
            .get(caster)
            .map_or(CastState::Idle, |s| s.machine.state())
    }

    /// The cast a caster is working on, if not idle.
    #[must_use]
    pub fn active_cast(&self, caster: CasterId) -> Option<&ActiveCast> {
        self.casters.get(caster).and_then(|s| s.machine.active())
    }

    /// A caster's input buffer.
    #[must_use]
    pub fn buffer(&self, caster: CasterId) -> Option<&InputSequenceBuffer> {
        self.casters.get(caster).map(|s| &s.buffer)
    }

    /// A caster's hotbar.
    #[must_use]
    pub fn hotbar(&self, caster: CasterId) -> Option<&Hotbar> {
        self.casters.get(caster).map(|s| &s.hotbar)
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Simulation time of the next tick.
    #[must_use]
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Number of commands waiting for the next tick.
    #[must_use]
    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::OutcomeKind;
    use crate::symbol::Concept;

    const PLAYER: CasterId = CasterId::new(1);

    fn roster() -> Box<CasterRoster> {
        let mut roster = CasterRoster::new();
        roster.set_player(PLAYER);
        Box::new(roster)
    }

    fn engine() -> SpellEngine {
        SpellEngine::builder(SpellConfig::with_seed(99))
            .with_registry(roster())
            .build()
            .unwrap()
    }

    fn first_symbol(engine: &SpellEngine) -> SymbolId {
        engine.symbol_map().iter().next().unwrap().id.clone()
    }

    mod build_tests {
        use super::*;

        #[test]
        fn invalid_config_fails_build() {
            let mut config = SpellConfig::with_seed(1);
            config.tick_rate = 0;
            assert!(matches!(
                SpellEngine::builder(config).build(),
                Err(Error::Config(_))
            ));
        }

        #[test]
        fn bad_combo_fails_build() {
            let mut config = SpellConfig::with_seed(1);
            config.combos.push(crate::config::ComboConfig {
                concepts: vec![Concept::Flame],
                spell: "spark".to_string(),
            });
            assert!(matches!(
                SpellEngine::builder(config).build(),
                Err(Error::Combo(_))
            ));
        }

        #[test]
        fn incomplete_startup_graph_fails_build() {
            let mut graph = DependencyGraph::new();
            graph.declare(Subsystem::SymbolMap, &[]);
            let result = SpellEngine::builder(SpellConfig::with_seed(1))
                .with_startup_graph(graph)
                .build();
            assert!(matches!(
                result,
                Err(Error::Startup(StartupError::NotBuilt(Subsystem::Clock)))
            ));
        }

        #[test]
        fn cyclic_startup_graph_fails_build() {
            let mut graph = DependencyGraph::standard();
            graph.declare(Subsystem::SymbolMap, &[Subsystem::Casters]);
            let result = SpellEngine::builder(SpellConfig::with_seed(1))
                .with_startup_graph(graph)
                .build();
            assert!(matches!(
                result,
                Err(Error::Startup(StartupError::Cycle(_)))
            ));
        }
    }

    mod step_tests {
        use super::*;

        #[test]
        fn step_advances_clock() {
            let mut engine = engine();
            assert_eq!(engine.now(), SimTime::ZERO);
            engine.step();
            engine.step();
            assert_eq!(engine.tick(), 2);
            assert_eq!(engine.now(), SimTime::from_millis(100));
        }

        #[test]
        fn commands_wait_for_step() {
            let mut engine = engine();
            let symbol = first_symbol(&engine);
            engine.submit(CasterCommand::PressSymbol {
                caster: PLAYER,
                symbol,
            });
            assert_eq!(engine.pending_commands(), 1);
            assert!(engine.take_events().is_empty());
            engine.step();
            assert_eq!(engine.pending_commands(), 0);
            assert!(!engine.take_events().is_empty());
        }

        #[test]
        fn first_press_discovers_and_channels() {
            let mut engine = engine();
            let symbol = first_symbol(&engine);
            engine.submit(CasterCommand::PressSymbol {
                caster: PLAYER,
                symbol: symbol.clone(),
            });
            engine.step();

            let events: Vec<SpellEvent> = engine
                .take_events()
                .into_iter()
                .map(EventEnvelope::into_event)
                .collect();
            assert!(matches!(
                events[0],
                SpellEvent::InputRecognized {
                    knowledge: KnowledgeState::Hidden,
                    ..
                }
            ));
            assert_eq!(
                events[1].state_change(),
                Some((CastState::Idle, CastState::Channeling))
            );
            assert_eq!(events[2].outcome_kind(), Some(OutcomeKind::Discovery));
            assert_eq!(events.len(), 3);
            assert_eq!(
                engine.knowledge().get(PLAYER, symbol.as_str()),
                KnowledgeState::Seen
            );
            assert_eq!(engine.cast_state(PLAYER), CastState::Channeling);
        }
    }

    mod rejection_tests {
        use super::*;

        #[test]
        fn unknown_caster_is_rejected_without_state() {
            let mut engine = engine();
            let symbol = first_symbol(&engine);
            let stranger = CasterId::new(77);
            engine.submit(CasterCommand::PressSymbol {
                caster: stranger,
                symbol,
            });
            engine.submit(CasterCommand::Cancel { caster: stranger });
            engine.step();

            let reasons: Vec<_> = engine
                .take_events()
                .iter()
                .filter_map(|e| e.event().rejection())
                .collect();
            assert_eq!(
                reasons,
                vec![RejectReason::UnknownCaster, RejectReason::UnknownCaster]
            );
            assert!(engine.buffer(stranger).is_none());
        }

        #[test]
        fn invalid_symbol_is_rejected() {
            let mut engine = engine();
            engine.submit(CasterCommand::PressSymbol {
                caster: PLAYER,
                symbol: SymbolId::new("symbol_nowhere"),
            });
            engine.step();
            let events = engine.take_events();
            assert_eq!(events.len(), 1);
            assert_eq!(
                events[0].event().rejection(),
                Some(RejectReason::InvalidSymbol)
            );
            assert_eq!(engine.cast_state(PLAYER), CastState::Idle);
        }

        #[test]
        fn empty_slot_is_rejected() {
            let mut engine = engine();
            engine.submit(CasterCommand::PressSlot {
                caster: PLAYER,
                slot: 0,
            });
            engine.step();
            let events = engine.take_events();
            assert_eq!(events[0].event().rejection(), Some(RejectReason::EmptySlot));
        }

        #[test]
        fn bind_requires_registration_and_knowledge() {
            let mut engine = engine();
            let symbol = first_symbol(&engine);
            assert!(matches!(
                engine.bind_slot(CasterId::new(8), 0, symbol.clone()),
                Err(Error::UnknownCaster(_))
            ));
            assert!(matches!(
                engine.bind_slot(PLAYER, 0, symbol.clone()),
                Err(Error::Bind(_))
            ));
            engine
                .learn(PLAYER, &symbol, KnowledgeState::Known)
                .unwrap();
            assert_eq!(engine.bind_slot(PLAYER, 0, symbol.clone()).unwrap(), None);
            assert_eq!(
                engine.hotbar(PLAYER).and_then(|h| h.symbol_at(0)),
                Some(&symbol)
            );
        }
    }

    #[test]
    fn forget_resets_knowledge() {
        let mut engine = engine();
        let symbol = first_symbol(&engine);
        engine.learn(PLAYER, &symbol, KnowledgeState::Known).unwrap();
        assert_eq!(engine.forget(PLAYER, symbol.as_str()), KnowledgeState::Known);
        assert_eq!(
            engine.knowledge().get(PLAYER, symbol.as_str()),
            KnowledgeState::Hidden
        );
    }
}
