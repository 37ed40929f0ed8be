//! Test helpers for building engines and reading their events.

use crate::cast::CastState;
use crate::caster::{CasterId, CasterRoster};
use crate::command::CasterCommand;
use crate::config::{ComboConfig, ProfileConfig, SpellConfig};
use crate::engine::SpellEngine;
use crate::event::{EventEnvelope, RejectReason, SpellEvent};
use crate::knowledge::KnowledgeState;
use crate::resolver::OutcomeKind;
use crate::resources::{InMemoryResources, ResourceCost, ResourceKind};
use crate::symbol::{Concept, SymbolId};

/// Well-funded caster.
pub const PLAYER: CasterId = CasterId::new(1);

/// Caster with too little chakra for a firestorm.
pub const PAUPER: CasterId = CasterId::new(2);

/// Chakra cost of a firestorm.
pub const FIRESTORM_COST: f32 = 30.0;

// =============================================================================
// Setup
// =============================================================================

fn combo(concepts: &[Concept], spell: &str) -> ComboConfig {
    ComboConfig {
        concepts: concepts.to_vec(),
        spell: spell.to_string(),
    }
}

/// Config with three combos, one a prefix of another, and short timings.
///
/// Timings at 20 Hz: wind-up 2 ticks, recovery 4 ticks, penalty 10 ticks.
pub fn standard_config(seed: u64) -> SpellConfig {
    let mut config = SpellConfig::with_seed(seed);
    config.default_profile = ProfileConfig {
        wind_up: 0.1,
        recovery: 0.2,
        interrupt_penalty: 0.5,
        costs: ResourceCost::free(),
    };
    config.profiles.insert(
        "firestorm".to_string(),
        ProfileConfig {
            costs: ResourceCost::free().with(ResourceKind::Chakra, FIRESTORM_COST),
            ..config.default_profile.clone()
        },
    );
    config.combos = vec![
        combo(&[Concept::Flame, Concept::Gale], "firestorm"),
        combo(&[Concept::Stone, Concept::Ward], "rampart"),
        combo(&[Concept::Stone, Concept::Ward, Concept::Bloom], "living_wall"),
    ];
    config
}

/// Builds an engine with `PLAYER` and `PAUPER` registered and funded.
pub fn build_engine(config: SpellConfig) -> SpellEngine {
    let mut roster = CasterRoster::new();
    roster.set_player(PLAYER);
    roster.register(PAUPER);

    let mut resources = InMemoryResources::new();
    resources.set_full(PLAYER, ResourceKind::Chakra, 100.0);
    resources.set_full(PLAYER, ResourceKind::Stability, 50.0);
    resources.set_full(PAUPER, ResourceKind::Chakra, 10.0);

    SpellEngine::builder(config)
        .with_registry(Box::new(roster))
        .with_resources(Box::new(resources))
        .build()
        .expect("standard engine builds")
}

/// Standard engine for seed 12345.
pub fn standard_engine() -> SpellEngine {
    build_engine(standard_config(12345))
}

// =============================================================================
// Driving
// =============================================================================

/// First symbol mapped to `concept` in the engine's world.
pub fn symbol_for(engine: &SpellEngine, concept: Concept) -> SymbolId {
    engine
        .symbol_map()
        .by_concept(concept)
        .map(|d| d.id.clone())
        .expect("ten symbols cover every concept")
}

/// Queues a press of the symbol mapped to `concept`.
pub fn press(engine: &mut SpellEngine, caster: CasterId, concept: Concept) {
    let symbol = symbol_for(engine, concept);
    engine.submit(CasterCommand::PressSymbol { caster, symbol });
}

/// Makes every symbol of the world `Known` to `caster`.
pub fn learn_all(engine: &mut SpellEngine, caster: CasterId) {
    let ids: Vec<SymbolId> = engine.symbol_map().iter().map(|d| d.id.clone()).collect();
    for id in ids {
        engine
            .learn(caster, &id, KnowledgeState::Known)
            .expect("caster is registered");
    }
}

/// Steps `ticks` times and returns the drained events.
pub fn run_ticks(engine: &mut SpellEngine, ticks: u64) -> Vec<SpellEvent> {
    for _ in 0..ticks {
        engine.step();
    }
    engine
        .take_events()
        .into_iter()
        .map(EventEnvelope::into_event)
        .collect()
}

// =============================================================================
// Event Filters
// =============================================================================

/// Outcome kinds in event order.
pub fn outcomes(events: &[SpellEvent]) -> Vec<OutcomeKind> {
    events.iter().filter_map(SpellEvent::outcome_kind).collect()
}

/// Spell ids of combo outcomes in event order.
pub fn outcome_spells(events: &[SpellEvent]) -> Vec<Option<String>> {
    events
        .iter()
        .filter_map(|e| match e {
            SpellEvent::ComboOutcome { outcome, .. } => {
                Some(outcome.as_ref().map(|s| s.as_str().to_string()))
            }
            _ => None,
        })
        .collect()
}

/// State changes of one caster in event order.
pub fn transitions(events: &[SpellEvent], caster: CasterId) -> Vec<(CastState, CastState)> {
    events
        .iter()
        .filter(|e| e.caster() == caster)
        .filter_map(SpellEvent::state_change)
        .collect()
}

/// Rejection reasons in event order.
pub fn rejections(events: &[SpellEvent]) -> Vec<RejectReason> {
    events.iter().filter_map(SpellEvent::rejection).collect()
}
