//! Recorded input traces.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use sigil_core::caster::{CasterId, CasterRoster};
use sigil_core::command::TimedCommand;
use sigil_core::resources::{InMemoryResources, ResourceKind};

/// One caster taking part in a trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceCaster {
    /// Caster id used by the commands.
    pub id: CasterId,
    /// Marks the player-controlled caster.
    #[serde(default)]
    pub player: bool,
    /// Full resource pools at the start of the trace.
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, f32>,
}

/// A recorded session: who took part and what they did, tick by tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trace {
    /// Fingerprint of the world the trace was captured in, if recorded.
    #[serde(default)]
    pub fingerprint: Option<u64>,
    /// Participating casters.
    pub casters: Vec<TraceCaster>,
    /// Commands in submission order.
    pub commands: Vec<TimedCommand>,
}

impl Trace {
    /// Reads a JSON trace file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("reading trace {}", path.display()))?;
        serde_json::from_str(&source).with_context(|| format!("parsing trace {}", path.display()))
    }

    /// Last tick with a scheduled command.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        self.commands.iter().map(|c| c.tick).max().unwrap_or(0)
    }

    /// Registry holding every caster of the trace.
    #[must_use]
    pub fn roster(&self) -> CasterRoster {
        let mut roster = CasterRoster::new();
        for caster in &self.casters {
            if caster.player {
                roster.set_player(caster.id);
            } else {
                roster.register(caster.id);
            }
        }
        roster
    }

    /// Resource pools filled to the trace's starting values.
    #[must_use]
    pub fn resources(&self) -> InMemoryResources {
        let mut pools = InMemoryResources::new();
        for caster in &self.casters {
            for (&kind, &amount) in &caster.resources {
                pools.set_full(caster.id, kind, amount);
            }
        }
        pools
    }

    /// Commands scheduled for `tick`, in submission order.
    pub fn at(&self, tick: u64) -> impl Iterator<Item = &TimedCommand> + '_ {
        self.commands.iter().filter(move |c| c.tick == tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sigil_core::caster::CasterRegistry;
    use sigil_core::command::CasterCommand;
    use sigil_core::resources::ResourcePool;

    const TRACE: &str = r#"{
        "casters": [
            { "id": 1, "player": true, "resources": { "chakra": 100.0 } },
            { "id": 2 }
        ],
        "commands": [
            { "tick": 0, "command": "press_symbol", "caster": 1, "symbol": "symbol_leaf" },
            { "tick": 3, "command": "cancel", "caster": 1 },
            { "tick": 3, "command": "damage", "caster": 2, "amount": 12.5 }
        ]
    }"#;

    #[test]
    fn parses_trace() {
        let trace: Trace = serde_json::from_str(TRACE).unwrap();
        assert_eq!(trace.casters.len(), 2);
        assert_eq!(trace.last_tick(), 3);
        assert_eq!(trace.fingerprint, None);
        assert_eq!(trace.at(3).count(), 2);
        assert!(matches!(
            trace.commands[0].command,
            CasterCommand::PressSymbol { .. }
        ));
    }

    #[test]
    fn builds_collaborators() {
        let trace: Trace = serde_json::from_str(TRACE).unwrap();
        let roster = trace.roster();
        assert_eq!(roster.player(), Some(CasterId::new(1)));
        assert!(roster.is_registered(CasterId::new(2)));

        let pools = trace.resources();
        assert_eq!(pools.current(CasterId::new(1), ResourceKind::Chakra), 100.0);
        assert_eq!(pools.current(CasterId::new(2), ResourceKind::Chakra), 0.0);
    }

    #[test]
    fn demo_session_replays() {
        use sigil_core::{SpellConfig, SpellEngine};

        let config = SpellConfig::from_toml_str(include_str!("../../../demos/world.toml")).unwrap();
        let trace: Trace = serde_json::from_str(include_str!("../../../demos/session.json")).unwrap();
        let mut engine = SpellEngine::builder(config)
            .with_registry(Box::new(trace.roster()))
            .with_resources(Box::new(trace.resources()))
            .build()
            .unwrap();

        for tick in 0..=trace.last_tick() {
            for timed in trace.at(tick) {
                engine.submit(timed.command.clone());
            }
            engine.step();
        }
        assert!(!engine.take_events().is_empty());
    }
}
