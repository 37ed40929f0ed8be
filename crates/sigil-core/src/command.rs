//! Commands submitted to the engine.
//!
//! Commands are queued and applied at the next tick boundary. Signals
//! (cancel, damage, acknowledgment) run before presses within a tick; see
//! [`crate::engine`] for the phase order.

use serde::{Deserialize, Serialize};

use crate::caster::CasterId;
use crate::symbol::SymbolId;

/// What a caster (or the game on its behalf) asks the core to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum CasterCommand {
    /// Press a symbol directly.
    PressSymbol {
        /// The caster.
        caster: CasterId,
        /// The symbol.
        symbol: SymbolId,
    },
    /// Press a hotbar slot.
    PressSlot {
        /// The caster.
        caster: CasterId,
        /// Slot index.
        slot: usize,
    },
    /// Explicit cancel of the active cast.
    Cancel {
        /// The caster.
        caster: CasterId,
    },
    /// Damage taken; interrupts above the configured threshold.
    Damage {
        /// The caster.
        caster: CasterId,
        /// Amount of damage.
        amount: f32,
    },
    /// The effect executor finished applying the cast.
    EffectApplied {
        /// The caster.
        caster: CasterId,
    },
    /// A resource the active cast depends on was drained externally.
    ResourceDepleted {
        /// The caster.
        caster: CasterId,
    },
}

impl CasterCommand {
    /// The caster the command targets.
    #[must_use]
    pub fn caster(&self) -> CasterId {
        match self {
            Self::PressSymbol { caster, .. }
            | Self::PressSlot { caster, .. }
            | Self::Cancel { caster }
            | Self::Damage { caster, .. }
            | Self::EffectApplied { caster }
            | Self::ResourceDepleted { caster } => *caster,
        }
    }

    /// Returns true for commands handled in the signal phase.
    #[must_use]
    pub fn is_signal(&self) -> bool {
        matches!(
            self,
            Self::Cancel { .. }
                | Self::Damage { .. }
                | Self::EffectApplied { .. }
                | Self::ResourceDepleted { .. }
        )
    }
}

/// A command scheduled for a specific tick, as stored in replay traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedCommand {
    /// Tick the command is submitted before.
    pub tick: u64,
    /// The command.
    #[serde(flatten)]
    pub command: CasterCommand,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_are_classified() {
        let caster = CasterId::new(1);
        assert!(CasterCommand::Cancel { caster }.is_signal());
        assert!(CasterCommand::Damage { caster, amount: 5.0 }.is_signal());
        assert!(CasterCommand::ResourceDepleted { caster }.is_signal());
        assert!(!CasterCommand::PressSlot { caster, slot: 0 }.is_signal());
    }

    #[test]
    fn timed_command_reads_flat_json() {
        let json = r#"{"tick": 4, "command": "press_symbol", "caster": 2, "symbol": "symbol_leaf"}"#;
        let timed: TimedCommand = serde_json::from_str(json).unwrap();
        assert_eq!(timed.tick, 4);
        assert_eq!(
            timed.command,
            CasterCommand::PressSymbol {
                caster: CasterId::new(2),
                symbol: SymbolId::new("symbol_leaf"),
            }
        );
        assert_eq!(timed.command.caster(), CasterId::new(2));
    }
}
