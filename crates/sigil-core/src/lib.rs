//! # Sigil Core
//!
//! Resolution core of a procedural spell-casting mechanic.
//!
//! Every world generates its own mapping from abstract input symbols to
//! mechanical concepts and subtypes from a single seed. Casters press symbols,
//! the presses are buffered within a timing window, the buffer is matched
//! against registered combos, and a successful match drives a cancellable
//! casting lifecycle. Along the way each caster gradually discovers what the
//! symbols mean.
//!
//! ## Architecture
//!
//! Leaf-first:
//!
//! - **[`symbol`]**: seeded symbol → concept → subtype mapping
//! - **[`knowledge`]**: per-caster `Hidden → Seen → Known` familiarity
//! - **[`buffer`]**: bounded, debounced, time-ordered input history
//! - **[`resolver`]**: longest-match combo trie and resolution rules
//! - **[`cast`]**: casting state machine with resource accounting
//! - **[`engine`]**: fixed-step tick loop tying it together
//!
//! ## Determinism
//!
//! All randomness flows from the world seed through `ChaCha8Rng`, all time
//! from the simulation clock, and all iteration over casters and symbols is
//! in key order. The same seed and command trace always produce the same
//! events.
//!
//! ## Usage
//!
//! ```
//! use sigil_core::caster::{CasterId, CasterRoster};
//! use sigil_core::config::SpellConfig;
//! use sigil_core::engine::SpellEngine;
//!
//! let mut roster = CasterRoster::new();
//! roster.set_player(CasterId::new(1));
//!
//! let config = SpellConfig::from_toml_str("world_seed = 12345").unwrap();
//! let mut engine = SpellEngine::builder(config)
//!     .with_registry(Box::new(roster))
//!     .build()
//!     .unwrap();
//!
//! engine.step();
//! assert_eq!(engine.tick(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod arena;
pub mod buffer;
pub mod cast;
pub mod caster;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod hotbar;
pub mod knowledge;
pub mod resolver;
pub mod resources;
pub mod startup;
pub mod symbol;
pub mod time;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use caster::CasterId;
pub use config::SpellConfig;
pub use engine::{SpellEngine, SpellEngineBuilder};
pub use error::{Error, Result};
pub use event::{EventEnvelope, SpellEvent};
pub use symbol::{fingerprint, Concept, SymbolId, SymbolMap};
