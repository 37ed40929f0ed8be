//! Engine configuration loaded from TOML.
//!
//! Only `world_seed` is required; every other field has a default. Durations
//! are written in fractional seconds and converted to whole simulation
//! milliseconds.
//!
//! ```toml
//! world_seed = 12345
//! combo_window = 1.5
//!
//! [default_profile]
//! wind_up = 0.4
//!
//! [profiles.firestorm]
//! wind_up = 0.8
//! costs = { chakra = 25.0 }
//!
//! [[combos]]
//! concepts = ["Flame", "Gale"]
//! spell = "firestorm"
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cast::CastProfile;
use crate::resolver::{ComboDefinition, SpellId};
use crate::resources::ResourceCost;
use crate::symbol::Concept;
use crate::time::SimDuration;

/// A configuration that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The TOML is malformed or has wrong types.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field is out of range.
    #[error("invalid config field {field}: {reason}")]
    Invalid {
        /// Dotted field path.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

fn default_symbol_count() -> usize {
    10
}

fn default_buffer_capacity() -> usize {
    crate::buffer::DEFAULT_CAPACITY
}

fn default_combo_window() -> f64 {
    1.5
}

fn default_debounce_interval() -> f64 {
    0.1
}

fn default_tick_rate() -> u32 {
    20
}

fn default_interrupt_threshold() -> f32 {
    10.0
}

fn default_hotbar_slots() -> usize {
    crate::hotbar::DEFAULT_SLOTS
}

/// Timing and cost of one outcome, as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    /// Seconds from `CastStart` to `Casting`.
    pub wind_up: f64,
    /// Seconds from `Recovery` to `Idle`.
    pub recovery: f64,
    /// Seconds from `Interrupted` to `Idle`.
    pub interrupt_penalty: f64,
    /// Resources debited at commit.
    pub costs: ResourceCost,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            wind_up: 0.5,
            recovery: 0.5,
            interrupt_penalty: 1.0,
            costs: ResourceCost::free(),
        }
    }
}

impl ProfileConfig {
    /// Converts to the runtime profile.
    #[must_use]
    pub fn to_profile(&self) -> CastProfile {
        CastProfile {
            wind_up: SimDuration::from_secs_f64(self.wind_up),
            recovery: SimDuration::from_secs_f64(self.recovery),
            interrupt_penalty: SimDuration::from_secs_f64(self.interrupt_penalty),
            cost: self.costs.clone(),
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        for (field, value) in [
            ("wind_up", self.wind_up),
            ("recovery", self.recovery),
            ("interrupt_penalty", self.interrupt_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::invalid(
                    format!("{name}.{field}"),
                    format!("must be a non-negative number of seconds, got {value}"),
                ));
            }
        }
        for (kind, amount) in self.costs.iter() {
            if !amount.is_finite() || amount < 0.0 {
                return Err(ConfigError::invalid(
                    format!("{name}.costs.{kind}"),
                    format!("must be non-negative, got {amount}"),
                ));
            }
        }
        Ok(())
    }
}

/// One combo as written in the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComboConfig {
    /// Concept names in input order.
    pub concepts: Vec<Concept>,
    /// Spell fired on a match.
    pub spell: String,
}

/// Complete engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpellConfig {
    /// Seed of the world's symbol map.
    pub world_seed: u64,
    /// Symbols drawn from the pool.
    #[serde(default = "default_symbol_count")]
    pub symbol_count: usize,
    /// Per-caster buffer capacity.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    /// Seconds an unconsumed input may wait before fizzling.
    #[serde(default = "default_combo_window")]
    pub combo_window: f64,
    /// Seconds within which a repeated symbol is ignored.
    #[serde(default = "default_debounce_interval")]
    pub debounce_interval: f64,
    /// Simulation ticks per second.
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Damage strictly above this interrupts a cast.
    #[serde(default = "default_interrupt_threshold")]
    pub interrupt_damage_threshold: f32,
    /// Hotbar slots per caster.
    #[serde(default = "default_hotbar_slots")]
    pub hotbar_slots: usize,
    /// Profile for outcomes without their own entry.
    #[serde(default)]
    pub default_profile: ProfileConfig,
    /// Per-spell profiles, keyed by spell id.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    /// Registered combos, in registration order.
    #[serde(default)]
    pub combos: Vec<ComboConfig>,
}

impl SpellConfig {
    /// A config with every default and the given seed.
    #[must_use]
    pub fn with_seed(world_seed: u64) -> Self {
        Self {
            world_seed,
            symbol_count: default_symbol_count(),
            buffer_capacity: default_buffer_capacity(),
            combo_window: default_combo_window(),
            debounce_interval: default_debounce_interval(),
            tick_rate: default_tick_rate(),
            interrupt_damage_threshold: default_interrupt_threshold(),
            hotbar_slots: default_hotbar_slots(),
            default_profile: ProfileConfig::default(),
            profiles: BTreeMap::new(),
            combos: Vec::new(),
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks every field is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol_count == 0 {
            return Err(ConfigError::invalid("symbol_count", "must be at least 1"));
        }
        if self.buffer_capacity == 0 {
            return Err(ConfigError::invalid("buffer_capacity", "must be at least 1"));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::invalid("tick_rate", "must be at least 1 Hz"));
        }
        if !self.combo_window.is_finite() || self.combo_window <= 0.0 {
            return Err(ConfigError::invalid(
                "combo_window",
                format!("must be a positive number of seconds, got {}", self.combo_window),
            ));
        }
        if !self.debounce_interval.is_finite() || self.debounce_interval < 0.0 {
            return Err(ConfigError::invalid(
                "debounce_interval",
                format!(
                    "must be a non-negative number of seconds, got {}",
                    self.debounce_interval
                ),
            ));
        }
        if !self.interrupt_damage_threshold.is_finite() || self.interrupt_damage_threshold < 0.0 {
            return Err(ConfigError::invalid(
                "interrupt_damage_threshold",
                "must be non-negative",
            ));
        }
        self.default_profile.validate("default_profile")?;
        for (name, profile) in &self.profiles {
            profile.validate(&format!("profiles.{name}"))?;
        }
        Ok(())
    }

    /// Combo window as a simulation duration.
    #[must_use]
    pub fn combo_window(&self) -> SimDuration {
        SimDuration::from_secs_f64(self.combo_window)
    }

    /// Debounce interval as a simulation duration.
    #[must_use]
    pub fn debounce(&self) -> SimDuration {
        SimDuration::from_secs_f64(self.debounce_interval)
    }

    /// Runtime profile for a spell, falling back to the default profile.
    #[must_use]
    pub fn profile_for(&self, spell: &SpellId) -> CastProfile {
        self.profiles
            .get(spell.as_str())
            .unwrap_or(&self.default_profile)
            .to_profile()
    }

    /// Combo definitions in registration order.
    #[must_use]
    pub fn combo_definitions(&self) -> Vec<ComboDefinition> {
        self.combos
            .iter()
            .map(|c| ComboDefinition::new(c.concepts.clone(), c.spell.as_str()))
            .collect()
    }
}
