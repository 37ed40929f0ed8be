//! Simulation clock types.
//!
//! All timing in the casting core is measured on a monotonic simulation clock
//! in whole milliseconds. Wall-clock time never enters the core, so a given
//! `(seed, input trace)` pair replays identically.
//!
//! # Example
//!
//! ```
//! use sigil_core::time::{SimDuration, TickClock};
//!
//! let mut clock = TickClock::new(20);
//! assert_eq!(clock.step_duration(), SimDuration::from_millis(50));
//!
//! clock.advance();
//! clock.advance();
//! assert_eq!(clock.now().as_millis(), 100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;

// =============================================================================
// Time Points and Durations
// =============================================================================

/// A point on the simulation clock, in milliseconds since world start.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimTime(u64);

impl SimTime {
    /// The start of the simulation.
    pub const ZERO: Self = Self(0);

    /// Creates a time point from raw milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the time point `duration` earlier, clamped at zero.
    #[must_use]
    pub const fn saturating_sub(self, duration: SimDuration) -> Self {
        Self(self.0.saturating_sub(duration.0))
    }

    /// Returns how long ago `earlier` was, or zero if it lies in the future.
    #[must_use]
    pub const fn since(self, earlier: SimTime) -> SimDuration {
        SimDuration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<SimDuration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimDuration) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// A span of simulation time, in milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct SimDuration(u64);

impl SimDuration {
    /// A zero-length span.
    pub const ZERO: Self = Self(0);

    /// Creates a duration from raw milliseconds.
    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    /// Creates a duration from fractional seconds, rounded to the nearest
    /// millisecond. Negative and non-finite inputs map to zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * 1000.0).round() as u64)
    }

    /// Returns the raw millisecond value.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Returns the duration in fractional seconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1000.0
    }
}

impl fmt::Display for SimDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// =============================================================================
// Tick Clock
// =============================================================================

/// Fixed-step simulation clock.
///
/// The clock only moves when [`TickClock::advance`] is called, once per
/// simulation tick. `now()` is therefore constant for the whole of a tick,
/// and every input processed during that tick carries the same timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickClock {
    tick: u64,
    step: SimDuration,
}

impl TickClock {
    /// Creates a clock for the given tick rate in Hz.
    ///
    /// The step is `1000 / tick_rate_hz` milliseconds, never less than 1 ms.
    #[must_use]
    pub fn new(tick_rate_hz: u32) -> Self {
        let step = 1000 / u64::from(tick_rate_hz.max(1));
        Self::with_step(SimDuration::from_millis(step.max(1)))
    }

    /// Creates a clock with an explicit step duration.
    #[must_use]
    pub fn with_step(step: SimDuration) -> Self {
        Self {
            tick: 0,
            step: SimDuration::from_millis(step.as_millis().max(1)),
        }
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> SimTime {
        SimTime::from_millis(self.tick.saturating_mul(self.step.as_millis()))
    }

    /// Number of completed ticks.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Duration of one tick.
    #[must_use]
    pub fn step_duration(&self) -> SimDuration {
        self.step
    }

    /// Advances the clock by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(20)
    }
}
