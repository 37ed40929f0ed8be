//! Bounded, time-ordered store of one caster's recent symbol inputs.
//!
//! # Invariants
//!
//! - The buffer never holds more than `capacity` entries after a push.
//! - Entry timestamps are non-decreasing in storage order; pushes that would
//!   break this are rejected.
//! - Consumed entries never survive a [`InputSequenceBuffer::mark_consumed`]
//!   call; the buffer compacts immediately.
//!
//! # Example
//!
//! ```
//! use sigil_core::buffer::{InputEvent, InputSequenceBuffer, PushOutcome};
//! use sigil_core::symbol::{Concept, SymbolId};
//! use sigil_core::time::{SimDuration, SimTime};
//!
//! let mut buffer = InputSequenceBuffer::new(10, SimDuration::from_millis(100));
//! let leaf = SymbolId::new("symbol_leaf");
//!
//! let first = InputEvent::new(leaf.clone(), Concept::Bloom, SimTime::from_millis(0));
//! assert_eq!(buffer.push(first), PushOutcome::Accepted);
//!
//! // Same symbol again within the debounce interval is dropped.
//! let bounce = InputEvent::new(leaf, Concept::Bloom, SimTime::from_millis(50));
//! assert_eq!(buffer.push(bounce), PushOutcome::Debounced);
//! assert_eq!(buffer.len(), 1);
//! ```

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::symbol::{Concept, SymbolId};
use crate::time::{SimDuration, SimTime};

/// Default maximum number of buffered inputs.
pub const DEFAULT_CAPACITY: usize = 10;

/// Default minimum spacing between repeated same-symbol inputs.
pub const DEFAULT_DEBOUNCE: SimDuration = SimDuration::from_millis(100);

/// One resolved symbol input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// The symbol pressed.
    pub symbol: SymbolId,
    /// Concept the symbol resolved to in this world.
    pub concept: Concept,
    /// Simulation time of the press.
    pub timestamp: SimTime,
    consumed: bool,
}

impl InputEvent {
    /// Creates an unconsumed input.
    #[must_use]
    pub fn new(symbol: SymbolId, concept: Concept, timestamp: SimTime) -> Self {
        Self {
            symbol,
            concept,
            timestamp,
            consumed: false,
        }
    }

    /// Returns true once a resolution has used this input.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

/// Result of [`InputSequenceBuffer::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Appended without eviction.
    Accepted,
    /// Appended; the returned entry was evicted to stay within capacity.
    AcceptedWithEviction(InputEvent),
    /// Same symbol already buffered within the debounce interval.
    Debounced,
    /// Timestamp earlier than the newest buffered entry.
    OutOfOrder,
}

impl PushOutcome {
    /// Returns true if the input entered the buffer.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted | Self::AcceptedWithEviction(_))
    }
}

/// Bounded input history for a single caster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSequenceBuffer {
    entries: VecDeque<InputEvent>,
    capacity: usize,
    debounce: SimDuration,
}

impl InputSequenceBuffer {
    /// Creates an empty buffer. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize, debounce: SimDuration) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            debounce,
        }
    }

    /// Appends an input unless it is debounced or out of order.
    ///
    /// When the append pushes the size past capacity, the oldest unconsumed
    /// entry is evicted, or the oldest entry overall if all are consumed.
    pub fn push(&mut self, event: InputEvent) -> PushOutcome {
        if let Some(newest) = self.entries.back() {
            if event.timestamp < newest.timestamp {
                warn!(
                    symbol = %event.symbol,
                    at = %event.timestamp,
                    newest = %newest.timestamp,
                    "rejecting out-of-order input"
                );
                return PushOutcome::OutOfOrder;
            }
        }

        let bounced = self.entries.iter().any(|e| {
            !e.consumed
                && e.symbol == event.symbol
                && event.timestamp.since(e.timestamp) < self.debounce
        });
        if bounced {
            trace!(symbol = %event.symbol, at = %event.timestamp, "debounced input");
            return PushOutcome::Debounced;
        }

        self.entries.push_back(event);
        if self.entries.len() <= self.capacity {
            return PushOutcome::Accepted;
        }

        let victim = self
            .entries
            .iter()
            .position(|e| !e.consumed)
            .unwrap_or(0);
        match self.entries.remove(victim) {
            Some(evicted) => {
                debug!(symbol = %evicted.symbol, "buffer full, evicted oldest input");
                PushOutcome::AcceptedWithEviction(evicted)
            }
            None => PushOutcome::Accepted,
        }
    }

    /// Unconsumed inputs with `timestamp >= window_start`, oldest first.
    #[must_use]
    pub fn recent_unconsumed(&self, window_start: SimTime) -> Vec<InputEvent> {
        let mut recent: Vec<InputEvent> = self
            .entries
            .iter()
            .filter(|e| !e.consumed && e.timestamp >= window_start)
            .cloned()
            .collect();
        recent.sort_by_key(|e| e.timestamp);
        recent
    }

    /// Every unconsumed input, oldest first.
    #[must_use]
    pub fn unconsumed(&self) -> Vec<InputEvent> {
        self.recent_unconsumed(SimTime::ZERO)
    }

    /// The oldest unconsumed input, if any.
    #[must_use]
    pub fn oldest_unconsumed(&self) -> Option<&InputEvent> {
        self.entries
            .iter()
            .filter(|e| !e.consumed)
            .min_by_key(|e| e.timestamp)
    }

    /// Flags entries equal to any of `events` as consumed, then drops every
    /// consumed entry.
    ///
    /// Each element of `events` consumes at most one buffered entry.
    pub fn mark_consumed(&mut self, events: &[InputEvent]) {
        for target in events {
            let found = self
                .entries
                .iter_mut()
                .find(|e| !e.consumed && *e == target);
            if let Some(entry) = found {
                entry.consumed = true;
            }
        }
        self.entries.retain(|e| !e.consumed);
    }

    /// Empties the buffer.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of buffered entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates buffered entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> + '_ {
        self.entries.iter()
    }
}

impl Default for InputSequenceBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_DEBOUNCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn input(symbol: &str, ms: u64) -> InputEvent {
        InputEvent::new(SymbolId::new(symbol), Concept::Flame, SimTime::from_millis(ms))
    }

    mod push_tests {
        use super::*;

        #[test]
        fn debounce_applies_only_to_same_symbol() {
            let mut buffer = InputSequenceBuffer::default();
            assert!(buffer.push(input("a", 0)).is_accepted());
            assert!(buffer.push(input("b", 10)).is_accepted());
            assert_eq!(buffer.push(input("a", 99)), PushOutcome::Debounced);
            assert_eq!(buffer.len(), 2);
        }

        #[test]
        fn debounce_boundary_is_exclusive() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 0));
            assert_eq!(buffer.push(input("a", 100)), PushOutcome::Accepted);
        }

        #[test]
        fn out_of_order_is_rejected() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 500));
            assert_eq!(buffer.push(input("b", 400)), PushOutcome::OutOfOrder);
            assert_eq!(buffer.len(), 1);
        }

        #[test]
        fn equal_timestamps_are_in_order() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 500));
            assert!(buffer.push(input("b", 500)).is_accepted());
        }

        #[test]
        fn overflow_evicts_oldest_unconsumed() {
            let mut buffer = InputSequenceBuffer::new(3, DEFAULT_DEBOUNCE);
            buffer.push(input("a", 0));
            buffer.push(input("b", 10));
            buffer.push(input("c", 20));
            let outcome = buffer.push(input("d", 30));
            assert_eq!(outcome, PushOutcome::AcceptedWithEviction(input("a", 0)));
            let symbols: Vec<_> = buffer.iter().map(|e| e.symbol.as_str()).collect();
            assert_eq!(symbols, vec!["b", "c", "d"]);
        }

        #[test]
        fn zero_capacity_is_raised_to_one() {
            let mut buffer = InputSequenceBuffer::new(0, DEFAULT_DEBOUNCE);
            buffer.push(input("a", 0));
            buffer.push(input("b", 10));
            assert_eq!(buffer.len(), 1);
            assert_eq!(buffer.capacity(), 1);
        }
    }

    mod query_tests {
        use super::*;

        #[test]
        fn recent_unconsumed_filters_by_window() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 0));
            buffer.push(input("b", 1000));
            buffer.push(input("c", 2000));
            let recent = buffer.recent_unconsumed(SimTime::from_millis(1000));
            let symbols: Vec<_> = recent.iter().map(|e| e.symbol.as_str()).collect();
            assert_eq!(symbols, vec!["b", "c"]);
        }

        #[test]
        fn oldest_unconsumed_is_first_entry() {
            let mut buffer = InputSequenceBuffer::default();
            assert!(buffer.oldest_unconsumed().is_none());
            buffer.push(input("a", 40));
            buffer.push(input("b", 90));
            assert_eq!(buffer.oldest_unconsumed(), Some(&input("a", 40)));
        }
    }

    mod consume_tests {
        use super::*;

        #[test]
        fn mark_consumed_compacts() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 0));
            buffer.push(input("b", 10));
            buffer.push(input("c", 20));
            buffer.mark_consumed(&[input("a", 0), input("c", 20)]);
            let symbols: Vec<_> = buffer.iter().map(|e| e.symbol.as_str()).collect();
            assert_eq!(symbols, vec!["b"]);
        }

        #[test]
        fn mark_consumed_ignores_unknown_events() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 0));
            buffer.mark_consumed(&[input("a", 5)]);
            assert_eq!(buffer.len(), 1);
        }

        #[test]
        fn each_target_consumes_one_entry() {
            let mut buffer = InputSequenceBuffer::new(10, SimDuration::ZERO);
            buffer.push(input("a", 0));
            buffer.push(input("a", 0));
            buffer.mark_consumed(&[input("a", 0)]);
            assert_eq!(buffer.len(), 1);
        }

        #[test]
        fn clear_empties() {
            let mut buffer = InputSequenceBuffer::default();
            buffer.push(input("a", 0));
            buffer.clear();
            assert!(buffer.is_empty());
        }
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            capacity in 1..12usize,
            presses in proptest::collection::vec((0..6usize, 0..200u64), 1..80)
        ) {
            let symbols = ["a", "b", "c", "d", "e", "f"];
            let mut buffer = InputSequenceBuffer::new(capacity, DEFAULT_DEBOUNCE);
            let mut now = 0;
            for (symbol, gap) in presses {
                now += gap;
                buffer.push(input(symbols[symbol], now));
                prop_assert!(buffer.len() <= capacity);
            }
        }

        #[test]
        fn prop_recent_is_sorted(
            presses in proptest::collection::vec((0..6usize, 0..200u64), 1..40),
            window in 0..4000u64
        ) {
            let symbols = ["a", "b", "c", "d", "e", "f"];
            let mut buffer = InputSequenceBuffer::default();
            let mut now = 0;
            for (symbol, gap) in presses {
                now += gap;
                buffer.push(input(symbols[symbol], now));
            }
            let recent = buffer.recent_unconsumed(SimTime::from_millis(window));
            prop_assert!(recent.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
            prop_assert!(recent.iter().all(|e| e.timestamp.as_millis() >= window));
        }
    }
}
