//! Determinism and end-to-end tests for the spell engine.
//!
//! - `determinism.rs`: same seed and trace, same map and events
//! - `integration.rs`: presses through resolution to cast lifecycle
//! - `helpers.rs`: engine setup and event filters

mod helpers;
