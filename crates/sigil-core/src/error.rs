//! Crate-level error type.
//!
//! Runtime conditions (unknown casters, invalid symbols, fizzles,
//! interrupts) are reported as events, never as errors. `Error` covers
//! startup and the few direct-call APIs that can be refused.

use thiserror::Error;

use crate::caster::CasterId;
use crate::config::ConfigError;
use crate::hotbar::BindError;
use crate::resolver::ComboError;
use crate::startup::StartupError;

/// Errors returned by the engine's fallible operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A registered combo is malformed.
    #[error(transparent)]
    Combo(#[from] ComboError),

    /// Subsystems could not be ordered or built.
    #[error(transparent)]
    Startup(#[from] StartupError),

    /// A hotbar binding was refused.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// The caster is not registered.
    #[error("caster {0} is not registered")]
    UnknownCaster(CasterId),
}

/// Result alias over [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
