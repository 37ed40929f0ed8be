//! Startup ordering of engine subsystems.
//!
//! Each [`Subsystem`] declares what it needs to exist before it can be built.
//! [`DependencyGraph::resolve`] turns the declarations into a construction
//! order, failing on cycles or on dependencies nobody declared. Ties are
//! broken by `Subsystem` order so the result never varies between runs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

/// A part of the engine built at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Subsystem {
    /// Simulation clock.
    Clock,
    /// Seeded symbol map.
    SymbolMap,
    /// Knowledge tables.
    Knowledge,
    /// Combo trie and rules.
    Resolver,
    /// Per-caster buffers, state machines and hotbars.
    Casters,
    /// Event log.
    Events,
}

impl Subsystem {
    /// Every subsystem, in declaration order.
    pub const ALL: [Subsystem; 6] = [
        Subsystem::Clock,
        Subsystem::SymbolMap,
        Subsystem::Knowledge,
        Subsystem::Resolver,
        Subsystem::Casters,
        Subsystem::Events,
    ];

    /// What must be built first.
    #[must_use]
    pub const fn dependencies(self) -> &'static [Subsystem] {
        match self {
            Self::Clock | Self::SymbolMap | Self::Knowledge | Self::Events => &[],
            Self::Resolver => &[Self::SymbolMap],
            Self::Casters => &[Self::Clock, Self::Resolver, Self::Knowledge],
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The declarations cannot be ordered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartupError {
    /// Some subsystems depend on each other in a loop.
    #[error("dependency cycle among {0:?}")]
    Cycle(Vec<Subsystem>),

    /// A dependency was never declared.
    #[error("{subsystem} depends on undeclared {missing}")]
    MissingDependency {
        /// The dependent subsystem.
        subsystem: Subsystem,
        /// The undeclared dependency.
        missing: Subsystem,
    },

    /// A subsystem was needed but the order never built it.
    #[error("{0} was not built")]
    NotBuilt(Subsystem),
}

/// Declared subsystems and their dependencies.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: BTreeMap<Subsystem, BTreeSet<Subsystem>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph of every subsystem with its built-in dependencies.
    #[must_use]
    pub fn standard() -> Self {
        let mut graph = Self::new();
        for subsystem in Subsystem::ALL {
            graph.declare(subsystem, subsystem.dependencies());
        }
        graph
    }

    /// Declares a subsystem. Redeclaring adds to its dependencies.
    pub fn declare(&mut self, subsystem: Subsystem, depends_on: &[Subsystem]) {
        self.edges
            .entry(subsystem)
            .or_default()
            .extend(depends_on.iter().copied());
    }

    /// Construction order: every subsystem after all of its dependencies.
    pub fn resolve(&self) -> Result<Vec<Subsystem>, StartupError> {
        for (&subsystem, deps) in &self.edges {
            if let Some(&missing) = deps.iter().find(|d| !self.edges.contains_key(*d)) {
                return Err(StartupError::MissingDependency { subsystem, missing });
            }
        }

        let mut pending: BTreeMap<Subsystem, usize> =
            self.edges.iter().map(|(s, deps)| (*s, deps.len())).collect();
        let mut ready: BTreeSet<Subsystem> = pending
            .iter()
            .filter(|(_, n)| **n == 0)
            .map(|(s, _)| *s)
            .collect();
        let mut order = Vec::with_capacity(self.edges.len());

        while let Some(next) = ready.pop_first() {
            pending.remove(&next);
            order.push(next);
            for (dependent, deps) in &self.edges {
                if !deps.contains(&next) {
                    continue;
                }
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if pending.is_empty() {
            Ok(order)
        } else {
            Err(StartupError::Cycle(pending.into_keys().collect()))
        }
    }
}
