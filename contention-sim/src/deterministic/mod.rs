//! Deterministic simulation framework for contention experiments.
//!
//! This module provides the tick-driven engine together with the seeded
//! randomness, invariant checks and metrics it relies on.

mod clock;
mod invariants;
mod simulation;
mod state;

// Re-export core types for public API
pub use clock::{DeterministicRng, TickClock};
pub use invariants::{
    DrainedResourceInvariant, Invariant, InvariantViolation, PopulationLimitInvariant,
    WindowBoundsInvariant,
};
pub use simulation::{Simulation, SimulationPhase, TickOutcome};
pub use state::{DeviceSnapshot, SimulationMetrics, SimulationState};

#[cfg(test)]
mod tests;
