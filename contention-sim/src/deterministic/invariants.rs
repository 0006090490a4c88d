//! Invariant checking framework for simulation validation.

use std::fmt;

use serde::Serialize;

use super::state::SimulationState;

/// Violation of a simulation invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Tick at which the violation was detected
    pub tick: u64,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at tick {}: {}",
            self.invariant, self.tick, self.description
        )
    }
}

/// Trait for checking simulation invariants.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for current state.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;

    /// Builds a violation of this invariant at the state's tick.
    fn violation(&self, state: &SimulationState, description: String) -> InvariantViolation {
        InvariantViolation {
            invariant: self.name().to_string(),
            description,
            tick: state.tick,
        }
    }
}

/// Ensures every live window stays within `[1, max_window]`.
pub struct WindowBoundsInvariant;

impl Invariant for WindowBoundsInvariant {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        if let Some(device) = state
            .devices
            .iter()
            .find(|d| d.window == 0 || d.window > state.max_window)
        {
            return Err(self.violation(
                state,
                format!(
                    "{} has window {}, allowed range is [1, {}]",
                    device.id, device.window, state.max_window
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "WindowBounds"
    }
}

/// Ensures the resource holds no requests once a tick has been arbitrated.
pub struct DrainedResourceInvariant;

impl Invariant for DrainedResourceInvariant {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        if state.pending_requests > 0 {
            return Err(self.violation(
                state,
                format!(
                    "{} requests left registered after arbitration",
                    state.pending_requests
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "DrainedResource"
    }
}

/// Ensures the live population stays below a ceiling.
pub struct PopulationLimitInvariant {
    max_population: usize,
}

impl PopulationLimitInvariant {
    /// Creates invariant allowing at most `max_population` live devices.
    pub fn new(max_population: usize) -> Self {
        Self { max_population }
    }
}

impl Invariant for PopulationLimitInvariant {
    fn check(&self, state: &SimulationState) -> Result<(), InvariantViolation> {
        if state.population() > self.max_population {
            return Err(self.violation(
                state,
                format!(
                    "{} live devices, maximum {} allowed",
                    state.population(),
                    self.max_population
                ),
            ));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "PopulationLimit"
    }
}
