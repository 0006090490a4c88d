//! Error types for simulation configuration and execution.

use thiserror::Error;

use crate::device::DeviceId;

/// Errors raised while validating a simulation configuration.
///
/// These are always reported at construction time so a misconfigured run
/// never starts.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Backoff strategy selector did not match any known strategy.
    #[error("Unknown backoff strategy '{name}'")]
    UnknownBackoffStrategy {
        /// The selector that was provided
        name: String,
    },

    /// Arrival process selector did not match any known distribution.
    #[error("Unknown arrival process '{name}'")]
    UnknownArrivalProcess {
        /// The selector that was provided
        name: String,
    },

    /// A numeric parameter was missing, malformed or out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: String,
        /// Why the value was rejected
        reason: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during a simulation run.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A device kept re-entering its backoff transition within one tick.
    ///
    /// Guards the device state machine, which settles within two loop
    /// iterations today, so this is not expected in a run.
    #[error("Backoff diverged for {device}: {iterations} transitions in a single tick")]
    BackoffDivergence {
        /// Device whose tick loop was cut short
        device: DeviceId,
        /// Number of transitions attempted before giving up
        iterations: usize,
    },

    /// An arrival draw was non-finite or exceeded the per-tick cap.
    #[error("Arrival process diverged: drew {drawn} devices, limit is {limit}")]
    ArrivalDivergence {
        /// The drawn value, saturated to `f64`
        drawn: f64,
        /// Configured per-tick arrival cap
        limit: u64,
    },

    /// Simulation ran longer than the configured tick limit.
    #[error("Simulation tick limit exceeded after {ticks} ticks")]
    TickLimitExceeded {
        /// Ticks executed before stopping
        ticks: u64,
    },

    /// Too many invariant violations occurred.
    #[error("Too many invariant violations: {count}")]
    TooManyInvariantViolations {
        /// Number of violations that occurred
        count: usize,
    },

    /// The resource was asked to arbitrate for a device that is not live.
    #[error("Unknown contender {device} registered with the resource")]
    UnknownContender {
        /// Device that could not be found
        device: DeviceId,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_converts_into_simulation_error() {
        let error: SimulationError = ConfigError::UnknownBackoffStrategy {
            name: "quadratic".to_string(),
        }
        .into();

        assert!(matches!(error, SimulationError::Config(_)));
        assert_eq!(
            error.to_string(),
            "Configuration error: Unknown backoff strategy 'quadratic'"
        );
    }

    #[test]
    fn test_divergence_messages_name_the_device() {
        let error = SimulationError::BackoffDivergence {
            device: DeviceId::new(7),
            iterations: 64,
        };

        assert!(error.to_string().contains("device7"));
    }
}
