//! Centralized configuration for contention simulations.
//!
//! All tunable parameters are plain values passed to the simulation
//! constructor; nothing is read from files or the environment.

use crate::arrival::ArrivalSpec;
use crate::backoff::BackoffStrategy;
use crate::errors::ConfigError;

/// Default upper clamp for the contention window.
pub const DEFAULT_MAX_WINDOW: u64 = 1 << 20;

/// Default cap on devices arriving in a single tick.
pub const DEFAULT_MAX_ARRIVALS_PER_TICK: u64 = 1_000_000;

/// Default hard limit on simulated ticks.
pub const DEFAULT_MAX_TICKS: u64 = 10_000_000;

/// Parameters of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Deterministic seed for reproducible runs (None = drawn from OS entropy)
    pub deterministic_seed: Option<u64>,
    /// Devices present before the first tick
    pub initial_devices: usize,
    /// Arrival process invoked on each tick while the budget lasts
    pub arrival: ArrivalSpec,
    /// Number of ticks on which the arrival process is invoked
    pub arrival_events: u64,
    /// Backoff strategy given to every device
    pub backoff: BackoffStrategy,
    /// Upper clamp for any device's contention window, at least 2
    pub max_window: u64,
    /// Largest arrival draw accepted before the run is declared divergent
    pub max_arrivals_per_tick: u64,
    /// Hard tick limit (None = unlimited)
    pub max_ticks: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            deterministic_seed: None,
            initial_devices: 10,
            arrival: ArrivalSpec::default(),
            arrival_events: 0,
            backoff: BackoffStrategy::default(),
            max_window: DEFAULT_MAX_WINDOW,
            max_arrivals_per_tick: DEFAULT_MAX_ARRIVALS_PER_TICK,
            max_ticks: Some(DEFAULT_MAX_TICKS),
        }
    }
}

impl SimulationConfig {
    /// Creates a configuration for deterministic testing.
    pub fn deterministic_testing() -> Self {
        Self {
            deterministic_seed: Some(42), // Fixed seed for reproducible tests
            initial_devices: 5,
            max_ticks: Some(100_000),
            ..Self::default()
        }
    }

    /// Creates a configuration with a steady Poisson load on the channel.
    pub fn saturated_channel() -> Self {
        Self {
            initial_devices: 20,
            arrival: ArrivalSpec::Poisson { lambda: 0.5 },
            arrival_events: 500,
            ..Self::default()
        }
    }

    /// Builds a configuration from selector names, as typed by a user.
    ///
    /// # Errors
    ///
    /// - `ConfigError::UnknownBackoffStrategy` - Strategy name is not recognised
    /// - `ConfigError::UnknownArrivalProcess` - Arrival selector is not recognised
    /// - `ConfigError::InvalidParameter` - A parameter is out of range
    pub fn from_selectors(
        strategy: &str,
        backoff_param: Option<u64>,
        arrival: &str,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            backoff: BackoffStrategy::from_name(strategy, backoff_param)?,
            arrival: arrival.parse()?,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter so misconfiguration surfaces before the run.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - A limit or distribution parameter is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A cap of one pins every window at one, like a non-growing strategy
        if self.max_window < 2 {
            return Err(ConfigError::invalid("max_window", "must be at least 2"));
        }
        if self.max_arrivals_per_tick == 0 {
            return Err(ConfigError::invalid(
                "max_arrivals_per_tick",
                "must be at least 1",
            ));
        }
        if self.max_ticks == Some(0) {
            return Err(ConfigError::invalid("max_ticks", "must be at least 1"));
        }
        self.backoff.validate()?;
        self.arrival.validate()
    }
}
