//! Contention Simulation Framework - Deterministic backoff experiments.

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
#![warn(clippy::too_many_lines)]
//!
//! Simulates many independent devices contending for a single shared
//! resource, each resolving collisions with its own backoff strategy, the
//! way CSMA/CA style random access protocols do.
//!
//! # Features
//!
//! - **Deterministic Execution**: Same seed always produces identical results
//! - **Tick-Based Simulation**: All devices advance in lockstep before arbitration
//! - **Pluggable Backoff**: Linear, exponential, polynomial and backoff-backon windows
//! - **Arrival Processes**: Constant, Gaussian, Poisson, Bernoulli and bursty arrivals
//! - **Invariant Checking**: Validate engine correctness during execution
//!
//! # Example
//!
//! ```rust,no_run
//! use contention_sim::{ArrivalSpec, BackoffStrategy, Simulation, SimulationConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SimulationConfig {
//!     deterministic_seed: Some(12345),
//!     initial_devices: 10,
//!     arrival: ArrivalSpec::Poisson { lambda: 0.2 },
//!     arrival_events: 100,
//!     backoff: BackoffStrategy::Exponential { factor: 2 },
//!     ..Default::default()
//! };
//!
//! let mut sim = Simulation::new(config)?;
//! let report = sim.run()?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Backoff**: Pure window growth rules
//! - **Device**: Per-device wait / attempt / penalty state machine
//! - **Resource**: Collects one tick's attempts and grants or collides
//! - **Arrival**: Per-tick population growth
//! - **Deterministic Engine**: Tick loop, seeded RNG, invariants and metrics

pub mod arrival;
pub mod backoff;
pub mod config;
pub mod deterministic;
pub mod device;
pub mod errors;
pub mod report;
pub mod resource;

pub use arrival::{
    ArrivalSource, ArrivalSpec, BernoulliArrivals, BurstyArrivals, ConstantArrivals,
    GaussianArrivals, PoissonArrivals, next_arrivals,
};
pub use backoff::BackoffStrategy;
pub use config::{
    DEFAULT_MAX_ARRIVALS_PER_TICK, DEFAULT_MAX_TICKS, DEFAULT_MAX_WINDOW, SimulationConfig,
};
pub use deterministic::{
    DeterministicRng, DeviceSnapshot, DrainedResourceInvariant, Invariant, InvariantViolation,
    PopulationLimitInvariant, Simulation, SimulationMetrics, SimulationPhase, SimulationState,
    TickClock, TickOutcome, WindowBoundsInvariant,
};
pub use device::{Device, DeviceId, DeviceRecord, MAX_TICK_TRANSITIONS};
pub use errors::{ConfigError, SimulationError};
pub use report::{AggregateStats, RunSummary, SimulationReport};
pub use resource::{Arbitration, Resource};
