//! Per-device backoff state machine.

use std::fmt;

use serde::Serialize;
use tracing::trace;

use crate::backoff::BackoffStrategy;
use crate::deterministic::DeterministicRng;
use crate::errors::SimulationError;

/// Upper bound on backoff transitions evaluated within a single tick.
///
/// Never reached by the current state machine. A transition always leaves
/// the device waiting to acquire, so [`Device::tick`] returns by its second
/// iteration. The bound only matters if that property is broken, and then
/// surfaces as `SimulationError::BackoffDivergence`.
pub const MAX_TICK_TRANSITIONS: usize = 64;

/// Device identifier, assigned sequentially in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// Creates DeviceId from its arrival sequence number.
    pub fn new(index: u64) -> Self {
        Self(index)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device{}", self.0)
    }
}

/// Terminal statistics for a device that won the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRecord {
    /// Device identifier
    pub id: DeviceId,
    /// Human-readable name, `device{id}`
    pub name: String,
    /// Tick at which the device joined the simulation
    pub arrival_tick: u64,
    /// Tick at which the device acquired the resource
    pub finish_tick: u64,
    /// Number of access attempts, including the successful one
    pub trial_count: u32,
    /// Ticks spent idle between attempts
    pub total_wait_time: u64,
    /// Contention window when the device finished
    pub final_window: u64,
}

impl DeviceRecord {
    /// Ticks between arrival and acquisition.
    pub fn latency(&self) -> u64 {
        self.finish_tick.saturating_sub(self.arrival_tick)
    }
}

/// A device contending for the shared resource.
///
/// The device samples a wait in `[0, window - 1]`, idles for that many ticks,
/// then attempts access. After a collision it sits out the remainder of its
/// window, grows the window with its backoff strategy and samples again.
#[derive(Debug, Clone)]
pub struct Device {
    id: DeviceId,
    arrival_tick: u64,
    strategy: BackoffStrategy,
    max_window: u64,
    window: u64,
    sampled_wait: u64,
    wait_counter: u64,
    trial_count: u32,
    waiting_to_acquire: bool,
    total_wait_time: u64,
    window_clamped: bool,
}

impl Device {
    /// Creates a device with a window of one and samples its first wait.
    pub fn new(
        id: DeviceId,
        arrival_tick: u64,
        strategy: BackoffStrategy,
        max_window: u64,
        rng: &mut DeterministicRng,
    ) -> Self {
        let mut device = Self {
            id,
            arrival_tick,
            strategy,
            max_window: max_window.max(1),
            window: 1,
            sampled_wait: 0,
            wait_counter: 0,
            trial_count: 1,
            waiting_to_acquire: true,
            total_wait_time: 0,
            window_clamped: false,
        };
        device.resample_wait(rng);
        device
    }

    /// Returns device identifier.
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Returns human-readable name, `device{id}`.
    pub fn name(&self) -> String {
        self.id.to_string()
    }

    /// Tick at which the device joined.
    pub fn arrival_tick(&self) -> u64 {
        self.arrival_tick
    }

    /// Strategy including any parameter drift from backoff-backon.
    pub fn strategy(&self) -> BackoffStrategy {
        self.strategy
    }

    /// Current contention window.
    pub fn window(&self) -> u64 {
        self.window
    }

    /// Ticks left before the next attempt or backoff.
    pub fn wait_counter(&self) -> u64 {
        self.wait_counter
    }

    /// Number of the current trial, starting at 1.
    pub fn trial_count(&self) -> u32 {
        self.trial_count
    }

    /// False while serving a collision penalty.
    pub fn is_waiting_to_acquire(&self) -> bool {
        self.waiting_to_acquire
    }

    /// Ticks spent idle so far.
    pub fn total_wait_time(&self) -> u64 {
        self.total_wait_time
    }

    /// Whether the last tick's backoff growth was cut at `max_window`.
    pub fn is_window_clamped(&self) -> bool {
        self.window_clamped
    }

    /// Advances the device by one tick and reports whether it attempts access.
    ///
    /// A device that has just served its post-collision penalty grows its
    /// window, samples a new wait and is re-evaluated within the same tick,
    /// so a zero-length wait turns straight into an attempt.
    ///
    /// # Errors
    ///
    /// - `SimulationError::BackoffDivergence` - More than `MAX_TICK_TRANSITIONS`
    ///   transitions were needed in one tick
    pub fn tick(&mut self, rng: &mut DeterministicRng) -> Result<bool, SimulationError> {
        self.window_clamped = false;

        for _ in 0..MAX_TICK_TRANSITIONS {
            if self.wait_counter > 0 {
                self.wait_counter -= 1;
                return Ok(false);
            }

            if self.waiting_to_acquire {
                return Ok(true);
            }

            self.waiting_to_acquire = true;
            self.trial_count = self.trial_count.saturating_add(1);
            let previous_window = self.window;
            let grown = self.strategy.grown_window(self.window, self.trial_count);
            self.window_clamped = grown > self.max_window;
            self.window = grown.clamp(1, self.max_window);
            self.resample_wait(rng);

            trace!(
                device = %self.id,
                trial = self.trial_count,
                previous_window,
                window = self.window,
                clamped = self.window_clamped,
                wait = self.sampled_wait,
                "Backing off"
            );
        }

        Err(SimulationError::BackoffDivergence {
            device: self.id,
            iterations: MAX_TICK_TRANSITIONS,
        })
    }

    /// Records the win and returns the device's terminal statistics.
    pub fn acquire_success(&self, timestamp: u64) -> DeviceRecord {
        trace!(
            device = %self.id,
            timestamp,
            trials = self.trial_count,
            "Acquired resource"
        );

        DeviceRecord {
            id: self.id,
            name: self.name(),
            arrival_tick: self.arrival_tick,
            finish_tick: timestamp,
            trial_count: self.trial_count,
            total_wait_time: self.total_wait_time,
            final_window: self.window,
        }
    }

    /// Applies the collision penalty.
    ///
    /// The device sits out the rest of its sampled window before the next
    /// zero-wait tick triggers backoff growth.
    pub fn acquire_fail(&mut self, timestamp: u64) {
        let penalty = self
            .window
            .saturating_sub(self.sampled_wait)
            .saturating_sub(1);

        self.wait_counter = penalty;
        self.total_wait_time = self.total_wait_time.saturating_add(penalty);
        self.waiting_to_acquire = false;

        trace!(device = %self.id, timestamp, penalty, "Collision");
    }

    fn resample_wait(&mut self, rng: &mut DeterministicRng) {
        self.sampled_wait = rng.random_below(self.window);
        self.wait_counter = self.sampled_wait;
        self.total_wait_time = self.total_wait_time.saturating_add(self.sampled_wait);
    }
}
