//! Simulation state snapshots and metrics collection.

use serde::Serialize;

use crate::InvariantViolation;
use crate::device::{Device, DeviceId};
use crate::resource::Arbitration;

/// Read-only view of one live device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSnapshot {
    /// Device identifier
    pub id: DeviceId,
    /// Current contention window
    pub window: u64,
    /// Ticks left before the next attempt
    pub wait_counter: u64,
    /// Transitions taken so far
    pub trial_count: u32,
    /// Whether the device attempts on its next eligible tick
    pub waiting_to_acquire: bool,
}

impl From<&Device> for DeviceSnapshot {
    fn from(device: &Device) -> Self {
        Self {
            id: device.id(),
            window: device.window(),
            wait_counter: device.wait_counter(),
            trial_count: device.trial_count(),
            waiting_to_acquire: device.is_waiting_to_acquire(),
        }
    }
}

/// State of the simulation at the end of a tick.
#[derive(Debug, Clone, Default)]
pub struct SimulationState {
    /// Ticks completed so far
    pub tick: u64,
    /// Live devices in arrival order
    pub devices: Vec<DeviceSnapshot>,
    /// Requests still registered with the resource
    pub pending_requests: usize,
    /// Devices that have acquired the resource
    pub finished_devices: usize,
    /// Configured window clamp
    pub max_window: u64,
}

impl SimulationState {
    /// Number of live devices.
    pub fn population(&self) -> usize {
        self.devices.len()
    }
}

/// Metrics collected during simulation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationMetrics {
    /// Ticks executed
    pub ticks: u64,
    /// Ticks on which nobody attempted access
    pub idle_ticks: u64,
    /// Ticks on which two or more devices collided
    pub collision_ticks: u64,
    /// Ticks on which exactly one device acquired the resource
    pub successful_ticks: u64,
    /// Attempts that ended in a collision
    pub collided_attempts: u64,
    /// Devices created, including the initial population
    pub devices_created: u64,
    /// Largest live population observed
    pub peak_population: usize,
    /// Largest contention window observed on any device
    pub largest_window: u64,
    /// Window growths cut short by the configured cap
    pub clamped_windows: u64,
    /// Invariant violations detected
    pub invariant_violations: Vec<InvariantViolation>,
}

impl SimulationMetrics {
    /// Creates new metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome of one arbitration round.
    pub fn record_arbitration(&mut self, arbitration: &Arbitration) {
        self.ticks += 1;
        match arbitration {
            Arbitration::Idle => self.idle_ticks += 1,
            Arbitration::Granted(_) => self.successful_ticks += 1,
            Arbitration::Collision { contenders } => {
                self.collision_ticks += 1;
                self.collided_attempts += contenders.len() as u64;
            }
        }
    }

    /// Records newly created devices.
    pub fn record_arrivals(&mut self, count: u64) {
        self.devices_created = self.devices_created.saturating_add(count);
    }

    /// Updates peak population.
    pub fn update_peak_population(&mut self, population: usize) {
        self.peak_population = self.peak_population.max(population);
    }

    /// Updates largest window seen.
    pub fn observe_window(&mut self, window: u64) {
        self.largest_window = self.largest_window.max(window);
    }

    /// Records a window growth that hit the cap.
    pub fn record_clamped_window(&mut self) {
        self.clamped_windows += 1;
    }

    /// Records an invariant violation.
    pub fn record_invariant_violation(&mut self, violation: InvariantViolation) {
        self.invariant_violations.push(violation);
    }

    /// Fraction of ticks on which the resource was successfully acquired.
    pub fn utilization(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.successful_ticks as f64 / self.ticks as f64
    }

    /// Fraction of ticks lost to collisions.
    pub fn collision_rate(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.collision_ticks as f64 / self.ticks as f64
    }

    /// Generates summary statistics.
    pub fn summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str(&format!("Ticks: {}\n", self.ticks));
        summary.push_str(&format!(
            "Successful / collision / idle ticks: {} / {} / {}\n",
            self.successful_ticks, self.collision_ticks, self.idle_ticks
        ));
        summary.push_str(&format!("Utilization: {:.3}\n", self.utilization()));
        summary.push_str(&format!("Peak population: {}\n", self.peak_population));
        summary.push_str(&format!(
            "Largest window: {} (clamped {} times)\n",
            self.largest_window, self.clamped_windows
        ));
        summary.push_str(&format!(
            "Invariant violations: {}\n",
            self.invariant_violations.len()
        ));

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceRecord;

    fn record(id: u64) -> DeviceRecord {
        DeviceRecord {
            id: DeviceId::new(id),
            name: DeviceId::new(id).to_string(),
            arrival_tick: 0,
            finish_tick: 3,
            trial_count: 1,
            total_wait_time: 0,
            final_window: 1,
        }
    }

    #[test]
    fn test_metrics_arbitration_recording() {
        let mut metrics = SimulationMetrics::new();

        metrics.record_arbitration(&Arbitration::Idle);
        metrics.record_arbitration(&Arbitration::Collision {
            contenders: vec![DeviceId::new(0), DeviceId::new(1), DeviceId::new(2)],
        });
        metrics.record_arbitration(&Arbitration::Granted(record(1)));
        metrics.record_arbitration(&Arbitration::Granted(record(2)));

        assert_eq!(metrics.ticks, 4);
        assert_eq!(metrics.idle_ticks, 1);
        assert_eq!(metrics.collision_ticks, 1);
        assert_eq!(metrics.collided_attempts, 3);
        assert_eq!(metrics.successful_ticks, 2);
        assert_eq!(metrics.utilization(), 0.5);
        assert_eq!(metrics.collision_rate(), 0.25);
    }

    #[test]
    fn test_rates_are_zero_before_any_tick() {
        let metrics = SimulationMetrics::new();
        assert_eq!(metrics.utilization(), 0.0);
        assert_eq!(metrics.collision_rate(), 0.0);
    }

    #[test]
    fn test_peaks_only_grow() {
        let mut metrics = SimulationMetrics::new();

        metrics.update_peak_population(5);
        metrics.update_peak_population(3);
        metrics.observe_window(16);
        metrics.observe_window(2);

        assert_eq!(metrics.peak_population, 5);
        assert_eq!(metrics.largest_window, 16);
    }
}
