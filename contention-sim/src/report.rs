//! Terminal statistics of a simulation run.

use serde::Serialize;

use crate::arrival::ArrivalSpec;
use crate::backoff::BackoffStrategy;
use crate::deterministic::SimulationMetrics;
use crate::device::DeviceRecord;

/// Averages over every device that acquired the resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    /// Devices that acquired the resource
    pub device_count: usize,
    /// Mean attempts per device
    pub average_trials: f64,
    /// Mean tick at which devices acquired the resource
    pub average_finish_time: f64,
    /// Mean idle ticks per device
    pub average_wait_time: f64,
    /// Mean ticks from arrival to acquisition
    pub average_latency: f64,
    /// Devices served per tick over the whole run
    pub throughput: f64,
}

/// Aggregate outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunSummary {
    /// The run ended without any device acquiring the resource.
    NoDevicesProcessed,
    /// At least one device acquired the resource.
    Completed(AggregateStats),
}

impl RunSummary {
    /// Aggregates finished device records.
    ///
    /// An empty record list yields `NoDevicesProcessed` rather than dividing by zero.
    pub fn from_records(records: &[DeviceRecord], finish_tick: u64) -> Self {
        if records.is_empty() {
            return RunSummary::NoDevicesProcessed;
        }

        let count = records.len() as f64;
        let mean = |value: fn(&DeviceRecord) -> f64| records.iter().map(value).sum::<f64>() / count;

        RunSummary::Completed(AggregateStats {
            device_count: records.len(),
            average_trials: mean(|r| f64::from(r.trial_count)),
            average_finish_time: mean(|r| r.finish_tick as f64),
            average_wait_time: mean(|r| r.total_wait_time as f64),
            average_latency: mean(|r| r.latency() as f64),
            throughput: if finish_tick == 0 {
                0.0
            } else {
                count / finish_tick as f64
            },
        })
    }

    /// Statistics when at least one device finished.
    pub fn stats(&self) -> Option<&AggregateStats> {
        match self {
            RunSummary::Completed(stats) => Some(stats),
            RunSummary::NoDevicesProcessed => None,
        }
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Seed used for reproduction
    pub seed: u64,
    /// Backoff strategy the devices were created with
    pub strategy: BackoffStrategy,
    /// Arrival process driving population growth
    pub arrival: ArrivalSpec,
    /// Tick at which the simulation terminated
    pub finish_tick: u64,
    /// Collected metrics
    pub metrics: SimulationMetrics,
    /// Finished devices in the order they acquired the resource
    pub records: Vec<DeviceRecord>,
    /// Averages over `records`
    pub aggregate: RunSummary,
}

impl SimulationReport {
    /// Generates human-readable summary.
    pub fn summary(&self) -> String {
        let mut summary = String::new();
        summary.push_str(&format!("Simulation Report (seed: {})\n", self.seed));
        summary.push_str(&format!("Strategy: {}\n", self.strategy));
        summary.push_str(&format!("Arrival process: {}\n", self.arrival));
        summary.push_str(&format!("Finish time: {}\n", self.finish_tick));

        match &self.aggregate {
            RunSummary::NoDevicesProcessed => summary.push_str("No devices processed\n"),
            RunSummary::Completed(stats) => {
                summary.push_str(&format!("Devices processed: {}\n", stats.device_count));
                summary.push_str(&format!(
                    "Average number of trials per device: {:.3}\n",
                    stats.average_trials
                ));
                summary.push_str(&format!(
                    "Average finish time per device: {:.3}\n",
                    stats.average_finish_time
                ));
                summary.push_str(&format!(
                    "Average wait time per device: {:.3}\n",
                    stats.average_wait_time
                ));
            }
        }

        summary.push('\n');
        summary.push_str(&self.metrics.summary());

        if !self.metrics.invariant_violations.is_empty() {
            summary.push_str("\nInvariant violations:\n");
            for violation in &self.metrics.invariant_violations {
                summary.push_str(&format!("  - {violation}\n"));
            }
        }

        summary
    }
}
