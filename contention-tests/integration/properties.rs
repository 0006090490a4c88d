//! Property-based tests over arbitrary seeds and populations.

use std::collections::HashMap;

use contention_sim::{
    ArrivalSpec, BackoffStrategy, DeviceId, RunSummary, Simulation, SimulationConfig,
};
use proptest::prelude::*;

/// Strategy: one of the non-oscillating backoff strategies.
fn growing_backoff() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        (1..4u64).prop_map(|step| BackoffStrategy::Linear { step }),
        (2..4u64).prop_map(|factor| BackoffStrategy::Exponential { factor }),
        (1..4u32).prop_map(|exponent| BackoffStrategy::Polynomial { exponent }),
    ]
}

/// Strategy: any backoff strategy with a small parameter.
fn any_backoff() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        growing_backoff(),
        (1..4u32).prop_map(|exponent| BackoffStrategy::BackoffBackon { exponent }),
    ]
}

/// Strategy: a light arrival process that keeps runs short.
fn light_arrivals() -> impl Strategy<Value = ArrivalSpec> {
    prop_oneof![
        Just(ArrivalSpec::Constant { count: 0 }),
        (0.05..0.3f64).prop_map(|lambda| ArrivalSpec::Poisson { lambda }),
        (0.0..=0.3f64).prop_map(|probability| ArrivalSpec::Bernoulli { probability }),
    ]
}

fn config(
    seed: u64,
    devices: usize,
    backoff: BackoffStrategy,
    arrival: ArrivalSpec,
) -> SimulationConfig {
    SimulationConfig {
        deterministic_seed: Some(seed),
        initial_devices: devices,
        arrival,
        arrival_events: 30,
        backoff,
        max_ticks: Some(1_000_000),
        ..Default::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Windows never shrink and trial counts advance one transition at a time
    #[test]
    fn window_and_trials_are_monotonic(
        seed in any::<u64>(),
        devices in 1..15usize,
        backoff in growing_backoff(),
    ) {
        let mut sim =
            Simulation::new(config(seed, devices, backoff, ArrivalSpec::default())).unwrap();
        let mut last_seen: HashMap<DeviceId, (u64, u32)> = HashMap::new();

        while !sim.is_done() {
            sim.step().unwrap();
            for device in sim.active_devices() {
                prop_assert!(device.window() >= 1);
                if let Some(&(window, trials)) = last_seen.get(&device.id()) {
                    prop_assert!(device.window() >= window);
                    prop_assert!(device.trial_count() >= trials);
                    prop_assert!(device.trial_count() - trials <= 1);
                }
                last_seen.insert(device.id(), (device.window(), device.trial_count()));
            }
        }
    }

    // The resource never carries requests across ticks
    #[test]
    fn resource_is_drained_after_every_tick(
        seed in any::<u64>(),
        devices in 0..15usize,
        backoff in any_backoff(),
        arrival in light_arrivals(),
    ) {
        let mut sim = Simulation::new(config(seed, devices, backoff, arrival)).unwrap();

        while !sim.is_done() {
            let outcome = sim.step().unwrap();
            prop_assert_eq!(sim.resource().pending_requests(), 0);
            prop_assert_eq!(outcome.arbitration.winner().is_some(), outcome.attempts == 1);
        }
    }

    // Reported averages are recomputable from the device records
    #[test]
    fn averages_match_records(
        seed in any::<u64>(),
        devices in 0..15usize,
        backoff in any_backoff(),
        arrival in light_arrivals(),
    ) {
        let report = Simulation::new(config(seed, devices, backoff, arrival))
            .unwrap()
            .run()
            .unwrap();

        match &report.aggregate {
            RunSummary::NoDevicesProcessed => prop_assert!(report.records.is_empty()),
            RunSummary::Completed(stats) => {
                let count = report.records.len() as f64;
                let finish: f64 = report.records.iter().map(|r| r.finish_tick as f64).sum();
                let trials: f64 = report.records.iter().map(|r| f64::from(r.trial_count)).sum();

                prop_assert_eq!(stats.device_count, report.records.len());
                prop_assert!((stats.average_finish_time - finish / count).abs() < 1e-9);
                prop_assert!((stats.average_trials - trials / count).abs() < 1e-9);
            }
        }
        prop_assert_eq!(report.metrics.devices_created, report.records.len() as u64);
    }

    // A seed fully determines the run
    #[test]
    fn runs_are_deterministic(
        seed in any::<u64>(),
        devices in 1..10usize,
        backoff in any_backoff(),
        arrival in light_arrivals(),
    ) {
        let first = Simulation::new(config(seed, devices, backoff, arrival.clone()))
            .unwrap()
            .run()
            .unwrap();
        let second = Simulation::new(config(seed, devices, backoff, arrival))
            .unwrap()
            .run()
            .unwrap();

        prop_assert_eq!(first.records, second.records);
        prop_assert_eq!(first.finish_tick, second.finish_tick);
    }

    // Window growth stays inside the configured clamp
    #[test]
    fn next_window_respects_bounds(
        mut backoff in any_backoff(),
        window in 1..1_000_000u64,
        trial_count in 2..200u32,
        max_window in 1..(1u64 << 20),
    ) {
        let next = backoff.next_window(window, trial_count, max_window);
        prop_assert!(next >= 1);
        prop_assert!(next <= max_window);
    }
}
