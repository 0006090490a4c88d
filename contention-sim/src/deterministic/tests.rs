//! Tests for the tick-driven simulation engine.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::deterministic::{
    DrainedResourceInvariant, PopulationLimitInvariant, Simulation, WindowBoundsInvariant,
};
use crate::{
    ArrivalSpec, Arbitration, BackoffStrategy, ConfigError, DeviceId, RunSummary,
    SimulationConfig, SimulationError,
};

fn fixed_population(devices: usize, backoff: BackoffStrategy, seed: u64) -> SimulationConfig {
    SimulationConfig {
        deterministic_seed: Some(seed),
        initial_devices: devices,
        backoff,
        ..Default::default()
    }
}

#[test]
fn test_single_device_wins_first_attempt() {
    let config = fixed_population(1, BackoffStrategy::default(), 1);
    let mut sim = Simulation::new(config).unwrap();

    let outcome = sim.step().unwrap();
    match outcome.arbitration {
        Arbitration::Granted(record) => {
            assert_eq!(record.id, DeviceId::new(0));
            assert_eq!(record.finish_tick, 0);
            assert_eq!(record.trial_count, 1);
        }
        other => panic!("Expected grant on tick 0, got {other:?}"),
    }

    assert!(sim.is_done());
    let report = sim.run().unwrap();
    assert_eq!(report.finish_tick, 1);
    assert_eq!(report.records.len(), 1);
}

#[test]
fn test_two_devices_collide_then_back_off() {
    let config = fixed_population(2, BackoffStrategy::Linear { step: 1 }, 2024);
    let mut sim = Simulation::new(config).unwrap();

    // Fresh devices have a window of one, so both attempt on tick 0.
    let first = sim.step().unwrap();
    assert_eq!(first.attempts, 2);
    assert!(first.arbitration.is_collision());
    for id in [DeviceId::new(0), DeviceId::new(1)] {
        let device = sim.device(id).unwrap();
        assert_eq!(device.window(), 1);
        assert!(!device.is_waiting_to_acquire());
    }

    // Zero penalty: both grow their window to two on tick 1.
    sim.step().unwrap();
    for id in [DeviceId::new(0), DeviceId::new(1)] {
        let window = sim
            .device(id)
            .map(|d| d.window())
            .or_else(|| {
                sim.finished()
                    .iter()
                    .find(|r| r.id == id)
                    .map(|r| r.final_window)
            })
            .unwrap();
        assert_eq!(window, 2);
    }

    let report = sim.run().unwrap();
    assert_eq!(report.records.len(), 2);
    assert_ne!(report.records[0].finish_tick, report.records[1].finish_tick);
    assert!(report.records.iter().all(|r| r.finish_tick > 0));
    assert!(report.records.iter().any(|r| r.trial_count > 1));
}

#[test]
fn test_simulation_reproducibility() {
    let config = SimulationConfig {
        deterministic_seed: Some(12345),
        initial_devices: 8,
        arrival: ArrivalSpec::Poisson { lambda: 0.3 },
        arrival_events: 200,
        backoff: BackoffStrategy::Exponential { factor: 2 },
        ..Default::default()
    };

    let report1 = Simulation::new(config.clone()).unwrap().run().unwrap();
    let report2 = Simulation::new(config).unwrap().run().unwrap();

    let finish_ticks = |records: &[crate::DeviceRecord]| -> Vec<u64> {
        records.iter().map(|r| r.finish_tick).collect()
    };
    assert_eq!(finish_ticks(&report1.records), finish_ticks(&report2.records));
    assert_eq!(report1.aggregate, report2.aggregate);
    assert_eq!(report1.finish_tick, report2.finish_tick);
    assert_eq!(report1.seed, report2.seed);
}

#[test]
fn test_different_seeds_diverge() {
    let run = |seed| {
        Simulation::new(fixed_population(30, BackoffStrategy::default(), seed))
            .unwrap()
            .run()
            .unwrap()
    };

    let report1 = run(1);
    let report2 = run(2);
    assert_ne!(report1.records, report2.records);
}

#[test]
fn test_winner_is_removed_in_same_tick() {
    let config = SimulationConfig {
        deterministic_seed: Some(77),
        initial_devices: 12,
        arrival: ArrivalSpec::Bernoulli { probability: 0.3 },
        arrival_events: 40,
        ..Default::default()
    };
    let mut sim = Simulation::new(config).unwrap();

    while !sim.is_done() {
        let outcome = sim.step().unwrap();
        assert_eq!(sim.resource().pending_requests(), 0);

        if let Arbitration::Granted(record) = &outcome.arbitration {
            assert!(sim.device(record.id).is_none());
            assert_eq!(sim.finished().last(), Some(record));
            assert_eq!(record.finish_tick, outcome.tick);
        }
    }

    let unique: HashSet<DeviceId> = sim.finished().iter().map(|r| r.id).collect();
    assert_eq!(unique.len(), sim.finished().len());
    assert_eq!(sim.metrics().devices_created, sim.finished().len() as u64);
}

#[test]
fn test_window_and_trial_monotonicity() {
    for backoff in [
        BackoffStrategy::Linear { step: 1 },
        BackoffStrategy::Exponential { factor: 2 },
        BackoffStrategy::Polynomial { exponent: 2 },
    ] {
        let mut sim = Simulation::new(fixed_population(25, backoff, 5)).unwrap();
        let mut last_seen: HashMap<DeviceId, (u64, u32)> = HashMap::new();

        for device in sim.active_devices() {
            assert_eq!(device.trial_count(), 1);
            last_seen.insert(device.id(), (device.window(), device.trial_count()));
        }

        while !sim.is_done() {
            sim.step().unwrap();
            for device in sim.active_devices() {
                let (window, trials) = last_seen[&device.id()];
                assert!(device.window() >= window, "{backoff} window shrank");
                assert!(
                    device.trial_count() == trials || device.trial_count() == trials + 1,
                    "{backoff} trial count jumped"
                );
                last_seen.insert(device.id(), (device.window(), device.trial_count()));
            }
        }
    }
}

#[test]
fn test_backoff_backon_population_drains() {
    let config = fixed_population(30, BackoffStrategy::BackoffBackon { exponent: 1 }, 31);
    let report = Simulation::new(config).unwrap().run().unwrap();

    assert_eq!(report.records.len(), 30);
}

#[test]
fn test_average_finish_time_matches_records() {
    let config = SimulationConfig {
        deterministic_seed: Some(4),
        initial_devices: 15,
        arrival: ArrivalSpec::Gaussian {
            mean: 1.0,
            std_dev: 1.0,
        },
        arrival_events: 30,
        ..Default::default()
    };
    let report = Simulation::new(config).unwrap().run().unwrap();

    let stats = match &report.aggregate {
        RunSummary::Completed(stats) => stats,
        RunSummary::NoDevicesProcessed => panic!("Expected finished devices"),
    };
    let expected = report.records.iter().map(|r| r.finish_tick as f64).sum::<f64>()
        / report.records.len() as f64;

    assert_eq!(stats.device_count, report.records.len());
    assert!((stats.average_finish_time - expected).abs() < 1e-9);
}

#[test]
fn test_bernoulli_arrivals_keep_running_through_empty_population() {
    let config = SimulationConfig {
        deterministic_seed: Some(8),
        initial_devices: 0,
        arrival: ArrivalSpec::Bernoulli { probability: 0.1 },
        arrival_events: 50,
        ..Default::default()
    };
    let mut sim = Simulation::new(config).unwrap();

    let report = sim.run().unwrap();
    assert!(report.finish_tick >= 50);
    assert_eq!(report.metrics.devices_created, report.records.len() as u64);
}

#[test]
fn test_bursty_arrivals_diverge_past_cap() {
    let config = SimulationConfig {
        deterministic_seed: Some(3),
        initial_devices: 0,
        arrival: ArrivalSpec::Bursty,
        arrival_events: 1000,
        max_arrivals_per_tick: 1,
        ..Default::default()
    };

    let result = Simulation::new(config).unwrap().run();
    assert!(matches!(
        result,
        Err(SimulationError::ArrivalDivergence { limit: 1, .. })
    ));
}

#[test]
fn test_invariants_hold_under_load() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(21),
        ..SimulationConfig::saturated_channel()
    })
    .unwrap();
    sim.add_invariant(Arc::new(WindowBoundsInvariant));
    sim.add_invariant(Arc::new(DrainedResourceInvariant));
    sim.add_invariant(Arc::new(PopulationLimitInvariant::new(10_000)));

    let report = sim.run().unwrap();
    assert!(report.metrics.invariant_violations.is_empty());
}

#[test]
fn test_window_clamp_is_respected() {
    let config = SimulationConfig {
        max_window: 8,
        ..fixed_population(4, BackoffStrategy::Exponential { factor: 3 }, 6)
    };
    let mut sim = Simulation::new(config).unwrap();
    sim.add_invariant(Arc::new(WindowBoundsInvariant));

    let report = sim.run().unwrap();
    assert!(report.metrics.largest_window <= 8);
    assert_eq!(report.records.len(), 4);
    assert!(report.metrics.invariant_violations.is_empty());
}

#[test]
fn test_growth_up_to_the_cap_is_not_reported_as_clamped() {
    let config = SimulationConfig {
        max_window: 2,
        ..fixed_population(2, BackoffStrategy::Exponential { factor: 2 }, 3)
    };
    let mut sim = Simulation::new(config).unwrap();

    // Tick 0 collides, tick 1 grows both windows from 1 to exactly 2
    sim.step().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.metrics().largest_window, 2);
    assert_eq!(sim.metrics().clamped_windows, 0);
}

#[test]
fn test_growth_past_the_cap_is_counted() {
    let config = SimulationConfig {
        max_window: 2,
        ..fixed_population(2, BackoffStrategy::Exponential { factor: 4 }, 3)
    };
    let mut sim = Simulation::new(config).unwrap();

    sim.step().unwrap();
    sim.step().unwrap();
    assert_eq!(sim.metrics().largest_window, 2);
    assert_eq!(sim.metrics().clamped_windows, 2);
}

#[test]
fn test_non_growing_backoff_is_rejected_before_running() {
    let stuck = [
        BackoffStrategy::Linear { step: 0 },
        BackoffStrategy::Exponential { factor: 1 },
        BackoffStrategy::Polynomial { exponent: 0 },
    ];

    for backoff in stuck {
        let result = Simulation::new(fixed_population(2, backoff, 1));
        assert!(
            matches!(
                result,
                Err(SimulationError::Config(ConfigError::InvalidParameter { .. }))
            ),
            "{backoff} was accepted"
        );
    }
}

#[test]
fn test_too_many_invariant_violations_stop_the_run() {
    let mut sim = Simulation::new(fixed_population(20, BackoffStrategy::default(), 10)).unwrap();
    sim.add_invariant(Arc::new(PopulationLimitInvariant::new(0)));

    let result = sim.run();
    assert!(matches!(
        result,
        Err(SimulationError::TooManyInvariantViolations { count: 10 })
    ));
}
