//! End-to-end simulation scenarios through the public API.

use std::sync::Arc;

use contention_sim::{
    ArrivalSpec, Arbitration, BackoffStrategy, DrainedResourceInvariant, RunSummary, Simulation,
    SimulationConfig, SimulationError, WindowBoundsInvariant,
};

#[test]
fn test_lone_device_acquires_immediately() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(100),
        initial_devices: 1,
        ..Default::default()
    })
    .unwrap();

    let report = sim.run().unwrap();
    let stats = report.aggregate.stats().unwrap();

    assert_eq!(report.finish_tick, 1);
    assert_eq!(stats.device_count, 1);
    assert_eq!(stats.average_trials, 1.0);
    assert_eq!(stats.average_finish_time, 0.0);
    assert_eq!(stats.average_wait_time, 0.0);
}

#[test]
fn test_pair_collides_on_first_tick() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(101),
        initial_devices: 2,
        backoff: BackoffStrategy::Linear { step: 1 },
        ..Default::default()
    })
    .unwrap();

    let first = sim.step().unwrap();
    match first.arbitration {
        Arbitration::Collision { contenders } => assert_eq!(contenders.len(), 2),
        other => panic!("Expected collision on tick 0, got {other:?}"),
    }

    let report = sim.run().unwrap();
    assert_eq!(report.records.len(), 2);
    assert!(report.records.iter().all(|r| r.trial_count >= 2));
    assert_eq!(report.metrics.collision_ticks, report.metrics.collided_attempts / 2);
}

#[test]
fn test_no_devices_reports_empty_summary() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(5),
        initial_devices: 0,
        arrival: ArrivalSpec::Constant { count: 0 },
        arrival_events: 10,
        ..Default::default()
    })
    .unwrap();

    let report = sim.run().unwrap();
    assert_eq!(report.aggregate, RunSummary::NoDevicesProcessed);
    assert_eq!(report.finish_tick, 10);
    assert_eq!(report.metrics.idle_ticks, 10);
    assert!(report.summary().contains("No devices processed"));
}

#[test]
fn test_every_strategy_drains_fixed_population() {
    for backoff in BackoffStrategy::all_defaults() {
        let mut sim = Simulation::new(SimulationConfig {
            deterministic_seed: Some(2024),
            initial_devices: 25,
            backoff,
            ..Default::default()
        })
        .unwrap();
        sim.add_invariant(Arc::new(WindowBoundsInvariant));
        sim.add_invariant(Arc::new(DrainedResourceInvariant));

        let report = sim.run().unwrap();
        assert_eq!(report.records.len(), 25, "{backoff} left devices behind");
        assert!(report.metrics.invariant_violations.is_empty());
        assert_eq!(report.metrics.successful_ticks, 25);
    }
}

#[test]
fn test_arrival_processes_feed_population() {
    let arrivals = [
        "constant:1",
        "gaussian:1.5,0.5",
        "poisson:0.4",
        "bernoulli:0.5",
    ];

    for selector in arrivals {
        let arrival: ArrivalSpec = selector.parse().unwrap();
        let mut sim = Simulation::new(SimulationConfig {
            deterministic_seed: Some(17),
            initial_devices: 0,
            arrival,
            arrival_events: 40,
            ..Default::default()
        })
        .unwrap();

        let report = sim.run().unwrap();
        assert!(report.finish_tick >= 40, "{selector} stopped early");
        assert_eq!(
            report.metrics.devices_created,
            report.records.len() as u64,
            "{selector} lost devices"
        );
    }
}

#[test]
fn test_constant_arrivals_create_exact_population() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(8),
        initial_devices: 3,
        arrival: ArrivalSpec::Constant { count: 2 },
        arrival_events: 5,
        ..Default::default()
    })
    .unwrap();

    let report = sim.run().unwrap();
    assert_eq!(report.records.len(), 13);
    assert!(report.records.iter().all(|r| r.finish_tick >= r.arrival_tick));
}

#[test]
fn test_selector_errors_surface_before_running() {
    assert!(SimulationConfig::from_selectors("exponential", Some(0), "constant:1").is_err());
    assert!(SimulationConfig::from_selectors("linear", None, "poisson:-2").is_err());

    let config = SimulationConfig {
        max_window: 0,
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn test_report_serializes_to_json() {
    let mut sim = Simulation::new(SimulationConfig {
        deterministic_seed: Some(9),
        initial_devices: 3,
        backoff: BackoffStrategy::Polynomial { exponent: 2 },
        ..Default::default()
    })
    .unwrap();
    let report = sim.run().unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["seed"], 9);
    assert_eq!(json["strategy"]["kind"], "polynomial");
    assert_eq!(json["aggregate"]["status"], "completed");
    assert_eq!(json["records"].as_array().unwrap().len(), 3);
}
