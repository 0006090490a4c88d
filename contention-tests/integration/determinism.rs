//! Reproducibility of complete runs.

use contention_sim::{ArrivalSpec, BackoffStrategy, Simulation, SimulationConfig};

fn loaded_channel(seed: Option<u64>, backoff: BackoffStrategy) -> SimulationConfig {
    SimulationConfig {
        deterministic_seed: seed,
        initial_devices: 12,
        arrival: ArrivalSpec::Gaussian {
            mean: 0.4,
            std_dev: 0.8,
        },
        arrival_events: 150,
        backoff,
        ..Default::default()
    }
}

#[test]
fn test_same_seed_same_trace() {
    for backoff in BackoffStrategy::all_defaults() {
        let mut first = Simulation::new(loaded_channel(Some(99), backoff)).unwrap();
        let mut second = Simulation::new(loaded_channel(Some(99), backoff)).unwrap();

        while !first.is_done() {
            let a = first.step().unwrap();
            let b = second.step().unwrap();
            assert_eq!(a, b, "{backoff} diverged at tick {}", a.tick);
        }
        assert!(second.is_done());
    }
}

#[test]
fn test_report_json_is_identical_for_same_seed() {
    let run = || {
        let report = Simulation::new(loaded_channel(Some(5), BackoffStrategy::default()))
            .unwrap()
            .run()
            .unwrap();
        serde_json::to_string(&report).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_entropy_seed_is_reported_and_replayable() {
    let mut original = Simulation::new(loaded_channel(None, BackoffStrategy::default())).unwrap();
    let report = original.run().unwrap();

    let mut replay =
        Simulation::new(loaded_channel(Some(report.seed), BackoffStrategy::default())).unwrap();
    let replayed = replay.run().unwrap();

    assert_eq!(replayed.records, report.records);
    assert_eq!(replayed.finish_tick, report.finish_tick);
}
