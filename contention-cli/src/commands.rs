//! CLI command implementations

use anyhow::Context;
use clap::{Args, Subcommand};
use contention_sim::{
    ArrivalSpec, BackoffStrategy, ConfigError, DEFAULT_MAX_WINDOW, Simulation, SimulationConfig,
    SimulationReport,
};
use serde::Serialize;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run one simulation and print its report
    Run {
        /// Backoff strategy: linear, exponential, polynomial or backoff-backon
        #[arg(short, long, default_value = "exponential")]
        strategy: String,

        /// Strategy parameter (step, factor or exponent)
        #[arg(short, long)]
        param: Option<u64>,

        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Run every strategy with its default parameter under the same seed
    Compare {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

/// Options shared by every command that runs a simulation.
#[derive(Debug, Clone, Args)]
pub struct ScenarioArgs {
    /// Devices present before the first tick
    #[arg(short, long, default_value = "10")]
    pub devices: usize,

    /// Number of ticks on which the arrival process is invoked
    #[arg(long, default_value = "0")]
    pub arrival_events: u64,

    /// Arrival process: constant:N, gaussian:MEAN,STD_DEV, poisson:LAMBDA, bernoulli:P or bursty
    #[arg(short, long, default_value = "constant:0")]
    pub arrival: String,

    /// Seed for reproducible runs; drawn from entropy when omitted
    #[arg(long)]
    pub seed: Option<u64>,

    /// Upper clamp for the contention window, at least 2
    #[arg(long, default_value_t = DEFAULT_MAX_WINDOW)]
    pub max_window: u64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

impl ScenarioArgs {
    /// Builds a validated configuration for one backoff strategy.
    ///
    /// # Errors
    /// - `ConfigError` - Arrival selector or a numeric option is invalid
    pub fn to_config(&self, backoff: BackoffStrategy) -> Result<SimulationConfig, ConfigError> {
        let arrival: ArrivalSpec = self.arrival.parse()?;
        let config = SimulationConfig {
            deterministic_seed: self.seed,
            initial_devices: self.devices,
            arrival,
            arrival_events: self.arrival_events,
            backoff,
            max_window: self.max_window,
            ..SimulationConfig::default()
        };
        config.validate()?;
        Ok(config)
    }
}

/// One line of `compare` output.
#[derive(Debug, Serialize)]
struct ComparisonRow {
    strategy: String,
    seed: u64,
    devices: usize,
    finish_tick: u64,
    // None when the run processed no devices
    average_trials: Option<f64>,
    average_finish_time: Option<f64>,
}

impl ComparisonRow {
    fn from_report(report: &SimulationReport) -> Self {
        let stats = report.aggregate.stats();
        Self {
            strategy: report.strategy.to_string(),
            seed: report.seed,
            devices: stats.map_or(0, |s| s.device_count),
            finish_tick: report.finish_tick,
            average_trials: stats.map(|s| s.average_trials),
            average_finish_time: stats.map(|s| s.average_finish_time),
        }
    }

    fn table_line(&self) -> String {
        let average =
            |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"));
        format!(
            "{:<20} {:>8} {:>12} {:>14} {:>14}",
            self.strategy,
            self.devices,
            self.finish_tick,
            average(self.average_trials),
            average(self.average_finish_time)
        )
    }
}

/// Execute the selected CLI command
///
/// # Errors
/// Returns the configuration or simulation error of the command that failed
pub fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            strategy,
            param,
            scenario,
        } => run_simulation(&strategy, param, &scenario),
        Commands::Compare { scenario } => compare_strategies(&scenario),
    }
}

/// Run a single simulation
///
/// # Errors
/// - `ConfigError` - Unknown strategy or arrival selector, or invalid parameter
/// - `SimulationError` - Run diverged or hit a limit
pub fn run_simulation(
    strategy: &str,
    param: Option<u64>,
    scenario: &ScenarioArgs,
) -> anyhow::Result<()> {
    let backoff = BackoffStrategy::from_name(strategy, param)?;
    let config = scenario.to_config(backoff)?;

    let mut simulation = Simulation::new(config)?;
    let seed = simulation.seed();
    let report = simulation
        .run()
        .with_context(|| format!("simulation with seed {seed} failed"))?;

    if scenario.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary());
    }

    Ok(())
}

/// Run every backoff strategy against the same scenario
///
/// # Errors
/// - `ConfigError` - Invalid arrival selector or parameter
/// - `SimulationError` - Any of the runs diverged or hit a limit
pub fn compare_strategies(scenario: &ScenarioArgs) -> anyhow::Result<()> {
    let mut seed = scenario.seed;
    let mut rows = Vec::new();

    for backoff in BackoffStrategy::all_defaults() {
        let config = SimulationConfig {
            deterministic_seed: seed,
            ..scenario.to_config(backoff)?
        };

        let mut simulation = Simulation::new(config)?;
        // Later strategies replay the seed drawn by the first run
        seed = Some(simulation.seed());

        let report = simulation
            .run()
            .with_context(|| format!("{backoff} run failed"))?;
        rows.push(ComparisonRow::from_report(&report));
    }

    if scenario.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if let Some(seed) = seed {
        println!("Strategy comparison (seed: {seed}, arrival: {})", scenario.arrival);
    }
    println!(
        "{:<20} {:>8} {:>12} {:>14} {:>14}",
        "strategy", "devices", "finish tick", "avg trials", "avg finish"
    );
    println!("{:-<72}", "");
    for row in &rows {
        println!("{}", row.table_line());
    }

    Ok(())
}
