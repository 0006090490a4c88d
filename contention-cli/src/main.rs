//! Contention CLI - Command-line interface
//!
//! Runs backoff simulations and compares strategies from the terminal.

mod commands;
mod tracing_setup;

use std::path::PathBuf;

use clap::Parser;
use tracing_setup::CliLogLevel;

#[derive(Parser)]
#[command(name = "contention")]
#[command(about = "Simulate devices contending for a shared resource with backoff")]
#[command(version)]
struct Cli {
    /// Console log level, overridden by RUST_LOG
    #[arg(long, global = true, value_enum, default_value_t = CliLogLevel::Warn)]
    log_level: CliLogLevel,

    /// Directory for a full trace log of the run
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_setup::init_tracing(cli.log_level.as_tracing_level(), cli.log_dir.as_deref())?;
    commands::execute(cli.command)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "contention",
            "run",
            "--strategy",
            "linear",
            "--param",
            "3",
            "--arrival",
            "poisson:0.2",
            "--arrival-events",
            "50",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, CliLogLevel::Debug);
        match cli.command {
            commands::Commands::Run {
                strategy,
                param,
                scenario,
            } => {
                assert_eq!(strategy, "linear");
                assert_eq!(param, Some(3));
                assert_eq!(scenario.arrival_events, 50);
            }
            other => panic!("Expected run command, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parses_compare() {
        let cli = Cli::try_parse_from(["contention", "compare", "--devices", "20", "--json"])
            .unwrap();

        assert!(matches!(
            cli.command,
            commands::Commands::Compare { ref scenario } if scenario.devices == 20 && scenario.json
        ));
    }

    #[test]
    fn test_cli_rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["contention", "--log-level", "loud", "compare"]).is_err());
    }
}
