//! Command-line front end for the turn orchestrator.
//!
//! Results are printed to stdout as JSON; diagnostics go to stderr.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::debug;

use turn_runner::core::parser::wall_clock;
use turn_runner::core::stream::parse_transcript;
use turn_runner::error::TurnError;
use turn_runner::exit_codes;
use turn_runner::io::config::{DEFAULT_CONFIG_PATH, OrchestratorConfig, load_config, write_config};
use turn_runner::io::simulation::ScriptRunner;
use turn_runner::io::store::{FileStore, SeedFile, seed_store};
use turn_runner::logging;
use turn_runner::turn::{Orchestrator, RunEvent, TurnRequest};

#[derive(Parser)]
#[command(
    name = "turn-runner",
    version,
    about = "Run simulation turns and reconcile world state"
)]
struct Cli {
    /// Project directory; relative paths in the config resolve against it.
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (defaults to `<project-dir>/.turns/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file and create the store directory.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Advance the simulation and print the parsed turn result.
    Run {
        /// Number of turns to simulate.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        turns: u32,
        /// Use the higher-fidelity decision backend.
        #[arg(long)]
        use_bedrock: bool,
    },
    /// Reset the simulation to its initial world.
    Reset,
    /// Parse a captured simulation output log and print the records.
    Parse { file: PathBuf },
    /// Print reconciled world and character state.
    Snapshot,
    /// Load world and agent records from a JSON file into the store.
    Seed { file: PathBuf },
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("{err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<TurnError>()
        .map_or(exit_codes::INVALID, TurnError::exit_code)
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cli.project_dir.join(DEFAULT_CONFIG_PATH));
    match cli.command {
        Command::Init { force } => cmd_init(&cli.project_dir, &config_path, force),
        Command::Run { turns, use_bedrock } => {
            let orch = orchestrator(&cli.project_dir, &config_path)?;
            let request = TurnRequest { turns, use_bedrock };
            let result = orch.run_turns(&request, &mut log_event)?;
            print_json(&result)
        }
        Command::Reset => {
            let orch = orchestrator(&cli.project_dir, &config_path)?;
            let result = orch.reset(&mut log_event)?;
            print_json(&result)
        }
        Command::Parse { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            print_json(&parse_transcript(&text, wall_clock))
        }
        Command::Snapshot => {
            let orch = orchestrator(&cli.project_dir, &config_path)?;
            print_json(&orch.snapshot()?)
        }
        Command::Seed { file } => {
            let cfg = load_resolved(&cli.project_dir, &config_path)?;
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let seed: SeedFile = serde_json::from_str(&raw)
                .with_context(|| format!("parse seed file {}", file.display()))?;
            let count = seed_store(&FileStore::new(cfg.store_dir), &seed)?;
            println!("seeded {count} agents");
            Ok(())
        }
    }
}

fn cmd_init(project_dir: &Path, config_path: &Path, force: bool) -> Result<()> {
    if force || !config_path.exists() {
        write_config(config_path, &OrchestratorConfig::default())?;
    }
    let cfg = load_resolved(project_dir, config_path)?;
    fs::create_dir_all(&cfg.store_dir)
        .with_context(|| format!("create store directory {}", cfg.store_dir.display()))?;
    Ok(())
}

fn load_resolved(project_dir: &Path, config_path: &Path) -> Result<OrchestratorConfig> {
    let cfg = load_config(config_path)?;
    Ok(cfg.resolve_paths(project_dir))
}

fn orchestrator(
    project_dir: &Path,
    config_path: &Path,
) -> Result<Orchestrator<ScriptRunner, FileStore>> {
    let cfg = load_resolved(project_dir, config_path)?;
    Ok(Orchestrator::new(
        ScriptRunner::from_config(&cfg),
        FileStore::new(&cfg.store_dir),
        cfg.world_id.clone(),
        cfg.output_limit_bytes,
    ))
}

fn log_event(event: RunEvent) {
    match event {
        RunEvent::Admitted { invocation } => debug!(?invocation, "run admitted"),
        RunEvent::Update(update) => debug!(?update, "record update"),
        RunEvent::Exited { success } => debug!(success, "simulation exited"),
    }
}

/// Serialize `value` to pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::parse_from(["turn-runner", "run"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                turns: 1,
                use_bedrock: false
            }
        ));
    }

    #[test]
    fn parse_run_with_flags() {
        let cli = Cli::parse_from(["turn-runner", "run", "--turns", "3", "--use-bedrock"]);
        assert!(matches!(
            cli.command,
            Command::Run {
                turns: 3,
                use_bedrock: true
            }
        ));
    }

    #[test]
    fn zero_turns_is_rejected() {
        assert!(Cli::try_parse_from(["turn-runner", "run", "--turns", "0"]).is_err());
    }

    #[test]
    fn global_flags_apply_after_subcommand() {
        let cli = Cli::parse_from(["turn-runner", "snapshot", "--project-dir", "/srv/sim"]);
        assert_eq!(cli.project_dir, PathBuf::from("/srv/sim"));
        assert!(matches!(cli.command, Command::Snapshot));
    }

    #[test]
    fn turn_errors_map_to_stable_exit_codes() {
        let err = anyhow::Error::new(TurnError::AlreadyRunning);
        assert_eq!(exit_code_for(&err), exit_codes::ALREADY_RUNNING);
        assert_eq!(exit_code_for(&anyhow::anyhow!("bad config")), exit_codes::INVALID);
    }
}
