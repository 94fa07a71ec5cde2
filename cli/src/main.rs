//! STCA CLI - binary entry point.
//!
//! Wires settings, the built-in catalog, the `.con` codec and the background workers
//! together behind a handful of subcommands:
//!
//! ```text
//! stca [--config PATH] catalog | examine | verify | simulate | new | list | use
//! ```
//!
//! Logs go to `~/.stca/logs/stca.log` (or `./.stca/logs/stca.log`) so stdout stays
//! reserved for command output.

mod commands;

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "stca", version, about = "Rule engine for triangular-subcell cellular automata")]
struct Args {
    /// Settings file to use instead of ~/.stca/config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in automata
    Catalog,
    /// Report symmetry and local determinism of an automaton
    Examine {
        /// Catalog index or name; defaults to the configured automaton
        #[arg(long, short)]
        automaton: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Search for a transition path from a source configuration to a target
    Verify {
        #[arg(long)]
        source: PathBuf,
        #[arg(long)]
        target: PathBuf,
        #[arg(long, short)]
        automaton: Option<String>,
        /// Restart from the source every time the target is reached
        #[arg(long)]
        repeat: bool,
        #[arg(long)]
        seed: Option<u64>,
        /// Consecutive random misses before sweeping the whole grid
        #[arg(long)]
        max_stalls: Option<u64>,
        /// Stop the search after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Run the simulator on a saved configuration without a display
    Simulate {
        #[arg(long, short)]
        input: PathBuf,
        #[arg(long, short)]
        automaton: Option<String>,
        /// Attempts to make; runs until Ctrl-C when omitted
        #[arg(long)]
        attempts: Option<u64>,
        #[arg(long)]
        seed: Option<u64>,
        /// Delay between attempts in milliseconds
        #[arg(long)]
        speed_ms: Option<u64>,
        /// Save the resulting configuration here
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Create a blank configuration sized by the grid settings
    New {
        /// Configuration name, saved as <name>.con
        name: String,
        /// Directory to save into; defaults to the storage directory
        #[arg(long)]
        dir: Option<PathBuf>,
        /// Replace an existing configuration of the same name
        #[arg(long)]
        force: bool,
    },
    /// List saved configurations
    List {
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Make an automaton the default in the settings file
    Use {
        /// Catalog index or name
        automaton: String,
    },
}

fn init_tracing(config_path: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, init_warnings) = open_log_file(config_path);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No log file; stderr keeps stdout clean for command output.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
    for warning in init_warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file(config_path: Option<&Path>) -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates(config_path) {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates(config_path: Option<&Path>) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: next to the settings file, normally ~/.stca/logs/stca.log
    if let Ok(config_path) = stca_config::resolve_config_path(config_path)
        && let Some(config_dir) = config_path.parent()
        && !config_dir.as_os_str().is_empty()
    {
        candidates.push(config_dir.join("logs").join("stca.log"));
    }

    // Fallback: ./.stca/logs/stca.log
    candidates.push(PathBuf::from(".stca").join("logs").join("stca.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.config.as_deref());

    let ctx = commands::Context::load(args.config)?;
    match args.cmd {
        Command::Catalog => commands::catalog(&ctx),
        Command::Examine { automaton, json } => commands::examine(&ctx, automaton.as_deref(), json),
        Command::Verify {
            source,
            target,
            automaton,
            repeat,
            seed,
            max_stalls,
            timeout_secs,
        } => {
            commands::verify(
                &ctx,
                commands::VerifyArgs {
                    source,
                    target,
                    automaton,
                    repeat,
                    seed,
                    max_stalls,
                    timeout_secs,
                },
            )
            .await
        }
        Command::Simulate {
            input,
            automaton,
            attempts,
            seed,
            speed_ms,
            output,
        } => {
            commands::simulate(
                &ctx,
                commands::SimulateArgs {
                    input,
                    automaton,
                    attempts,
                    seed,
                    speed_ms,
                    output,
                },
            )
            .await
        }
        Command::New { name, dir, force } => {
            commands::new_configuration(&ctx, &name, dir, force)
        }
        Command::List { dir } => commands::list(&ctx, dir),
        Command::Use { automaton } => commands::use_automaton(&ctx, &automaton),
    }
}
