//! Subcommand implementations.

use std::future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::Serialize;
use stca_config::{Settings, persist_automaton, resolve_config_path};
use stca_core::persist::{self, Configuration};
use stca_core::{
    Catalog, DeterminismReport, NamedTable, PathVerifier, Verdict, VerifierOptions, Violation,
};
use stca_engine::{Simulator, SimulatorConfig, VerifierDriver, VerifierReport};
use stca_types::Grid;
use tokio::{signal, time};
use tracing::{info, warn};

/// Settings and the catalog, loaded once per invocation.
pub struct Context {
    config_path: Option<PathBuf>,
    settings: Settings,
    catalog: Catalog,
}

impl Context {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let settings = match &config_path {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };
        let catalog = Catalog::builtin()?;
        Ok(Self {
            config_path,
            settings,
            catalog,
        })
    }

    fn automaton(&self, selector: Option<&str>) -> Result<&NamedTable> {
        let selector = selector.unwrap_or(&self.settings.simulation.automaton);
        let entry = self.catalog.resolve(selector)?;
        entry
            .table
            .validate(self.settings.grid.states)
            .with_context(|| {
                format!(
                    "automaton '{}' does not fit {} states",
                    entry.name, self.settings.grid.states
                )
            })?;
        Ok(entry)
    }

    fn load_configuration(&self, path: &Path) -> Result<Configuration> {
        persist::load(path, self.settings.grid.states)
            .with_context(|| format!("failed to load configuration {}", path.display()))
    }
}

pub fn catalog(ctx: &Context) -> Result<()> {
    for (index, entry) in ctx.catalog.entries().iter().enumerate() {
        let table = &entry.table;
        println!(
            "{index:>2}  {:<44} rotation: {:<3} reflection: {:<26} rules: {}",
            entry.name,
            if table.rotation_symmetric() { "yes" } else { "no" },
            table.reflection().label(),
            table.len()
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct ExamineReport<'a> {
    name: &'a str,
    rotation_symmetric: bool,
    reflection: &'static str,
    rules: usize,
    forwards_deterministic: bool,
    backwards_deterministic: bool,
    forwards_violation: Option<Violation>,
    backwards_violation: Option<Violation>,
}

pub fn examine(ctx: &Context, automaton: Option<&str>, json: bool) -> Result<()> {
    let entry = ctx.automaton(automaton)?;
    let table = &entry.table;
    let determinism = DeterminismReport::analyze(table);
    let report = ExamineReport {
        name: entry.name,
        rotation_symmetric: table.rotation_symmetric(),
        reflection: table.reflection().label(),
        rules: table.len(),
        forwards_deterministic: determinism.forwards_deterministic(),
        backwards_deterministic: determinism.backwards_deterministic(),
        forwards_violation: determinism.forwards,
        backwards_violation: determinism.backwards,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", report.name);
    println!("  rules:      {}", report.rules);
    println!(
        "  symmetry:   rotation {}, {} reflection",
        if report.rotation_symmetric { "yes" } else { "no" },
        report.reflection
    );
    for (index, rule) in table.rules().iter().enumerate() {
        println!("  rule {index:<2}    {rule}");
    }
    for (label, violation) in [
        ("forwards", report.forwards_violation),
        ("backwards", report.backwards_violation),
    ] {
        match violation {
            None => println!("  {label:<10}  locally deterministic"),
            Some(violation) => println!("  {label:<10}  not locally deterministic: {violation}"),
        }
    }
    Ok(())
}

pub struct VerifyArgs {
    pub source: PathBuf,
    pub target: PathBuf,
    pub automaton: Option<String>,
    pub repeat: bool,
    pub seed: Option<u64>,
    pub max_stalls: Option<u64>,
    pub timeout_secs: Option<u64>,
}

pub async fn verify(ctx: &Context, args: VerifyArgs) -> Result<()> {
    let entry = ctx.automaton(args.automaton.as_deref())?;
    let source = ctx.load_configuration(&args.source)?;
    let target = ctx.load_configuration(&args.target)?;
    let options = VerifierOptions {
        max_stalls: args.max_stalls.unwrap_or(ctx.settings.verifier.max_stalls),
        repeat: args.repeat || ctx.settings.verifier.repeat,
    };
    let verifier = PathVerifier::new(entry.table.clone(), source.grid, target.grid, options)
        .context("source and target cannot be compared")?;
    println!(
        "verifying with {} ({} differing cells)",
        entry.name,
        verifier.differences()
    );

    let seed = args.seed.unwrap_or(ctx.settings.simulation.seed);
    let mut driver = VerifierDriver::spawn(verifier, seed);
    driver.resume().await?;
    info!(automaton = entry.name, seed, ?options, "verifier started");

    let limit = args.timeout_secs.map(Duration::from_secs);
    tokio::select! {
        status = driver.wait_until_idle() => {
            let status = status?;
            if let Some(error) = status.error {
                anyhow::bail!("verifier failed: {error}");
            }
        }
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("interrupted; stopping verifier");
        }
        () = sleep_or_forever(limit) => {
            warn!(?limit, "verifier timed out");
        }
    }

    let report = driver.stop().await?;
    print_verdict(&report);
    Ok(())
}

fn print_verdict(report: &VerifierReport) {
    let progress = &report.progress;
    match report.verdict {
        Some(Verdict::Converged { runs }) => println!("converged: target reached ({runs} run(s))"),
        Some(Verdict::Deadlocked) => println!(
            "deadlocked: no rule can fire; {} cell(s) still differ",
            progress.differences
        ),
        Some(Verdict::Stopped { runs }) => {
            println!("stopped after {runs} completed run(s); {} cell(s) differ", progress.differences);
        }
        None => println!("no verdict"),
    }
    println!(
        "attempts: {}  fires: {}  mode: {:?}",
        progress.attempts, progress.fires, progress.mode
    );
}

pub struct SimulateArgs {
    pub input: PathBuf,
    pub automaton: Option<String>,
    pub attempts: Option<u64>,
    pub seed: Option<u64>,
    pub speed_ms: Option<u64>,
    pub output: Option<PathBuf>,
}

pub async fn simulate(ctx: &Context, args: SimulateArgs) -> Result<()> {
    let entry = ctx.automaton(args.automaton.as_deref())?;
    let Configuration { annotations, grid } = ctx.load_configuration(&args.input)?;
    let config = SimulatorConfig {
        delay: Duration::from_millis(args.speed_ms.unwrap_or(ctx.settings.simulation.speed_ms)),
        max_attempts: args.attempts,
        seed: args.seed.unwrap_or(ctx.settings.simulation.seed),
    };

    let mut simulator = Simulator::spawn(entry.table.clone(), grid, config);
    simulator.resume().await?;
    info!(automaton = entry.name, ?config, "simulator started");

    tokio::select! {
        status = simulator.wait_until_idle() => {
            let status = status?;
            if let Some(error) = status.error {
                anyhow::bail!("simulator failed: {error}");
            }
        }
        result = signal::ctrl_c() => {
            result.context("failed to listen for Ctrl-C")?;
            info!("interrupted; stopping simulator");
        }
    }

    let snapshot = simulator.stop().await?;
    println!(
        "attempts: {}  fires: {}",
        snapshot.attempts, snapshot.fires
    );
    if let Some(coord) = snapshot.last_fired {
        println!("last fired at {coord}");
    }

    if let Some(output) = args.output {
        let config = Configuration {
            annotations,
            grid: snapshot.grid,
        };
        persist::save(&output, &config)
            .with_context(|| format!("failed to save configuration {}", output.display()))?;
        println!("saved {}", output.display());
    }
    Ok(())
}

/// Save a blank configuration sized by the `[grid]` settings.
pub fn new_configuration(
    ctx: &Context,
    name: &str,
    dir: Option<PathBuf>,
    force: bool,
) -> Result<()> {
    let dir = dir.unwrap_or_else(|| ctx.settings.storage.dir.clone());
    let path = persist::config_path(&dir, name)?;
    if path.exists() && !force {
        anyhow::bail!("{} already exists; pass --force to replace it", path.display());
    }

    let grid_settings = &ctx.settings.grid;
    let grid = Grid::new(grid_settings.x_cells, grid_settings.y_cells)?;
    persist::save(&path, &Configuration::new(grid))
        .with_context(|| format!("failed to save configuration {}", path.display()))?;
    info!(
        path = %path.display(),
        x_cells = grid_settings.x_cells,
        y_cells = grid_settings.y_cells,
        "created blank configuration"
    );
    println!(
        "created {} ({}x{})",
        path.display(),
        grid_settings.x_cells,
        grid_settings.y_cells
    );
    Ok(())
}

pub fn list(ctx: &Context, dir: Option<PathBuf>) -> Result<()> {
    let dir = dir.unwrap_or_else(|| ctx.settings.storage.dir.clone());
    for name in persist::list_saved(&dir)? {
        println!("{name}");
    }
    Ok(())
}

pub fn use_automaton(ctx: &Context, selector: &str) -> Result<()> {
    let entry = ctx.catalog.resolve(selector)?;
    let path = resolve_config_path(ctx.config_path.as_deref())?;
    persist_automaton(&path, entry.name)?;
    println!("default automaton set to '{}' in {}", entry.name, path.display());
    Ok(())
}

async fn sleep_or_forever(limit: Option<Duration>) {
    match limit {
        Some(limit) => time::sleep(limit).await,
        None => future::pending().await,
    }
}
