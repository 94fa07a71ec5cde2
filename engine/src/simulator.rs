//! The live simulator: fires rules at random interior cells in the background.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rand::SeedableRng;
use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::Serialize;
use stca_core::try_fire;
use stca_types::{Coord, Grid, GridError, RuleTable};
use tracing::{debug, trace};

use crate::worker::{Job, JobStep, WorkerError, WorkerHandle, WorkerStatus, lock, spawn_worker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Pause between attempts.
    pub delay: Duration,
    /// Attempts to make before the worker finishes on its own; `None` runs until paused.
    pub max_attempts: Option<u64>,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1),
            max_attempts: None,
            seed: 245_435,
        }
    }
}

/// A consistent copy of the simulator's grid and counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulatorSnapshot {
    pub grid: Grid,
    pub attempts: u64,
    pub fires: u64,
    pub last_fired: Option<Coord>,
}

struct Shared {
    grid: Grid,
    attempts: u64,
    fires: u64,
    last_fired: Option<Coord>,
}

struct SimulatorJob {
    table: Arc<RuleTable>,
    shared: Arc<Mutex<Shared>>,
    rng: StdRng,
    delay: Duration,
    max_attempts: Option<u64>,
    budget_used: u64,
}

/// A uniformly chosen interior cell, or `None` when the grid has no interior.
fn pick_interior(rng: &mut StdRng, grid: &Grid) -> Option<Coord> {
    let columns = Uniform::new(1, grid.width().saturating_sub(1)).ok()?;
    let rows = Uniform::new(1, grid.height().saturating_sub(1)).ok()?;
    Some(Coord::new(columns.sample(rng), rows.sample(rng)))
}

/// One transition attempt at `coord`, counted whether or not a rule fires.
fn fire_at(table: &RuleTable, state: &mut Shared, coord: Coord) -> Result<(), GridError> {
    let fired = try_fire(table, &mut state.grid, coord)?;
    state.attempts += 1;
    if let Some(firing) = fired {
        state.fires += 1;
        state.last_fired = Some(coord);
        trace!(%coord, rule = firing.rule, "simulator fired");
    }
    Ok(())
}

impl Job for SimulatorJob {
    type Error = GridError;

    fn attempt(&mut self) -> Result<JobStep, GridError> {
        if self
            .max_attempts
            .is_some_and(|max| self.budget_used >= max)
        {
            return Ok(JobStep::Finished);
        }

        {
            let mut shared = lock(&self.shared);
            let state = &mut *shared;
            let Some(coord) = pick_interior(&mut self.rng, &state.grid) else {
                debug!("grid has no interior cells; simulator finished");
                return Ok(JobStep::Finished);
            };
            fire_at(&self.table, state, coord)?;
        }
        self.budget_used += 1;

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(JobStep::Continue)
    }

    fn on_resume(&mut self) {
        if self
            .max_attempts
            .is_some_and(|max| self.budget_used >= max)
        {
            self.budget_used = 0;
        }
    }
}

/// Handle to a running simulator worker.
pub struct Simulator {
    shared: Arc<Mutex<Shared>>,
    worker: WorkerHandle,
}

impl Simulator {
    /// Spawn a paused simulator over `grid`. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(table: Arc<RuleTable>, grid: Grid, config: SimulatorConfig) -> Self {
        let shared = Arc::new(Mutex::new(Shared {
            grid,
            attempts: 0,
            fires: 0,
            last_fired: None,
        }));
        let job = SimulatorJob {
            table,
            shared: Arc::clone(&shared),
            rng: StdRng::seed_from_u64(config.seed),
            delay: config.delay,
            max_attempts: config.max_attempts,
            budget_used: 0,
        };
        Self {
            shared,
            worker: spawn_worker("simulator", job),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SimulatorSnapshot {
        let shared = lock(&self.shared);
        SimulatorSnapshot {
            grid: shared.grid.clone(),
            attempts: shared.attempts,
            fires: shared.fires,
            last_fired: shared.last_fired,
        }
    }

    /// Change the grid between attempts, e.g. to toggle subcells while paused.
    pub fn edit<R>(&self, f: impl FnOnce(&mut Grid) -> R) -> R {
        f(&mut lock(&self.shared).grid)
    }

    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        self.worker.status()
    }

    pub async fn resume(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.worker.resume().await
    }

    pub async fn pause(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.worker.pause().await
    }

    pub async fn wait_until_idle(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.worker.wait_until_idle().await
    }

    /// Stop the worker and return the final snapshot.
    pub async fn stop(self) -> Result<SimulatorSnapshot, WorkerError> {
        let Self { shared, worker } = self;
        worker.stop().await?;
        let shared = lock(&shared);
        Ok(SimulatorSnapshot {
            grid: shared.grid.clone(),
            attempts: shared.attempts,
            fires: shared.fires,
            last_fired: shared.last_fired,
        })
    }
}
