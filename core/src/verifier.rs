//! Searching for a transition path from a source configuration to a target.
//!
//! The verifier fires rules at randomly chosen interior cells until the live grid equals
//! the target. After too many consecutive misses it falls back to a raster sweep of the
//! whole grid; a sweep that ends without a single fire means no rule can fire anywhere,
//! and the run is declared deadlocked. This is a search, not a proof: convergence shows a
//! path exists, deadlock shows the reached configuration is stuck.

use std::iter;
use std::sync::Arc;

use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::Serialize;
use stca_types::{Coord, Direction, Grid, GridError, RuleTable};
use thiserror::Error;
use tracing::{debug, info};

use crate::executor::{Firing, try_fire};

/// Consecutive misses in random mode before switching to a raster sweep.
pub const DEFAULT_MAX_STALLS: u64 = 100_000;

#[derive(Debug, Error)]
pub enum VerifierError {
    #[error("source and target differ in size")]
    Dimensions(#[source] GridError),
    #[error(transparent)]
    Grid(#[from] GridError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifierOptions {
    pub max_stalls: u64,
    /// Start over from the source every time the target is reached.
    pub repeat: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            max_stalls: DEFAULT_MAX_STALLS,
            repeat: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Random,
    Exhaustive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerifierState {
    Idle,
    Running,
    Converged,
    Deadlocked,
    Stopped,
}

/// Result of a single [`PathVerifier::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Fired { coord: Coord, firing: Firing },
    Missed { coord: Coord },
    /// Target reached in repeat mode; the grid has been reset to the source.
    Restarted { runs: u64 },
    Converged { runs: u64 },
    Deadlocked,
}

/// How a [`PathVerifier::run`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "lowercase")]
pub enum Verdict {
    Converged { runs: u64 },
    Deadlocked,
    Stopped { runs: u64 },
}

/// Counters for progress reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifierProgress {
    pub state: VerifierState,
    pub mode: SelectionMode,
    pub attempts: u64,
    pub fires: u64,
    pub completed_runs: u64,
    pub differences: usize,
    pub stalls: u64,
}

pub struct PathVerifier {
    table: Arc<RuleTable>,
    options: VerifierOptions,
    source: Grid,
    target: Grid,
    grid: Grid,
    fixed_different: Vec<bool>,
    fixed_differences: usize,
    different: Vec<bool>,
    differences: usize,
    /// Interior column and row ranges; `None` when the grid has no interior.
    interior: Option<(Uniform<usize>, Uniform<usize>)>,
    state: VerifierState,
    mode: SelectionMode,
    cursor: Coord,
    stalls: u64,
    attempts: u64,
    fires: u64,
    completed_runs: u64,
}

impl PathVerifier {
    pub fn new(
        table: Arc<RuleTable>,
        source: Grid,
        target: Grid,
        options: VerifierOptions,
    ) -> Result<Self, VerifierError> {
        source
            .ensure_same_dimensions(&target)
            .map_err(VerifierError::Dimensions)?;

        let fixed_different: Vec<bool> = source
            .iter()
            .zip(target.iter())
            .map(|((_, a), (_, b))| a != b)
            .collect();
        let fixed_differences = fixed_different.iter().filter(|d| **d).count();

        let interior = Uniform::new(1, source.width().saturating_sub(1))
            .ok()
            .zip(Uniform::new(1, source.height().saturating_sub(1)).ok());

        Ok(Self {
            table,
            options,
            grid: source.clone(),
            source,
            target,
            different: fixed_different.clone(),
            fixed_different,
            differences: fixed_differences,
            fixed_differences,
            interior,
            state: VerifierState::Idle,
            mode: SelectionMode::Random,
            cursor: Coord::new(0, 0),
            stalls: 0,
            attempts: 0,
            fires: 0,
            completed_runs: 0,
        })
    }

    /// Reset the live grid and the difference set to the source configuration.
    pub fn prepare(&mut self) {
        self.grid.clone_from(&self.source);
        self.different.clone_from(&self.fixed_different);
        self.differences = self.fixed_differences;
        self.stalls = 0;
        self.mode = SelectionMode::Random;
        self.cursor = Coord::new(0, 0);
        self.state = VerifierState::Running;
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn source(&self) -> &Grid {
        &self.source
    }

    #[must_use]
    pub fn target(&self) -> &Grid {
        &self.target
    }

    #[must_use]
    pub fn table(&self) -> &Arc<RuleTable> {
        &self.table
    }

    #[must_use]
    pub fn options(&self) -> VerifierOptions {
        self.options
    }

    #[must_use]
    pub fn state(&self) -> VerifierState {
        self.state
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    #[must_use]
    pub fn differences(&self) -> usize {
        self.differences
    }

    /// Whether the live cell at `coord` currently differs from the target.
    #[must_use]
    pub fn is_different(&self, coord: Coord) -> bool {
        self.diff_index(coord)
            .is_some_and(|index| self.different[index])
    }

    #[must_use]
    pub fn stalls(&self) -> u64 {
        self.stalls
    }

    #[must_use]
    pub fn progress(&self) -> VerifierProgress {
        VerifierProgress {
            state: self.state,
            mode: self.mode,
            attempts: self.attempts,
            fires: self.fires,
            completed_runs: self.completed_runs,
            differences: self.differences,
            stalls: self.stalls,
        }
    }

    /// Mark the verifier stopped from outside a [`PathVerifier::run`] loop.
    pub fn mark_stopped(&mut self) {
        if self.state == VerifierState::Running {
            self.state = VerifierState::Stopped;
        }
    }

    /// Perform one attempt.
    ///
    /// Once converged (without repeat) or deadlocked, further calls report the same
    /// outcome and leave the grid alone until [`PathVerifier::prepare`] is called.
    pub fn step(&mut self, rng: &mut StdRng) -> Result<StepOutcome, VerifierError> {
        match self.state {
            VerifierState::Converged => {
                return Ok(StepOutcome::Converged {
                    runs: self.completed_runs,
                });
            }
            VerifierState::Deadlocked => return Ok(StepOutcome::Deadlocked),
            VerifierState::Idle | VerifierState::Stopped => self.state = VerifierState::Running,
            VerifierState::Running => {}
        }

        if self.differences == 0 {
            return Ok(self.finish_run());
        }

        let coord = match (self.mode, &self.interior) {
            (_, None) => {
                debug!("grid has no interior cells; nothing can fire");
                self.state = VerifierState::Deadlocked;
                return Ok(StepOutcome::Deadlocked);
            }
            (SelectionMode::Random, Some((columns, rows))) => {
                Coord::new(columns.sample(rng), rows.sample(rng))
            }
            (SelectionMode::Exhaustive, Some(_)) => self.cursor,
        };

        self.attempts += 1;
        let fired = if self.grid.is_interior(coord) {
            try_fire(&self.table, &mut self.grid, coord)?
        } else {
            None
        };

        match fired {
            Some(firing) => {
                self.fires += 1;
                self.stalls = 0;
                self.mode = SelectionMode::Random;
                self.refresh_differences(coord)?;
                Ok(StepOutcome::Fired { coord, firing })
            }
            None => Ok(self.record_miss(coord)),
        }
    }

    /// Step until converged, deadlocked, or `should_stop` returns true.
    ///
    /// Starts from a fresh [`PathVerifier::prepare`]. In repeat mode only `should_stop`
    /// ends the run.
    pub fn run(
        &mut self,
        rng: &mut StdRng,
        mut should_stop: impl FnMut() -> bool,
    ) -> Result<Verdict, VerifierError> {
        self.prepare();
        loop {
            if should_stop() {
                self.state = VerifierState::Stopped;
                return Ok(Verdict::Stopped {
                    runs: self.completed_runs,
                });
            }
            match self.step(rng)? {
                StepOutcome::Converged { runs } => return Ok(Verdict::Converged { runs }),
                StepOutcome::Deadlocked => return Ok(Verdict::Deadlocked),
                StepOutcome::Fired { .. }
                | StepOutcome::Missed { .. }
                | StepOutcome::Restarted { .. } => {}
            }
        }
    }

    fn finish_run(&mut self) -> StepOutcome {
        self.completed_runs += 1;
        let runs = self.completed_runs;
        info!(runs, attempts = self.attempts, fires = self.fires, "target configuration reached");
        if self.options.repeat {
            self.prepare();
            StepOutcome::Restarted { runs }
        } else {
            self.state = VerifierState::Converged;
            StepOutcome::Converged { runs }
        }
    }

    fn record_miss(&mut self, coord: Coord) -> StepOutcome {
        match self.mode {
            SelectionMode::Random => {
                self.stalls += 1;
                if self.stalls >= self.options.max_stalls {
                    debug!(stalls = self.stalls, "switching to exhaustive search");
                    self.mode = SelectionMode::Exhaustive;
                    self.cursor = Coord::new(0, 0);
                }
            }
            SelectionMode::Exhaustive => {
                let last = Coord::new(self.grid.width() - 1, self.grid.height() - 1);
                if coord == last {
                    info!(
                        attempts = self.attempts,
                        differences = self.differences,
                        "full sweep without a transition; deadlocked"
                    );
                    self.state = VerifierState::Deadlocked;
                    return StepOutcome::Deadlocked;
                }
                self.cursor = if coord.x + 1 < self.grid.width() {
                    Coord::new(coord.x + 1, coord.y)
                } else {
                    Coord::new(0, coord.y + 1)
                };
            }
        }
        StepOutcome::Missed { coord }
    }

    /// Re-compare the fired cell and its existing neighbours with the target.
    fn refresh_differences(&mut self, center: Coord) -> Result<(), GridError> {
        let touched: Vec<Coord> = iter::once(center)
            .chain(
                Direction::ALL
                    .into_iter()
                    .filter_map(|direction| self.grid.neighbor(center, direction)),
            )
            .collect();
        for coord in touched {
            let differs = self.grid.cell(coord)? != self.target.cell(coord)?;
            let Some(index) = self.diff_index(coord) else {
                continue;
            };
            match (self.different[index], differs) {
                (false, true) => self.differences += 1,
                (true, false) => self.differences -= 1,
                _ => {}
            }
            self.different[index] = differs;
        }
        Ok(())
    }

    fn diff_index(&self, coord: Coord) -> Option<usize> {
        self.grid
            .contains(coord)
            .then(|| coord.x * self.grid.height() + coord.y)
    }
}
