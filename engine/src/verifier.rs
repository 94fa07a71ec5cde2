//! Running a [`PathVerifier`] on a background worker.

use std::sync::{Arc, Mutex};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use stca_core::{PathVerifier, StepOutcome, Verdict, VerifierError, VerifierProgress};
use stca_types::Grid;
use tokio::sync::watch;
use tracing::info;

use crate::worker::{Job, JobStep, WorkerError, WorkerHandle, WorkerStatus, lock, spawn_worker};

/// Attempts between periodic progress reports.
const REPORT_INTERVAL: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifierReport {
    pub progress: VerifierProgress,
    /// Set once the current run has ended.
    pub verdict: Option<Verdict>,
}

struct VerifierJob {
    verifier: Arc<Mutex<PathVerifier>>,
    rng: StdRng,
    report: watch::Sender<VerifierReport>,
    since_report: u64,
}

impl VerifierJob {
    fn publish(&mut self, progress: VerifierProgress, verdict: Option<Verdict>) {
        self.since_report = 0;
        self.report.send_replace(VerifierReport { progress, verdict });
    }
}

impl Job for VerifierJob {
    type Error = VerifierError;

    fn attempt(&mut self) -> Result<JobStep, VerifierError> {
        let (outcome, progress) = {
            let mut verifier = lock(&self.verifier);
            let outcome = verifier.step(&mut self.rng)?;
            (outcome, verifier.progress())
        };

        match outcome {
            StepOutcome::Converged { runs } => {
                self.publish(progress, Some(Verdict::Converged { runs }));
                Ok(JobStep::Finished)
            }
            StepOutcome::Deadlocked => {
                self.publish(progress, Some(Verdict::Deadlocked));
                Ok(JobStep::Finished)
            }
            StepOutcome::Restarted { runs } => {
                info!(runs, "target reached; restarting from the source");
                self.publish(progress, None);
                Ok(JobStep::Continue)
            }
            StepOutcome::Fired { .. } | StepOutcome::Missed { .. } => {
                self.since_report += 1;
                if self.since_report >= REPORT_INTERVAL {
                    self.publish(progress, None);
                }
                Ok(JobStep::Continue)
            }
        }
    }

    fn on_resume(&mut self) {
        let progress = {
            let mut verifier = lock(&self.verifier);
            verifier.prepare();
            verifier.progress()
        };
        self.publish(progress, None);
    }

    fn on_pause(&mut self) {
        let progress = lock(&self.verifier).progress();
        self.publish(progress, None);
    }

    fn on_stop(&mut self) {
        let progress = {
            let mut verifier = lock(&self.verifier);
            verifier.mark_stopped();
            verifier.progress()
        };
        let verdict = self.report.borrow().verdict.or(Some(Verdict::Stopped {
            runs: progress.completed_runs,
        }));
        self.publish(progress, verdict);
    }
}

/// Handle to a verifier running on its own worker.
///
/// Every resume starts a fresh run from the source configuration.
pub struct VerifierDriver {
    verifier: Arc<Mutex<PathVerifier>>,
    report: watch::Receiver<VerifierReport>,
    worker: WorkerHandle,
}

impl VerifierDriver {
    /// Spawn a paused driver. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(verifier: PathVerifier, seed: u64) -> Self {
        let (report_tx, report_rx) = watch::channel(VerifierReport {
            progress: verifier.progress(),
            verdict: None,
        });
        let verifier = Arc::new(Mutex::new(verifier));
        let job = VerifierJob {
            verifier: Arc::clone(&verifier),
            rng: StdRng::seed_from_u64(seed),
            report: report_tx,
            since_report: 0,
        };
        Self {
            verifier,
            report: report_rx,
            worker: spawn_worker("verifier", job),
        }
    }

    #[must_use]
    pub fn report(&self) -> VerifierReport {
        *self.report.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<VerifierReport> {
        self.report.clone()
    }

    /// A copy of the live grid.
    #[must_use]
    pub fn grid(&self) -> Grid {
        lock(&self.verifier).grid().clone()
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

    /// Wait for the current run to converge, deadlock or fail.
    pub async fn wait_until_idle(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.worker.wait_until_idle().await
    }

    /// Stop the worker and return the final report.
    pub async fn stop(self) -> Result<VerifierReport, WorkerError> {
        let Self { report, worker, .. } = self;
        worker.stop().await?;
        Ok(*report.borrow())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use stca_core::{VerifierOptions, VerifierState};
    use stca_types::{Cell, Coord, Pattern, ReflectionKind, Rule, RuleTable};
    use tokio::time;

    use super::*;
    use crate::worker::WorkerState;

    fn signal_table() -> Arc<RuleTable> {
        Arc::new(RuleTable::new(
            true,
            ReflectionKind::None,
            vec![Rule::new(
                Pattern::new([0, 0, 0, 0, 1, 0, 0, 0]),
                Pattern::new([0, 1, 0, 0, 0, 0, 0, 0]),
            )],
        ))
    }

    fn grid_with(cells: &[(usize, usize, Cell)]) -> Grid {
        let mut grid = Grid::new(5, 5).unwrap();
        for (x, y, cell) in cells {
            grid.set(Coord::new(*x, *y), *cell).unwrap();
        }
        grid
    }

    fn signal_verifier(repeat: bool) -> PathVerifier {
        let source = grid_with(&[(2, 1, Cell::new(0, 1, 0, 0))]);
        let target = grid_with(&[(2, 3, Cell::new(0, 1, 0, 0))]);
        let options = VerifierOptions {
            max_stalls: 1_000,
            repeat,
        };
        PathVerifier::new(signal_table(), source, target, options).unwrap()
    }

    #[tokio::test]
    async fn converged_run_finishes_the_worker() {
        let mut driver = VerifierDriver::spawn(signal_verifier(false), 245_435);
        driver.resume().await.unwrap();

        let status = driver.wait_until_idle().await.unwrap();
        assert_eq!(status.state, WorkerState::Finished);
        let report = driver.report();
        assert_eq!(report.verdict, Some(Verdict::Converged { runs: 1 }));
        assert_eq!(report.progress.differences, 0);
        assert_eq!(report.progress.state, VerifierState::Converged);
        assert_eq!(driver.grid().cell(Coord::new(2, 3)).unwrap(), Cell::new(0, 1, 0, 0));

        let report = driver.stop().await.unwrap();
        assert_eq!(report.verdict, Some(Verdict::Converged { runs: 1 }));
    }

    #[tokio::test]
    async fn stuck_source_reports_deadlock() {
        let source = Grid::new(5, 5).unwrap();
        let target = grid_with(&[(2, 2, Cell::new(1, 0, 0, 0))]);
        let options = VerifierOptions {
            max_stalls: 50,
            repeat: false,
        };
        let verifier = PathVerifier::new(signal_table(), source, target, options).unwrap();
        let mut driver = VerifierDriver::spawn(verifier, 1);
        driver.resume().await.unwrap();

        driver.wait_until_idle().await.unwrap();
        assert_eq!(driver.report().verdict, Some(Verdict::Deadlocked));
        assert_eq!(driver.report().progress.attempts, 50 + 25);
        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn resume_starts_a_fresh_run() {
        let mut driver = VerifierDriver::spawn(signal_verifier(false), 3);
        driver.resume().await.unwrap();
        driver.wait_until_idle().await.unwrap();
        let first = driver.report().progress.fires;

        driver.resume().await.unwrap();
        driver.wait_until_idle().await.unwrap();
        let report = driver.report();
        assert_eq!(report.verdict, Some(Verdict::Converged { runs: 2 }));
        assert_eq!(report.progress.fires, first + 2);
        driver.stop().await.unwrap();
    }

    #[tokio::test]
    async fn repeat_mode_runs_until_stopped() {
        let mut driver = VerifierDriver::spawn(signal_verifier(true), 8);
        driver.resume().await.unwrap();

        let mut reports = driver.subscribe();
        time::timeout(
            Duration::from_secs(10),
            reports.wait_for(|report| report.progress.completed_runs >= 3),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(driver.status().state, WorkerState::Running);

        let status = driver.pause().await.unwrap();
        assert_eq!(status.state, WorkerState::Paused);

        let report = driver.stop().await.unwrap();
        assert!(matches!(report.verdict, Some(Verdict::Stopped { runs }) if runs >= 3));
        assert_eq!(report.progress.state, VerifierState::Stopped);
    }
}
