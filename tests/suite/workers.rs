//! Background workers driving the built-in automata.

use std::time::Duration;

use stca_core::{PathVerifier, Verdict, VerifierOptions};
use stca_engine::{Simulator, SimulatorConfig, VerifierDriver, WorkerState};
use stca_types::{Cell, Coord};
use tokio::time;

use crate::common::{grid_with, signal, table};

#[tokio::test]
async fn verifier_driver_converges_on_rs_signal() {
    let source = grid_with(5, 5, &[(2, 1, signal())]);
    let target = grid_with(5, 5, &[(2, 3, signal())]);
    let verifier =
        PathVerifier::new(table("RS"), source, target, VerifierOptions::default()).unwrap();

    let mut driver = VerifierDriver::spawn(verifier, 245_435);
    assert_eq!(driver.status().state, WorkerState::Paused);
    driver.resume().await.unwrap();

    let status = driver.wait_until_idle().await.unwrap();
    assert_eq!(status.state, WorkerState::Finished);
    let report = driver.stop().await.unwrap();
    assert_eq!(report.verdict, Some(Verdict::Converged { runs: 1 }));
    assert_eq!(report.progress.fires, 2);
}

#[tokio::test]
async fn simulator_pause_freezes_the_grid() {
    // Two signals heading down separate columns of a tall grid.
    let grid = grid_with(7, 40, &[(2, 1, signal()), (4, 1, signal())]);
    let config = SimulatorConfig {
        delay: Duration::from_micros(200),
        max_attempts: None,
        seed: 17,
    };
    let mut simulator = Simulator::spawn(table("RS"), grid, config);
    simulator.resume().await.unwrap();
    time::sleep(Duration::from_millis(20)).await;

    let status = simulator.pause().await.unwrap();
    assert_eq!(status.state, WorkerState::Paused);
    let paused = simulator.snapshot();
    assert!(paused.attempts > 0);
    time::sleep(Duration::from_millis(20)).await;
    assert_eq!(simulator.snapshot(), paused);

    let stopped = simulator.stop().await.unwrap();
    assert_eq!(stopped.attempts, paused.attempts);
    assert_eq!(stopped.grid, paused.grid);
}

#[tokio::test]
async fn simulator_conserves_signals() {
    let grid = grid_with(6, 6, &[(2, 1, signal()), (3, 4, Cell::new(1, 0, 0, 0))]);
    let config = SimulatorConfig {
        delay: Duration::ZERO,
        max_attempts: Some(500),
        seed: 3,
    };
    let mut simulator = Simulator::spawn(table("RS"), grid, config);
    simulator.resume().await.unwrap();
    assert_eq!(
        simulator.wait_until_idle().await.unwrap().state,
        WorkerState::Finished
    );

    let snapshot = simulator.stop().await.unwrap();
    let ones: usize = snapshot
        .grid
        .iter()
        .map(|(_, cell)| cell.subcells().iter().filter(|&&s| s == 1).count())
        .sum();
    assert_eq!(ones, 2);
    assert_eq!(snapshot.grid.cell(Coord::new(2, 1)).unwrap(), Cell::QUIESCENT);
}
