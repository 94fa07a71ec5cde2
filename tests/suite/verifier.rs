//! Path verification with the built-in RS automaton.

use rand::SeedableRng;
use rand::rngs::StdRng;
use stca_core::{PathVerifier, SelectionMode, Verdict, VerifierError, VerifierOptions};
use stca_types::{Cell, Coord, Grid};

use crate::common::{grid_with, signal, table};

fn options(max_stalls: u64) -> VerifierOptions {
    VerifierOptions {
        max_stalls,
        repeat: false,
    }
}

#[test]
fn rs_signal_travels_down_a_column() {
    let source = grid_with(5, 5, &[(2, 1, signal())]);
    let target = grid_with(5, 5, &[(2, 3, signal())]);
    let mut verifier = PathVerifier::new(table("RS"), source, target, options(1_000)).unwrap();
    assert_eq!(verifier.differences(), 2);

    let mut rng = StdRng::seed_from_u64(245_435);
    let verdict = verifier.run(&mut rng, || false).unwrap();

    assert_eq!(verdict, Verdict::Converged { runs: 1 });
    assert_eq!(verifier.grid(), verifier.target());
    assert_eq!(verifier.progress().fires, 2);
}

#[test]
fn rs_cannot_leave_the_quiescent_grid() {
    let source = Grid::new(5, 5).unwrap();
    let target = grid_with(5, 5, &[(2, 2, signal())]);
    let mut verifier = PathVerifier::new(table("RS"), source, target, options(25)).unwrap();

    let mut rng = StdRng::seed_from_u64(4);
    let verdict = verifier.run(&mut rng, || false).unwrap();

    assert_eq!(verdict, Verdict::Deadlocked);
    assert_eq!(verifier.mode(), SelectionMode::Exhaustive);
    assert_eq!(verifier.progress().fires, 0);
    assert_eq!(verifier.differences(), 1);
}

#[test]
fn signal_past_the_target_deadlocks_at_the_border() {
    // The signal runs into the bottom border and can never come back up.
    let source = grid_with(5, 5, &[(2, 1, signal())]);
    let target = grid_with(5, 5, &[(2, 1, Cell::new(1, 0, 0, 0))]);
    let mut verifier = PathVerifier::new(table("RS"), source, target, options(200)).unwrap();

    let mut rng = StdRng::seed_from_u64(12);
    assert_eq!(verifier.run(&mut rng, || false).unwrap(), Verdict::Deadlocked);
    assert_eq!(verifier.grid().cell(Coord::new(2, 3)).unwrap(), signal());
}

#[test]
fn mismatched_grids_are_rejected() {
    let err = PathVerifier::new(
        table("RS"),
        Grid::new(5, 5).unwrap(),
        Grid::new(5, 6).unwrap(),
        options(10),
    )
    .err()
    .expect("dimension mismatch");
    assert!(matches!(err, VerifierError::Dimensions(_)));
}

#[test]
fn repeat_mode_keeps_reaching_the_target() {
    let source = grid_with(5, 5, &[(2, 1, signal())]);
    let target = grid_with(5, 5, &[(2, 3, signal())]);
    let options = VerifierOptions {
        max_stalls: 1_000,
        repeat: true,
    };
    let mut verifier = PathVerifier::new(table("RS"), source, target, options).unwrap();

    let mut rng = StdRng::seed_from_u64(99);
    let mut checks = 0;
    let verdict = verifier
        .run(&mut rng, || {
            checks += 1;
            checks > 5_000
        })
        .unwrap();

    let Verdict::Stopped { runs } = verdict else {
        panic!("repeat mode only stops on request, got {verdict:?}");
    };
    assert!(runs >= 10, "only {runs} runs");
}
