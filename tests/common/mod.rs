//! Shared test utilities and fixtures
//!
//! Common infrastructure for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::process::{Command, Output};
use std::sync::Arc;

use stca_core::{Catalog, NamedTable};
use stca_types::{Cell, Coord, Grid, RuleTable};

/// The built-in catalog; panics if any table fails to decode.
pub fn catalog() -> Catalog {
    Catalog::builtin().expect("built-in tables decode")
}

pub fn table(name: &str) -> Arc<RuleTable> {
    let catalog = catalog();
    let NamedTable { table, .. } = catalog.resolve(name).expect("known automaton");
    Arc::clone(table)
}

/// A blank grid with the given cells set.
pub fn grid_with(width: usize, height: usize, cells: &[(usize, usize, Cell)]) -> Grid {
    let mut grid = Grid::new(width, height).expect("non-empty grid");
    for &(x, y, cell) in cells {
        grid.set(Coord::new(x, y), cell).expect("cell in bounds");
    }
    grid
}

/// A lone signal: the bottom subcell set, everything else quiescent.
pub fn signal() -> Cell {
    Cell::new(0, 1, 0, 0)
}

/// Run the `stca` binary with `--config` pointing into `home`.
pub fn stca(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stca"))
        .arg("--config")
        .arg(home.join("config.toml"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn stca")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
