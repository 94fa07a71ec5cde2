//! Saving and loading `.con` configurations on disk.

use std::fs;

use stca_core::persist::{self, config_path, list_saved, load, save};
use stca_core::{Annotation, Configuration, PersistError};
use stca_types::{Cell, Coord};
use tempfile::tempdir;

use crate::common::{grid_with, signal};

#[test]
fn saved_configuration_loads_back() {
    let dir = tempdir().unwrap();
    let mut config = Configuration::new(grid_with(
        4,
        3,
        &[(1, 1, signal()), (2, 1, Cell::new(1, 0, 1, 1))],
    ));
    config.annotations.push(Annotation::new("input A", 1, 0));
    config.annotations.push(Annotation::new("", -3, 12));

    let path = config_path(dir.path(), "Signal 1").unwrap();
    save(&path, &config).unwrap();
    let loaded = load(&path, 2).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(loaded.grid.width(), 4);
    assert_eq!(loaded.grid.height(), 3);
}

#[test]
fn file_layout_is_column_major_with_row_markers() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tiny.con");
    let config = Configuration::new(grid_with(2, 1, &[(1, 0, Cell::new(0, 0, 0, 1))]));
    save(&path, &config).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, "0\n0\n0\n0\n0\nnewRow\n0\n0\n0\n1");
}

#[test]
fn out_of_range_state_names_the_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.con");
    fs::write(&path, "0\n0\n2\n0\n0").unwrap();

    match load(&path, 2) {
        Err(PersistError::StateOutOfRange { line, value, states }) => {
            assert_eq!((line, value, states), (3, 2, 2));
        }
        other => panic!("unexpected {other:?}"),
    }
    // A three-state automaton accepts the same file.
    let loaded = load(&path, 3).unwrap();
    assert_eq!(loaded.grid.cell(Coord::new(0, 0)).unwrap(), Cell::new(0, 2, 0, 0));
}

#[test]
fn list_saved_returns_sorted_configuration_names() {
    let dir = tempdir().unwrap();
    let grid = grid_with(3, 3, &[]);
    for name in ["zeta", "Alpha", "mid 2"] {
        let path = config_path(dir.path(), name).unwrap();
        save(&path, &Configuration::new(grid.clone())).unwrap();
    }
    fs::write(dir.path().join("notes.txt"), "not a grid").unwrap();

    assert_eq!(list_saved(dir.path()).unwrap(), ["Alpha", "mid 2", "zeta"]);
}

#[test]
fn unsafe_names_are_rejected() {
    let dir = tempdir().unwrap();
    for name in ["", "   ", "../escape", "a/b", "dots.con"] {
        assert!(
            matches!(config_path(dir.path(), name), Err(PersistError::InvalidName(_))),
            "{name:?}"
        );
    }
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = tempdir().unwrap();
    let err = persist::load(&dir.path().join("absent.con"), 2).unwrap_err();
    assert!(matches!(err, PersistError::Read { .. }));
}
