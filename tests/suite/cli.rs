//! End-to-end runs of the `stca` binary.

use std::fs;

use serde_json::Value;
use stca_core::{Annotation, Configuration};
use stca_core::persist::{load, save};
use stca_types::{Cell, Coord};
use tempfile::tempdir;

use crate::common::{grid_with, signal, stca, stdout};

#[test]
fn catalog_lists_every_builtin_automaton() {
    let home = tempdir().unwrap();
    let output = stca(home.path(), &["catalog"]);
    assert!(output.status.success());

    let text = stdout(&output);
    assert_eq!(text.lines().count(), 9);
    assert!(text.lines().nth(3).unwrap().contains("RS"));
    assert!(text.contains("Inverse NANBP"));
}

#[test]
fn examine_json_reports_determinism() {
    let home = tempdir().unwrap();
    let output = stca(home.path(), &["examine", "--automaton", "2", "--json"]);
    assert!(output.status.success());

    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["name"], "2008 - Lee, Peper, Adachi, Morita");
    assert_eq!(report["forwards_deterministic"], true);
    assert_eq!(report["backwards_deterministic"], false);
    assert!(report["forwards_violation"].is_null());
    assert!(report["backwards_violation"]["anchor"].is_u64());
}

#[test]
fn use_changes_the_default_automaton() {
    let home = tempdir().unwrap();
    let output = stca(home.path(), &["use", "inverse rs"]);
    assert!(output.status.success());

    let settings = fs::read_to_string(home.path().join("config.toml")).unwrap();
    assert!(settings.contains("automaton = \"Inverse RS\""));

    let output = stca(home.path(), &["examine", "--json"]);
    let report: Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["name"], "Inverse RS");
}

#[test]
fn unknown_automaton_fails() {
    let home = tempdir().unwrap();
    let output = stca(home.path(), &["examine", "--automaton", "Game of Life"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown automaton"));
}

#[test]
fn verify_reports_convergence() {
    let home = tempdir().unwrap();
    let source = home.path().join("source.con");
    let target = home.path().join("target.con");
    save(&source, &Configuration::new(grid_with(5, 5, &[(2, 1, signal())]))).unwrap();
    save(&target, &Configuration::new(grid_with(5, 5, &[(2, 3, signal())]))).unwrap();

    let output = stca(
        home.path(),
        &[
            "verify",
            "--automaton",
            "RS",
            "--source",
            source.to_str().unwrap(),
            "--target",
            target.to_str().unwrap(),
            "--timeout-secs",
            "30",
        ],
    );
    assert!(output.status.success());
    assert!(stdout(&output).contains("converged"));
}

#[test]
fn simulate_saves_the_result_with_annotations() {
    let home = tempdir().unwrap();
    let input = home.path().join("input.con");
    let result = home.path().join("result.con");
    let mut config = Configuration::new(grid_with(3, 6, &[(1, 1, signal())]));
    config.annotations.push(Annotation::new("wire", 1, 0));
    save(&input, &config).unwrap();

    let output = stca(
        home.path(),
        &[
            "simulate",
            "--automaton",
            "RS",
            "--input",
            input.to_str().unwrap(),
            "--attempts",
            "400",
            "--speed-ms",
            "0",
            "--output",
            result.to_str().unwrap(),
        ],
    );
    assert!(output.status.success());

    let saved = load(&result, 2).unwrap();
    assert_eq!(saved.annotations, config.annotations);
    assert_eq!(saved.grid.cell(Coord::new(1, 4)).unwrap(), signal());
}

#[test]
fn list_shows_saved_configurations() {
    let home = tempdir().unwrap();
    let dir = home.path().join("saved");
    fs::create_dir(&dir).unwrap();
    for name in ["b", "a"] {
        save(
            &dir.join(format!("{name}.con")),
            &Configuration::new(grid_with(3, 3, &[])),
        )
        .unwrap();
    }

    let output = stca(home.path(), &["list", "--dir", dir.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "a\nb\n");
}

#[test]
fn examine_text_lists_each_rule() {
    let home = tempdir().unwrap();
    let output = stca(home.path(), &["examine", "--automaton", "2"]);
    assert!(output.status.success());

    let text = stdout(&output);
    let rules: Vec<_> = text
        .lines()
        .filter(|line| line.trim_start().starts_with("rule "))
        .collect();
    assert_eq!(rules.len(), 5);
    assert!(rules[0].contains("->"));
}

#[test]
fn new_creates_a_blank_grid_sized_by_settings() {
    let home = tempdir().unwrap();
    let saved = home.path().join("saved");
    fs::create_dir(&saved).unwrap();
    fs::write(
        home.path().join("config.toml"),
        format!(
            "[grid]\nx_cells = 7\ny_cells = 4\n\n[storage]\ndir = '{}'\n",
            saved.display()
        ),
    )
    .unwrap();

    let output = stca(home.path(), &["new", "blank"]);
    assert!(output.status.success());
    let config = load(&saved.join("blank.con"), 2).unwrap();
    assert_eq!((config.grid.width(), config.grid.height()), (7, 4));
    assert!(config.grid.iter().all(|(_, cell)| *cell == Cell::QUIESCENT));
    assert!(config.annotations.is_empty());

    let output = stca(home.path(), &["new", "blank"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("already exists"));
    assert!(stca(home.path(), &["new", "blank", "--force"]).status.success());
}
