//! Local determinism of the built-in automata.

use stca_core::{DeterminismReport, TimeDirection, find_violation, rotate};
use stca_types::{Rule, RuleTable};

use crate::common::{catalog, table};

#[test]
fn builtin_tables_match_known_determinism() {
    let expected = [
        (true, true),
        (true, true),
        (true, false),
        (true, true),
        (true, true),
        (true, false),
        (true, true),
        (true, true),
        (true, false),
    ];
    let catalog = catalog();
    assert_eq!(catalog.len(), expected.len());
    for (entry, (forwards, backwards)) in catalog.entries().iter().zip(expected) {
        let report = DeterminismReport::analyze(&entry.table);
        assert_eq!(
            (report.forwards_deterministic(), report.backwards_deterministic()),
            (forwards, backwards),
            "{}",
            entry.name
        );
    }
}

#[test]
fn rs_is_deterministic_both_ways() {
    let rs = table("RS");
    assert!(find_violation(&rs, TimeDirection::Forwards).is_none());
    assert!(find_violation(&rs, TimeDirection::Backwards).is_none());
}

#[test]
fn colliding_domains_break_forwards_determinism() {
    let rs = table("RS");
    let mut rules = rs.rules().to_vec();
    // Right turn now fires on a rotated signal but still produces a turn.
    rules[1] = Rule::new(rotate(rules[0].domain, 1), rules[1].codomain);
    let corrupted = RuleTable::new(rs.rotation_symmetric(), rs.reflection(), rules);

    let violation = find_violation(&corrupted, TimeDirection::Forwards).expect("violation");
    assert_eq!((violation.anchor, violation.other), (0, 1));
    assert_eq!(violation.variant.reflection, 0);
    assert_eq!(violation.variant.rotation, 3);
    assert!(!DeterminismReport::analyze(&corrupted).forwards_deterministic());
}

#[test]
fn inverse_tables_swap_directions() {
    for (forward, inverse) in [("RS", "Inverse RS"), ("NANBP", "Inverse NANBP")] {
        let forward = DeterminismReport::analyze(&table(forward));
        let inverse = DeterminismReport::analyze(&table(inverse));
        assert_eq!(
            forward.forwards_deterministic(),
            inverse.backwards_deterministic()
        );
        assert_eq!(
            forward.backwards_deterministic(),
            inverse.forwards_deterministic()
        );
    }
}
