//! Rotation and reflection of neighbourhood patterns.
//!
//! A rule table declares the symmetries under which each of its rules also holds.
//! Rather than storing the images, matching walks every [`Variant`] of the table in a
//! fixed order and transforms the live pattern into the rule's frame.

use std::fmt;

use serde::Serialize;
use stca_types::{Axis, Pattern, RuleTable};

/// Rotate a pattern by `k` quarter turns. `k` is taken modulo 4.
///
/// One quarter turn moves left to top, right to bottom, bottom to left and top to right,
/// on the local and the neighbour slots alike.
#[must_use]
pub fn rotate(pattern: Pattern, k: u8) -> Pattern {
    let mut slots = pattern.slots();
    for _ in 0..k % 4 {
        let [t, b, l, r, nt, nb, nl, nr] = slots;
        slots = [l, r, b, t, nl, nr, nb, nt];
    }
    Pattern::new(slots)
}

/// Mirror a pattern. Each axis is an involution.
#[must_use]
pub fn reflect(pattern: Pattern, axis: Axis) -> Pattern {
    let [t, b, l, r, nt, nb, nl, nr] = pattern.slots();
    match axis {
        Axis::Horizontal => Pattern::new([t, b, r, l, nt, nb, nr, nl]),
        Axis::Vertical => Pattern::new([b, t, l, r, nb, nt, nl, nr]),
    }
}

/// One element of a table's symmetry enumeration: reflection step `r`, then `k` rotations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Variant {
    pub reflection: u8,
    pub rotation: u8,
    #[serde(skip)]
    axes: &'static [Axis],
}

impl Variant {
    pub const IDENTITY: Variant = Variant {
        reflection: 0,
        rotation: 0,
        axes: &[],
    };

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.axes.is_empty() && self.rotation % 4 == 0
    }

    #[must_use]
    pub fn axes(&self) -> &'static [Axis] {
        self.axes
    }

    /// Reflect, then rotate.
    #[must_use]
    pub fn apply(&self, pattern: Pattern) -> Pattern {
        let reflected = self
            .axes
            .iter()
            .fold(pattern, |acc, axis| reflect(acc, *axis));
        rotate(reflected, self.rotation)
    }

    /// Inverse of [`Variant::apply`]: rotate back, then reflect again.
    #[must_use]
    pub fn undo(&self, pattern: Pattern) -> Pattern {
        let unrotated = rotate(pattern, 4 - self.rotation % 4);
        self.axes
            .iter()
            .rev()
            .fold(unrotated, |acc, axis| reflect(acc, *axis))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{} k{}", self.reflection, self.rotation)
    }
}

/// Every variant of `table` in match order: reflection step outer, rotation inner.
pub fn variants(table: &RuleTable) -> impl Iterator<Item = Variant> + use<> {
    let reflection = table.reflection();
    let rotations = table.rotations();
    (0..=reflection.steps()).flat_map(move |r| {
        (0..=rotations).map(move |k| Variant {
            reflection: r,
            rotation: k,
            axes: reflection.axes(r),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stca_types::{ReflectionKind, Rule};

    const SAMPLE: Pattern = Pattern::new([1, 2, 3, 4, 5, 6, 7, 8]);

    fn table(rotation: bool, reflection: ReflectionKind) -> RuleTable {
        RuleTable::new(
            rotation,
            reflection,
            vec![Rule::new(Pattern::QUIESCENT, Pattern::QUIESCENT)],
        )
    }

    #[test]
    fn quarter_turn_relabels_slots() {
        assert_eq!(rotate(SAMPLE, 1).slots(), [3, 4, 2, 1, 7, 8, 6, 5]);
        assert_eq!(rotate(SAMPLE, 2).slots(), [2, 1, 4, 3, 6, 5, 8, 7]);
    }

    #[test]
    fn rotation_closes_after_four_turns() {
        assert_eq!(rotate(rotate(SAMPLE, 1), 3), SAMPLE);
        assert_eq!(rotate(SAMPLE, 4), SAMPLE);
        assert_eq!(rotate(SAMPLE, 0), SAMPLE);
        for k in 0..4 {
            assert_eq!(rotate(rotate(SAMPLE, k), 4 - k), SAMPLE);
            assert_eq!(rotate(SAMPLE, k + 4), rotate(SAMPLE, k));
        }
    }

    #[test]
    fn reflection_is_an_involution() {
        for axis in [Axis::Horizontal, Axis::Vertical] {
            assert_eq!(reflect(reflect(SAMPLE, axis), axis), SAMPLE);
        }
        assert_eq!(
            reflect(SAMPLE, Axis::Horizontal).slots(),
            [1, 2, 4, 3, 5, 6, 8, 7]
        );
        assert_eq!(
            reflect(SAMPLE, Axis::Vertical).slots(),
            [2, 1, 3, 4, 6, 5, 7, 8]
        );
    }

    #[test]
    fn reflections_commute() {
        let hv = reflect(reflect(SAMPLE, Axis::Horizontal), Axis::Vertical);
        let vh = reflect(reflect(SAMPLE, Axis::Vertical), Axis::Horizontal);
        assert_eq!(hv, vh);
        assert_eq!(hv, rotate(SAMPLE, 2));
    }

    #[test]
    fn undo_inverts_apply_for_every_variant() {
        let t = table(true, ReflectionKind::BothCompounded);
        for variant in variants(&t) {
            assert_eq!(variant.undo(variant.apply(SAMPLE)), SAMPLE, "{variant}");
        }
    }

    #[test]
    fn enumeration_sizes_follow_declared_symmetry() {
        let cases = [
            (false, ReflectionKind::None, 1),
            (true, ReflectionKind::None, 4),
            (false, ReflectionKind::Horizontal, 2),
            (false, ReflectionKind::Vertical, 2),
            (true, ReflectionKind::BothSeparate, 12),
            (true, ReflectionKind::BothCompounded, 16),
        ];
        for (rotation, reflection, expected) in cases {
            assert_eq!(variants(&table(rotation, reflection)).count(), expected);
        }
    }

    #[test]
    fn enumeration_order_is_reflection_outer_rotation_inner() {
        let order: Vec<_> = variants(&table(true, ReflectionKind::Vertical))
            .map(|v| (v.reflection, v.rotation))
            .collect();
        assert_eq!(
            order,
            vec![
                (0, 0),
                (0, 1),
                (0, 2),
                (0, 3),
                (1, 0),
                (1, 1),
                (1, 2),
                (1, 3)
            ]
        );
        let first = variants(&table(true, ReflectionKind::Vertical))
            .next()
            .unwrap();
        assert!(first.is_identity());
    }

    #[test]
    fn vertical_only_reflects_top_and_bottom_at_step_one() {
        let v = variants(&table(false, ReflectionKind::Vertical))
            .nth(1)
            .unwrap();
        assert_eq!(v.apply(SAMPLE), reflect(SAMPLE, Axis::Vertical));
        assert!(!v.is_identity());
    }
}
