//! Local determinism and reversibility of rule tables.
//!
//! A table is locally deterministic when no two rules, nor any symmetric images of them,
//! share a domain while disagreeing on the codomain. Reading every rule backwards turns
//! the same check into a reversibility test.

use std::fmt;

use serde::Serialize;
use stca_types::{Pattern, Rule, RuleTable};
use tracing::debug;

use crate::symmetry::{Variant, variants};

/// Which side of each rule is treated as the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeDirection {
    Forwards,
    Backwards,
}

impl TimeDirection {
    /// `(input, output)` of `rule` in this direction.
    fn sides(self, rule: &Rule) -> (Pattern, Pattern) {
        match self {
            Self::Forwards => (rule.domain, rule.codomain),
            Self::Backwards => (rule.codomain, rule.domain),
        }
    }
}

impl fmt::Display for TimeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forwards => "forwards",
            Self::Backwards => "backwards",
        })
    }
}

/// Rule `other` under `variant` has the same input as rule `anchor` but a different output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub anchor: usize,
    pub other: usize,
    pub variant: Variant,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rule {} under {} collides with rule {}",
            self.other, self.variant, self.anchor
        )
    }
}

/// First violation of local determinism in `direction`, if any.
///
/// Pairs are visited with `anchor <= other`; the images of `other` are compared against
/// the untransformed `anchor`. The identity comparison of a rule with itself is skipped,
/// every other self-image is checked.
#[must_use]
pub fn find_violation(table: &RuleTable, direction: TimeDirection) -> Option<Violation> {
    let rules = table.rules();
    for (anchor, anchor_rule) in rules.iter().enumerate() {
        let (anchor_in, anchor_out) = direction.sides(anchor_rule);
        for (other, other_rule) in rules.iter().enumerate().skip(anchor) {
            let (other_in, other_out) = direction.sides(other_rule);
            for variant in variants(table) {
                if anchor == other && variant.is_identity() {
                    continue;
                }
                if variant.apply(other_in) == anchor_in && variant.apply(other_out) != anchor_out {
                    let violation = Violation {
                        anchor,
                        other,
                        variant,
                    };
                    debug!(%direction, %violation, "rule table is not locally deterministic");
                    return Some(violation);
                }
            }
        }
    }
    None
}

/// Whether `table` is locally deterministic in `direction`.
#[must_use]
pub fn is_locally_deterministic(table: &RuleTable, direction: TimeDirection) -> bool {
    find_violation(table, direction).is_none()
}

/// Forwards and backwards results for one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeterminismReport {
    pub forwards: Option<Violation>,
    pub backwards: Option<Violation>,
}

impl DeterminismReport {
    #[must_use]
    pub fn analyze(table: &RuleTable) -> Self {
        Self {
            forwards: find_violation(table, TimeDirection::Forwards),
            backwards: find_violation(table, TimeDirection::Backwards),
        }
    }

    #[must_use]
    pub fn forwards_deterministic(&self) -> bool {
        self.forwards.is_none()
    }

    #[must_use]
    pub fn backwards_deterministic(&self) -> bool {
        self.backwards.is_none()
    }
}
