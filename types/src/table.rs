//! Rules and rule tables.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pattern::{Axis, Pattern, SubcellState};

/// A local transition: when the neighbourhood equals `domain`, rewrite it to `codomain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    pub domain: Pattern,
    pub codomain: Pattern,
}

impl Rule {
    #[must_use]
    pub const fn new(domain: Pattern, codomain: Pattern) -> Self {
        Self { domain, codomain }
    }

    /// The same rule read backwards.
    #[must_use]
    pub const fn inverse(self) -> Self {
        Self {
            domain: self.codomain,
            codomain: self.domain,
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.domain, self.codomain)
    }
}

/// Reflection symmetry declared by a rule table.
///
/// `BothSeparate` means the horizontal image and the vertical image of a rule are
/// rules, but not the image under both axes at once; `BothCompounded` adds that image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReflectionKind {
    #[default]
    None,
    Horizontal,
    Vertical,
    BothSeparate,
    BothCompounded,
}

impl ReflectionKind {
    /// Decode the numeric code used by the flat table layout (0..=4).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::Horizontal),
            2 => Some(Self::Vertical),
            3 => Some(Self::BothSeparate),
            4 => Some(Self::BothCompounded),
            _ => None,
        }
    }

    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Horizontal => 1,
            Self::Vertical => 2,
            Self::BothSeparate => 3,
            Self::BothCompounded => 4,
        }
    }

    /// Number of reflection steps after the untransformed step 0.
    #[must_use]
    pub const fn steps(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Horizontal | Self::Vertical => 1,
            Self::BothSeparate => 2,
            Self::BothCompounded => 3,
        }
    }

    /// Axes reflected at reflection step `step`. Step 0 is always untransformed.
    #[must_use]
    pub const fn axes(self, step: u8) -> &'static [Axis] {
        match (self, step) {
            (Self::Horizontal | Self::BothSeparate | Self::BothCompounded, 1) => {
                &[Axis::Horizontal]
            }
            (Self::Vertical, 1) | (Self::BothSeparate | Self::BothCompounded, 2) => {
                &[Axis::Vertical]
            }
            (Self::BothCompounded, 3) => &[Axis::Horizontal, Axis::Vertical],
            _ => &[],
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "No",
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
            Self::BothSeparate => "Horizontal and Vertical",
            Self::BothCompounded => "Horizontal and Vertical compounded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("rule table header is missing")]
    MissingHeader,
    #[error("invalid rotation flag {0} (expected 0 or 1)")]
    InvalidRotation(u8),
    #[error("invalid reflection code {0} (expected 0..=4)")]
    InvalidReflection(u8),
    #[error("rule data has {0} values, not a multiple of 16")]
    TruncatedRules(usize),
    #[error("number of states must be at least 1")]
    NoStates,
    #[error("rule {rule} uses state {value} but only {states} states are configured")]
    StateOutOfRange {
        rule: usize,
        value: SubcellState,
        states: SubcellState,
    },
}

/// Values per rule in the flat layout: 8 domain slots then 8 codomain slots.
const FLAT_RULE_LEN: usize = 16;

/// An ordered rule list plus the symmetries under which every rule also holds.
///
/// Symmetric images are not stored; they are synthesized at match time. Rule order is
/// only significant as a tie-break between matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    rotation_symmetric: bool,
    reflection: ReflectionKind,
    rules: Vec<Rule>,
}

impl RuleTable {
    #[must_use]
    pub fn new(rotation_symmetric: bool, reflection: ReflectionKind, rules: Vec<Rule>) -> Self {
        Self {
            rotation_symmetric,
            reflection,
            rules,
        }
    }

    /// Decode the flat layout: `[rotation, reflection, (8 domain, 8 codomain)*]`.
    pub fn from_flat(data: &[u8]) -> Result<Self, TableError> {
        let [rotation, reflection, body @ ..] = data else {
            return Err(TableError::MissingHeader);
        };
        let rotation_symmetric = match rotation {
            0 => false,
            1 => true,
            other => return Err(TableError::InvalidRotation(*other)),
        };
        let reflection =
            ReflectionKind::from_code(*reflection).ok_or(TableError::InvalidReflection(*reflection))?;
        if body.len() % FLAT_RULE_LEN != 0 {
            return Err(TableError::TruncatedRules(body.len()));
        }

        let rules = body
            .chunks_exact(FLAT_RULE_LEN)
            .map(|chunk| {
                let mut domain = [0; 8];
                let mut codomain = [0; 8];
                domain.copy_from_slice(&chunk[..8]);
                codomain.copy_from_slice(&chunk[8..]);
                Rule::new(Pattern::new(domain), Pattern::new(codomain))
            })
            .collect();

        Ok(Self::new(rotation_symmetric, reflection, rules))
    }

    #[must_use]
    pub fn rotation_symmetric(&self) -> bool {
        self.rotation_symmetric
    }

    #[must_use]
    pub fn reflection(&self) -> ReflectionKind {
        self.reflection
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Highest rotation index enumerated at match time (3, or 0 without rotation symmetry).
    #[must_use]
    pub fn rotations(&self) -> u8 {
        if self.rotation_symmetric { 3 } else { 0 }
    }

    /// Whether any symmetric image beyond the identity is synthesized.
    #[must_use]
    pub fn has_symmetry(&self) -> bool {
        self.rotation_symmetric || self.reflection != ReflectionKind::None
    }

    /// The table with every rule read backwards; symmetry declarations carry over.
    #[must_use]
    pub fn inverted(&self) -> Self {
        Self {
            rotation_symmetric: self.rotation_symmetric,
            reflection: self.reflection,
            rules: self.rules.iter().map(|rule| rule.inverse()).collect(),
        }
    }

    /// Check every rule slot is a valid state for an automaton with `states` states.
    pub fn validate(&self, states: SubcellState) -> Result<(), TableError> {
        if states == 0 {
            return Err(TableError::NoStates);
        }
        for (index, rule) in self.rules.iter().enumerate() {
            let value = rule.domain.max_state().max(rule.codomain.max_state());
            if value >= states {
                return Err(TableError::StateOutOfRange {
                    rule: index,
                    value,
                    states,
                });
            }
        }
        Ok(())
    }
}
