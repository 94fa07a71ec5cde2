//! The 8-slot neighbourhood pattern.

use std::fmt;

use serde::{Deserialize, Serialize};

/// State of one triangular subcell. `0` is the quiescent state.
pub type SubcellState = u8;

/// Named positions within a [`Pattern`].
///
/// The first four slots are the subcells of the center cell; the last four are the
/// subcells of the adjacent cells that touch it (the bottom subcell of the cell above,
/// the top subcell of the cell below, the right subcell of the cell to the left and the
/// left subcell of the cell to the right).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Top,
    Bottom,
    Left,
    Right,
    NeighbourTop,
    NeighbourBottom,
    NeighbourLeft,
    NeighbourRight,
}

impl Slot {
    pub const ALL: [Slot; 8] = [
        Slot::Top,
        Slot::Bottom,
        Slot::Left,
        Slot::Right,
        Slot::NeighbourTop,
        Slot::NeighbourBottom,
        Slot::NeighbourLeft,
        Slot::NeighbourRight,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Slot::Top => 0,
            Slot::Bottom => 1,
            Slot::Left => 2,
            Slot::Right => 3,
            Slot::NeighbourTop => 4,
            Slot::NeighbourBottom => 5,
            Slot::NeighbourLeft => 6,
            Slot::NeighbourRight => 7,
        }
    }
}

/// Reflection axis.
///
/// `Horizontal` mirrors left and right; `Vertical` mirrors top and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A cell neighbourhood: `(top, bottom, left, right, neighbourTop, neighbourBottom,
/// neighbourLeft, neighbourRight)`.
///
/// Patterns are the unit of rule matching and are compared slot for slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern([SubcellState; 8]);

impl Pattern {
    pub const QUIESCENT: Pattern = Pattern([0; 8]);

    #[must_use]
    pub const fn new(slots: [SubcellState; 8]) -> Self {
        Self(slots)
    }

    #[must_use]
    pub const fn slots(self) -> [SubcellState; 8] {
        self.0
    }

    #[must_use]
    pub const fn get(self, slot: Slot) -> SubcellState {
        self.0[slot.index()]
    }

    #[must_use]
    pub const fn with(mut self, slot: Slot, value: SubcellState) -> Self {
        self.0[slot.index()] = value;
        self
    }

    /// The four subcells of the center cell, `[top, bottom, left, right]`.
    #[must_use]
    pub const fn local(self) -> [SubcellState; 4] {
        [self.0[0], self.0[1], self.0[2], self.0[3]]
    }

    /// The four touching neighbour subcells, `[top, bottom, left, right]`.
    #[must_use]
    pub const fn neighbours(self) -> [SubcellState; 4] {
        [self.0[4], self.0[5], self.0[6], self.0[7]]
    }

    /// Largest state value present in any slot.
    #[must_use]
    pub fn max_state(self) -> SubcellState {
        self.0.iter().copied().max().unwrap_or(0)
    }
}

impl From<[SubcellState; 8]> for Pattern {
    fn from(slots: [SubcellState; 8]) -> Self {
        Self(slots)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [t, b, l, r, nt, nb, nl, nr] = self.0;
        write!(f, "[{t} {b} {l} {r} | {nt} {nb} {nl} {nr}]")
    }
}
