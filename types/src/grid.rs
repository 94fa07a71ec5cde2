//! Arena grid of four-subcell cells.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pattern::{Pattern, Slot, SubcellState};

/// Grid coordinate. `x` grows to the right, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction of a grid-adjacent cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];
}

/// One of the four triangular subcells of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subcell {
    Top,
    Bottom,
    Left,
    Right,
}

/// A square cell split into four triangular subcells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cell {
    pub top: SubcellState,
    pub bottom: SubcellState,
    pub left: SubcellState,
    pub right: SubcellState,
}

impl Cell {
    pub const QUIESCENT: Cell = Cell::new(0, 0, 0, 0);

    #[must_use]
    pub const fn new(
        top: SubcellState,
        bottom: SubcellState,
        left: SubcellState,
        right: SubcellState,
    ) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// `[top, bottom, left, right]`, the persisted order.
    #[must_use]
    pub const fn subcells(self) -> [SubcellState; 4] {
        [self.top, self.bottom, self.left, self.right]
    }

    #[must_use]
    pub const fn get(self, subcell: Subcell) -> SubcellState {
        match subcell {
            Subcell::Top => self.top,
            Subcell::Bottom => self.bottom,
            Subcell::Left => self.left,
            Subcell::Right => self.right,
        }
    }

    pub fn set(&mut self, subcell: Subcell, value: SubcellState) {
        match subcell {
            Subcell::Top => self.top = value,
            Subcell::Bottom => self.bottom = value,
            Subcell::Left => self.left = value,
            Subcell::Right => self.right = value,
        }
    }

    #[must_use]
    pub fn is_quiescent(self) -> bool {
        self == Self::QUIESCENT
    }
}

impl From<[SubcellState; 4]> for Cell {
    fn from([top, bottom, left, right]: [SubcellState; 4]) -> Self {
        Self::new(top, bottom, left, right)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions must be non-zero (got {width}x{height})")]
    EmptyDimensions { width: usize, height: usize },
    #[error("cell {coord} is outside the {width}x{height} grid")]
    OutOfBounds {
        coord: Coord,
        width: usize,
        height: usize,
    },
    #[error("cell {0} is on the grid border and cannot be a transition center")]
    NotInterior(Coord),
    #[error("expected {expected} cells, got {actual}")]
    CellCount { expected: usize, actual: usize },
    #[error("grid dimensions differ: {left_width}x{left_height} vs {right_width}x{right_height}")]
    DimensionMismatch {
        left_width: usize,
        left_height: usize,
        right_width: usize,
        right_height: usize,
    },
}

/// A `width x height` grid of cells stored in one contiguous arena.
///
/// Cells are stored column by column (`x` outer, `y` inner), the same order the
/// persisted configuration format walks them. All access is bounds-checked; the border
/// cells exist and can be written but are never the center of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    /// A quiescent grid. Zero dimensions are rejected.
    pub fn new(width: usize, height: usize) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            cells: vec![Cell::QUIESCENT; width * height],
        })
    }

    /// Build from cells in storage order (`x` outer, `y` inner).
    pub fn from_cells(width: usize, height: usize, cells: Vec<Cell>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyDimensions { width, height });
        }
        let expected = width * height;
        if cells.len() != expected {
            return Err(GridError::CellCount {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// True when `coord` is inside the grid and off the border.
    #[must_use]
    pub fn is_interior(&self, coord: Coord) -> bool {
        coord.x > 0 && coord.y > 0 && coord.x + 1 < self.width && coord.y + 1 < self.height
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        self.contains(coord)
            .then(|| coord.x * self.height + coord.y)
    }

    fn out_of_bounds(&self, coord: Coord) -> GridError {
        GridError::OutOfBounds {
            coord,
            width: self.width,
            height: self.height,
        }
    }

    #[must_use]
    pub fn get(&self, coord: Coord) -> Option<&Cell> {
        self.index(coord).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut Cell> {
        self.index(coord).map(|i| &mut self.cells[i])
    }

    pub fn cell(&self, coord: Coord) -> Result<Cell, GridError> {
        self.get(coord).copied().ok_or_else(|| self.out_of_bounds(coord))
    }

    pub fn set(&mut self, coord: Coord, cell: Cell) -> Result<(), GridError> {
        let err = self.out_of_bounds(coord);
        let slot = self.get_mut(coord).ok_or(err)?;
        *slot = cell;
        Ok(())
    }

    /// The adjacent cell in `direction`, if it exists.
    #[must_use]
    pub fn neighbor(&self, coord: Coord, direction: Direction) -> Option<Coord> {
        if !self.contains(coord) {
            return None;
        }
        let next = match direction {
            Direction::Up => Coord::new(coord.x, coord.y.checked_sub(1)?),
            Direction::Down => Coord::new(coord.x, coord.y + 1),
            Direction::Left => Coord::new(coord.x.checked_sub(1)?, coord.y),
            Direction::Right => Coord::new(coord.x + 1, coord.y),
        };
        self.contains(next).then_some(next)
    }

    /// Read the 8-slot neighbourhood centred on an interior cell.
    pub fn pattern_at(&self, coord: Coord) -> Result<Pattern, GridError> {
        self.require_interior(coord)?;
        let center = self.cell(coord)?;
        let up = self.cell(Coord::new(coord.x, coord.y - 1))?;
        let down = self.cell(Coord::new(coord.x, coord.y + 1))?;
        let left = self.cell(Coord::new(coord.x - 1, coord.y))?;
        let right = self.cell(Coord::new(coord.x + 1, coord.y))?;
        Ok(Pattern::new([
            center.top,
            center.bottom,
            center.left,
            center.right,
            up.bottom,
            down.top,
            left.right,
            right.left,
        ]))
    }

    /// Write a neighbourhood back around an interior cell.
    ///
    /// The local slots go to the center cell; each neighbour slot goes to the touching
    /// subcell of the adjacent cell when that cell exists.
    pub fn write_pattern(&mut self, coord: Coord, pattern: Pattern) -> Result<(), GridError> {
        self.require_interior(coord)?;
        self.set(coord, Cell::from(pattern.local()))?;

        let touching = [
            (Direction::Up, Subcell::Bottom, Slot::NeighbourTop),
            (Direction::Down, Subcell::Top, Slot::NeighbourBottom),
            (Direction::Left, Subcell::Right, Slot::NeighbourLeft),
            (Direction::Right, Subcell::Left, Slot::NeighbourRight),
        ];
        for (direction, subcell, slot) in touching {
            if let Some(adjacent) = self.neighbor(coord, direction)
                && let Some(cell) = self.get_mut(adjacent)
            {
                cell.set(subcell, pattern.get(slot));
            }
        }
        Ok(())
    }

    /// Coordinates in storage order (`x` outer, `y` inner).
    pub fn coords(&self) -> impl Iterator<Item = Coord> + use<> {
        let height = self.height;
        (0..self.width).flat_map(move |x| (0..height).map(move |y| Coord::new(x, y)))
    }

    /// Cells with their coordinates in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &Cell)> {
        self.coords().zip(self.cells.iter())
    }

    pub fn ensure_same_dimensions(&self, other: &Grid) -> Result<(), GridError> {
        if self.width == other.width && self.height == other.height {
            Ok(())
        } else {
            Err(GridError::DimensionMismatch {
                left_width: self.width,
                left_height: self.height,
                right_width: other.width,
                right_height: other.height,
            })
        }
    }

    fn require_interior(&self, coord: Coord) -> Result<(), GridError> {
        if !self.contains(coord) {
            return Err(self.out_of_bounds(coord));
        }
        if !self.is_interior(coord) {
            return Err(GridError::NotInterior(coord));
        }
        Ok(())
    }
}
